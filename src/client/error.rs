use crate::client::uploads::TaskId;

/// Failure of one request issued by a transport
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    /// The request never produced a response
    #[error("{0}")]
    Request(String),

    /// The server answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl TransferError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransferError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransferError::Decode(e.to_string())
        } else {
            TransferError::Request(e.to_string())
        }
    }
}

/// Client controller error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No files selected for upload")]
    NothingSelected,

    #[error("Upload task {0} not found")]
    UnknownTask(TaskId),

    #[error("Upload task {0} is not in the error state")]
    NotRetryable(TaskId),

    #[error("Image {0} is not in the gallery")]
    UnknownImage(i64),

    #[error("Stored image data could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Controller has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;
