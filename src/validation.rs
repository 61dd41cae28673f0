//! Upload validation shared by the upload client and the server ingress.
//!
//! Both sides run [`partition`] with the same [`UploadLimits`], so a file the
//! client lets through is never rejected by the server for type or size.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mime types accepted for upload
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Largest accepted single file (5 MiB)
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Largest accepted batch
pub const MAX_FILES_PER_BATCH: usize = 10;

/// Type and subtype of a declared content type, lowercased and without parameters
pub fn mime_essence(mime_type: &str) -> String {
    match mime_type.trim().parse::<mime_guess::Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => mime_type.trim().to_ascii_lowercase(),
    }
}

pub fn is_accepted_mime(mime_type: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime_essence(mime_type).as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_files: MAX_FILES_PER_BATCH,
        }
    }
}

/// Anything that can be checked before upload
pub trait Candidate {
    fn name(&self) -> &str;
    fn mime_type(&self) -> &str;
    fn size(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnsupportedType,
    Empty,
    TooLarge,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedType => {
                write!(f, "Only JPEG, PNG, and GIF images are supported")
            }
            RejectReason::Empty => write!(f, "File is empty"),
            RejectReason::TooLarge => write!(f, "File exceeds the maximum upload size"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    pub item: T,
    pub reason: RejectReason,
}

/// One entry of the `errors` list in a 400 upload response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub file: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(file: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            file: file.into(),
            message: reason.to_string(),
        }
    }
}

/// What the caller should tell the user after a selection was filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionNotice {
    AllRejected,
    PartiallyRejected { rejected: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<Rejected<T>>,
}

impl<T> Partition<T> {
    pub fn notice(&self) -> Option<RejectionNotice> {
        match (self.accepted.is_empty(), self.rejected.is_empty()) {
            (true, false) => Some(RejectionNotice::AllRejected),
            (false, false) => Some(RejectionNotice::PartiallyRejected {
                rejected: self.rejected.len(),
            }),
            _ => None,
        }
    }
}

impl<T: Candidate> Partition<T> {
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.rejected
            .iter()
            .map(|r| ValidationIssue::new(r.item.name(), r.reason))
            .collect()
    }
}

pub fn check<T: Candidate>(item: &T, limits: &UploadLimits) -> Option<RejectReason> {
    if !is_accepted_mime(item.mime_type()) {
        Some(RejectReason::UnsupportedType)
    } else if item.size() == 0 {
        Some(RejectReason::Empty)
    } else if item.size() > limits.max_file_size {
        Some(RejectReason::TooLarge)
    } else {
        None
    }
}

/// Split candidates into accepted and rejected, preserving input order
pub fn partition<T: Candidate>(items: Vec<T>, limits: &UploadLimits) -> Partition<T> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for item in items {
        match check(&item, limits) {
            None => accepted.push(item),
            Some(reason) => rejected.push(Rejected { item, reason }),
        }
    }

    Partition { accepted, rejected }
}
