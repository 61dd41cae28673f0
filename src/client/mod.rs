//! Upload client.
//!
//! A single [`Controller`] task owns every piece of client state: the pending
//! selection, the upload tasks, the notification list and the gallery
//! projection. Commands from a [`ControllerHandle`], timer ticks and network
//! completions all arrive as events on one channel and are applied in order,
//! so no state is ever shared or locked.

pub mod controller;
pub mod error;
pub mod gallery;
pub mod notifications;
pub mod source;
pub mod transport;
pub mod uploads;

pub use controller::{Controller, ControllerHandle, SelectionReport, Snapshot};
pub use error::{ClientError, TransferError};
pub use gallery::{GalleryProjection, ViewMode};
pub use notifications::{Notification, NotificationCenter, NotificationId, NotificationKind};
pub use source::SourceFile;
pub use transport::{GalleryTransport, HttpTransport};
pub use uploads::{TaskBoard, TaskId, TransferId, UploadStatus, UploadTask};

use rand::{distributions::Alphanumeric, Rng};

/// Client-side identifier: current time in base 36 followed by random characters
pub(crate) fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("{}{}", to_base36(millis), suffix)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 500);
    }
}
