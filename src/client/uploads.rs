//! Upload task board.
//!
//! Pure state: every method is a synchronous transition over the task list.
//! Timers and network calls live in the controller and feed results back in
//! through [`TaskBoard::tick`] and [`TaskBoard::settle`].

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::client::error::{ClientError, Result};
use crate::client::generate_id;
use crate::client::source::SourceFile;

/// Progress added per simulation tick
pub const PROGRESS_STEP: u8 = 5;

/// Simulated progress stops here until the transfer settles
pub const PROGRESS_CEILING: u8 = 95;

pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// How long a successful task stays visible
pub const SUCCESS_LINGER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(String);

impl TaskId {
    fn generate() -> Self {
        Self(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One issued upload request: a batch or a single-file retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransferId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Idle,
    Uploading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: TaskId,
    pub source: SourceFile,
    pub progress: u8,
    pub status: UploadStatus,
    /// Set only while `status` is `Error`
    pub error: Option<String>,
    transfer: Option<TransferId>,
}

impl UploadTask {
    /// Transfer currently driving this task
    pub fn transfer(&self) -> Option<TransferId> {
        self.transfer
    }
}

#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<UploadTask>,
    next_transfer: u64,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&UploadTask> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    fn next_transfer(&mut self) -> TransferId {
        self.next_transfer += 1;
        TransferId(self.next_transfer)
    }

    /// Create one uploading task per file, all owned by a fresh transfer
    pub fn start_batch(&mut self, files: Vec<SourceFile>) -> Result<(TransferId, Vec<TaskId>)> {
        if files.is_empty() {
            return Err(ClientError::NothingSelected);
        }

        let transfer = self.next_transfer();
        let mut ids = Vec::with_capacity(files.len());
        for source in files {
            let id = TaskId::generate();
            ids.push(id.clone());
            self.tasks.push(UploadTask {
                id,
                source,
                progress: 0,
                status: UploadStatus::Uploading,
                error: None,
                transfer: Some(transfer),
            });
        }
        Ok((transfer, ids))
    }

    /// Reset a failed task and hand it to a fresh transfer
    pub fn begin_retry(&mut self, id: &TaskId) -> Result<(TransferId, SourceFile)> {
        let status = self
            .get(id)
            .map(|t| t.status)
            .ok_or_else(|| ClientError::UnknownTask(id.clone()))?;
        if status != UploadStatus::Error {
            return Err(ClientError::NotRetryable(id.clone()));
        }

        let transfer = self.next_transfer();
        let task = self
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| ClientError::UnknownTask(id.clone()))?;
        task.status = UploadStatus::Uploading;
        task.progress = 0;
        task.error = None;
        task.transfer = Some(transfer);
        Ok((transfer, task.source.clone()))
    }

    /// Advance simulated progress for tasks still uploading under `transfer`
    ///
    /// Returns `false` once no task of that transfer can advance further, so
    /// the caller can stop its timer.
    pub fn tick(&mut self, transfer: TransferId) -> bool {
        let mut active = false;
        for task in self.owned_mut(transfer) {
            if task.status != UploadStatus::Uploading {
                continue;
            }
            task.progress = task.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CEILING);
            active |= task.progress < PROGRESS_CEILING;
        }
        active
    }

    /// Apply the outcome of `transfer` to every task it still owns
    ///
    /// Tasks that have since moved to another transfer are left alone.
    pub fn settle(
        &mut self,
        transfer: TransferId,
        outcome: std::result::Result<(), String>,
    ) -> Vec<TaskId> {
        let mut settled = Vec::new();
        for task in self.owned_mut(transfer) {
            if task.status != UploadStatus::Uploading {
                continue;
            }
            match &outcome {
                Ok(()) => {
                    task.status = UploadStatus::Success;
                    task.progress = 100;
                    task.error = None;
                }
                Err(message) => {
                    task.status = UploadStatus::Error;
                    task.progress = 0;
                    task.error = Some(message.clone());
                }
            }
            task.transfer = None;
            settled.push(task.id.clone());
        }
        settled
    }

    /// Drop finished tasks; tasks in any other state are kept
    pub fn remove_succeeded(&mut self, ids: &[TaskId]) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|t| !(t.status == UploadStatus::Success && ids.contains(&t.id)));
        before - self.tasks.len()
    }

    fn owned_mut(&mut self, transfer: TransferId) -> impl Iterator<Item = &mut UploadTask> {
        self.tasks
            .iter_mut()
            .filter(move |t| t.transfer == Some(transfer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<SourceFile> {
        (0..n)
            .map(|i| SourceFile::new(format!("f{i}.jpg"), "image/jpeg", vec![0u8; 4]))
            .collect()
    }

    #[test]
    fn test_start_batch_requires_files() {
        let mut board = TaskBoard::new();
        assert!(matches!(board.start_batch(vec![]), Err(ClientError::NothingSelected)));
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn test_start_batch_creates_uploading_tasks() {
        let mut board = TaskBoard::new();
        let (transfer, ids) = board.start_batch(files(3)).unwrap();
        assert_eq!(ids.len(), 3);
        for task in board.tasks() {
            assert_eq!(task.status, UploadStatus::Uploading);
            assert_eq!(task.progress, 0);
            assert_eq!(task.transfer(), Some(transfer));
        }
    }

    #[test]
    fn test_simulation_never_reaches_100() {
        let mut board = TaskBoard::new();
        let (transfer, ids) = board.start_batch(files(1)).unwrap();

        let mut ticks = 0;
        while board.tick(transfer) {
            ticks += 1;
            assert!(board.get(&ids[0]).unwrap().progress < PROGRESS_CEILING);
        }
        assert_eq!(ticks, 18);
        assert_eq!(board.get(&ids[0]).unwrap().progress, PROGRESS_CEILING);

        // Extra ticks are harmless
        board.tick(transfer);
        assert_eq!(board.get(&ids[0]).unwrap().progress, PROGRESS_CEILING);
    }

    #[test]
    fn test_settle_success_and_failure() {
        let mut board = TaskBoard::new();
        let (ok_transfer, ok_ids) = board.start_batch(files(2)).unwrap();
        let (bad_transfer, bad_ids) = board.start_batch(files(1)).unwrap();
        board.tick(ok_transfer);
        board.tick(bad_transfer);

        assert_eq!(board.settle(ok_transfer, Ok(())), ok_ids);
        for id in &ok_ids {
            let task = board.get(id).unwrap();
            assert_eq!(task.status, UploadStatus::Success);
            assert_eq!(task.progress, 100);
        }

        assert_eq!(board.settle(bad_transfer, Err("boom".to_string())), bad_ids);
        let task = board.get(&bad_ids[0]).unwrap();
        assert_eq!(task.status, UploadStatus::Error);
        assert_eq!(task.progress, 0);
        assert_eq!(task.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_tick_after_settle_is_ignored() {
        let mut board = TaskBoard::new();
        let (transfer, ids) = board.start_batch(files(1)).unwrap();
        board.settle(transfer, Err("down".to_string()));

        assert!(!board.tick(transfer));
        assert_eq!(board.get(&ids[0]).unwrap().progress, 0);
    }

    #[test]
    fn test_retry_only_from_error() {
        let mut board = TaskBoard::new();
        let (transfer, ids) = board.start_batch(files(2)).unwrap();

        assert!(matches!(board.begin_retry(&ids[0]), Err(ClientError::NotRetryable(_))));

        board.settle(transfer, Err("down".to_string()));
        let (retry, source) = board.begin_retry(&ids[0]).unwrap();
        assert_ne!(retry, transfer);
        assert_eq!(source.name, "f0.jpg");

        let task = board.get(&ids[0]).unwrap();
        assert_eq!(task.status, UploadStatus::Uploading);
        assert!(task.error.is_none());

        // The sibling stays failed and untouched by the retry transfer
        board.settle(retry, Ok(()));
        assert_eq!(board.get(&ids[0]).unwrap().status, UploadStatus::Success);
        assert_eq!(board.get(&ids[1]).unwrap().status, UploadStatus::Error);

        let missing = TaskId("nope".to_string());
        assert!(matches!(board.begin_retry(&missing), Err(ClientError::UnknownTask(_))));
    }

    #[test]
    fn test_stale_outcome_does_not_touch_retried_task() {
        let mut board = TaskBoard::new();
        let (first, ids) = board.start_batch(files(1)).unwrap();
        board.settle(first, Err("down".to_string()));
        let (second, _) = board.begin_retry(&ids[0]).unwrap();

        assert!(board.settle(first, Ok(())).is_empty());
        assert_eq!(board.get(&ids[0]).unwrap().transfer(), Some(second));
        assert_eq!(board.get(&ids[0]).unwrap().status, UploadStatus::Uploading);
    }

    #[test]
    fn test_remove_only_succeeded() {
        let mut board = TaskBoard::new();
        let (ok, ok_ids) = board.start_batch(files(1)).unwrap();
        let (bad, bad_ids) = board.start_batch(files(1)).unwrap();
        board.settle(ok, Ok(()));
        board.settle(bad, Err("x".to_string()));

        let all: Vec<TaskId> = ok_ids.iter().chain(bad_ids.iter()).cloned().collect();
        assert_eq!(board.remove_succeeded(&all), 1);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.tasks()[0].id, bad_ids[0]);
    }
}
