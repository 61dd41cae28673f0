//! Event loop that owns all client state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::client::error::{ClientError, Result, TransferError};
use crate::client::gallery::{format_file_size, GalleryProjection, ViewMode};
use crate::client::notifications::{
    Notification, NotificationCenter, NotificationId, NotificationKind, AUTO_DISMISS_AFTER,
};
use crate::client::source::SourceFile;
use crate::client::transport::GalleryTransport;
use crate::client::uploads::{
    TaskBoard, TaskId, TransferId, UploadTask, SUCCESS_LINGER, TICK_INTERVAL,
};
use crate::models::{ImageRecord, UploadResponse};
use crate::validation::{self, RejectionNotice, UploadLimits};

const COMMAND_BUFFER: usize = 64;

/// Outcome of adding files to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionReport {
    pub accepted: usize,
    pub rejected: usize,
}

/// Point-in-time copy of the client state
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub selection: Vec<SourceFile>,
    pub tasks: Vec<UploadTask>,
    pub notifications: Vec<Notification>,
    pub images: Vec<ImageRecord>,
    pub view_mode: ViewMode,
    pub viewing: Option<ImageRecord>,
}

impl Snapshot {
    pub fn task(&self, id: &TaskId) -> Option<&UploadTask> {
        self.tasks.iter().find(|t| &t.id == id)
    }
}

enum Command {
    Select {
        files: Vec<SourceFile>,
        reply: oneshot::Sender<SelectionReport>,
    },
    Deselect {
        index: usize,
    },
    ClearSelection,
    Upload {
        reply: oneshot::Sender<Result<Vec<TaskId>>>,
    },
    Retry {
        id: TaskId,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        id: i64,
    },
    Refresh,
    Dismiss {
        id: NotificationId,
    },
    SetViewMode(ViewMode),
    OpenViewer {
        id: i64,
        reply: oneshot::Sender<Result<ImageRecord>>,
    },
    ViewerStep {
        forward: bool,
        reply: oneshot::Sender<Option<ImageRecord>>,
    },
    CloseViewer,
    Download {
        id: i64,
        dir: PathBuf,
        reply: oneshot::Sender<Result<PathBuf>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

enum Event {
    Tick(TransferId),
    TransferSettled {
        transfer: TransferId,
        outcome: std::result::Result<UploadResponse, TransferError>,
    },
    LingerElapsed {
        transfer: TransferId,
        ids: Vec<TaskId>,
    },
    DeleteSettled {
        id: i64,
        outcome: std::result::Result<(), TransferError>,
    },
    Refreshed {
        generation: u64,
        outcome: std::result::Result<Vec<ImageRecord>, TransferError>,
    },
    AutoDismiss(NotificationId),
}

/// Cloneable handle used to drive a running [`Controller`]
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
}

impl ControllerHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| ClientError::Closed)
    }

    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Validate files and add the accepted ones to the selection
    pub async fn select(&self, files: Vec<SourceFile>) -> Result<SelectionReport> {
        self.request(|reply| Command::Select { files, reply }).await
    }

    pub async fn deselect(&self, index: usize) -> Result<()> {
        self.send(Command::Deselect { index }).await
    }

    pub async fn clear_selection(&self) -> Result<()> {
        self.send(Command::ClearSelection).await
    }

    /// Upload the current selection as one batch; returns without waiting for the transfer
    pub async fn upload(&self) -> Result<Vec<TaskId>> {
        self.request(|reply| Command::Upload { reply }).await?
    }

    pub async fn retry(&self, id: TaskId) -> Result<()> {
        self.request(|reply| Command::Retry { id, reply }).await?
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.send(Command::Delete { id }).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    pub async fn dismiss(&self, id: NotificationId) -> Result<()> {
        self.send(Command::Dismiss { id }).await
    }

    pub async fn set_view_mode(&self, mode: ViewMode) -> Result<()> {
        self.send(Command::SetViewMode(mode)).await
    }

    pub async fn open_viewer(&self, id: i64) -> Result<ImageRecord> {
        self.request(|reply| Command::OpenViewer { id, reply }).await?
    }

    pub async fn next_image(&self) -> Result<Option<ImageRecord>> {
        self.request(|reply| Command::ViewerStep { forward: true, reply }).await
    }

    pub async fn previous_image(&self) -> Result<Option<ImageRecord>> {
        self.request(|reply| Command::ViewerStep { forward: false, reply }).await
    }

    pub async fn close_viewer(&self) -> Result<()> {
        self.send(Command::CloseViewer).await
    }

    /// Save a gallery image into `dir` under its original name
    pub async fn download(&self, id: i64, dir: impl Into<PathBuf>) -> Result<PathBuf> {
        let dir = dir.into();
        self.request(|reply| Command::Download { id, dir, reply }).await?
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }
}

/// Owner of the selection, upload tasks, notifications and gallery
pub struct Controller {
    transport: Arc<dyn GalleryTransport>,
    limits: UploadLimits,
    events: mpsc::UnboundedSender<Event>,
    selection: Vec<SourceFile>,
    board: TaskBoard,
    notifications: NotificationCenter,
    gallery: GalleryProjection,
    simulations: HashMap<TransferId, JoinHandle<()>>,
    lingers: HashMap<TransferId, JoinHandle<()>>,
    dismissals: HashMap<NotificationId, JoinHandle<()>>,
    refresh_generation: u64,
    applied_generation: u64,
}

impl Controller {
    /// Start a controller on the current runtime and fetch the gallery once
    ///
    /// The controller stops when every handle has been dropped.
    pub fn spawn(transport: impl GalleryTransport, limits: UploadLimits) -> ControllerHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let controller = Controller {
            transport: Arc::new(transport),
            limits,
            events: event_tx,
            selection: Vec::new(),
            board: TaskBoard::new(),
            notifications: NotificationCenter::new(),
            gallery: GalleryProjection::new(),
            simulations: HashMap::new(),
            lingers: HashMap::new(),
            dismissals: HashMap::new(),
            refresh_generation: 0,
            applied_generation: 0,
        };
        tokio::spawn(controller.run(command_rx, event_rx));

        ControllerHandle {
            commands: command_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        self.request_refresh();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        self.shutdown();
    }

    fn shutdown(&mut self) {
        for (_, handle) in self.simulations.drain() {
            handle.abort();
        }
        for (_, handle) in self.lingers.drain() {
            handle.abort();
        }
        for (_, handle) in self.dismissals.drain() {
            handle.abort();
        }
        tracing::debug!("Upload client controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Select { files, reply } => {
                let report = self.select(files);
                let _ = reply.send(report);
            }
            Command::Deselect { index } => {
                if index < self.selection.len() {
                    self.selection.remove(index);
                }
            }
            Command::ClearSelection => self.selection.clear(),
            Command::Upload { reply } => {
                let _ = reply.send(self.start_upload());
            }
            Command::Retry { id, reply } => {
                let _ = reply.send(self.retry(&id));
            }
            Command::Delete { id } => self.start_delete(id),
            Command::Refresh => self.request_refresh(),
            Command::Dismiss { id } => {
                if let Some(handle) = self.dismissals.remove(&id) {
                    handle.abort();
                }
                self.notifications.dismiss(&id);
            }
            Command::SetViewMode(mode) => self.gallery.set_view_mode(mode),
            Command::OpenViewer { id, reply } => {
                let _ = reply.send(self.gallery.open_viewer(id).cloned());
            }
            Command::ViewerStep { forward, reply } => {
                let current = if forward {
                    self.gallery.next()
                } else {
                    self.gallery.previous()
                };
                let _ = reply.send(current.cloned());
            }
            Command::CloseViewer => self.gallery.close_viewer(),
            Command::Download { id, dir, reply } => match self.gallery.download_payload(id) {
                Ok(payload) => {
                    tokio::spawn(async move {
                        let _ = reply.send(payload.save(&dir).await);
                    });
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick(transfer) => {
                if !self.board.tick(transfer) {
                    if let Some(handle) = self.simulations.remove(&transfer) {
                        handle.abort();
                    }
                }
            }
            Event::TransferSettled { transfer, outcome } => self.settle(transfer, outcome),
            Event::LingerElapsed { transfer, ids } => {
                self.lingers.remove(&transfer);
                self.board.remove_succeeded(&ids);
            }
            Event::DeleteSettled { id, outcome } => match outcome {
                Ok(()) => {
                    tracing::info!("Image {} deleted", id);
                    self.notify(
                        NotificationKind::Success,
                        "Image Deleted",
                        "Image has been deleted successfully",
                    );
                    self.request_refresh();
                }
                Err(e) => {
                    tracing::warn!("Failed to delete image {}: {}", id, e);
                    self.notify(NotificationKind::Error, "Delete Failed", e.to_string());
                }
            },
            Event::Refreshed { generation, outcome } => {
                // A settled refresh supersedes every older one, even when it failed
                if generation <= self.applied_generation {
                    tracing::debug!("Discarding superseded gallery refresh {}", generation);
                    return;
                }
                self.applied_generation = generation;
                match outcome {
                    Ok(images) => self.gallery.replace(images),
                    Err(e) => tracing::warn!("Failed to refresh gallery: {}", e),
                }
            }
            Event::AutoDismiss(id) => {
                self.dismissals.remove(&id);
                self.notifications.dismiss(&id);
            }
        }
    }

    fn select(&mut self, files: Vec<SourceFile>) -> SelectionReport {
        let partition = validation::partition(files, &self.limits);
        let report = SelectionReport {
            accepted: partition.accepted.len(),
            rejected: partition.rejected.len(),
        };

        let accepted_kinds = format!(
            "Only JPEG, PNG, and GIF images up to {} are supported",
            format_file_size(self.limits.max_file_size)
        );
        match partition.notice() {
            Some(RejectionNotice::AllRejected) => {
                self.notify(NotificationKind::Error, "Invalid File Type", accepted_kinds)
            }
            Some(RejectionNotice::PartiallyRejected { rejected }) => self.notify(
                NotificationKind::Error,
                "Some Files Skipped",
                format!("{} file(s) were skipped. {}", rejected, accepted_kinds),
            ),
            None => {}
        }

        self.selection.extend(partition.accepted);
        report
    }

    fn start_upload(&mut self) -> Result<Vec<TaskId>> {
        if self.selection.is_empty() {
            return Err(ClientError::NothingSelected);
        }

        let files = std::mem::take(&mut self.selection);
        let (transfer, ids) = self.board.start_batch(files.clone())?;
        tracing::info!("Uploading batch of {} file(s)", ids.len());

        self.start_transfer(transfer, files);
        Ok(ids)
    }

    fn retry(&mut self, id: &TaskId) -> Result<()> {
        let (transfer, source) = self.board.begin_retry(id)?;
        tracing::info!("Retrying upload of {}", source.name);

        self.start_transfer(transfer, vec![source]);
        Ok(())
    }

    /// Issue the request and start the progress simulation that accompanies it
    fn start_transfer(&mut self, transfer: TransferId, files: Vec<SourceFile>) {
        let events = self.events.clone();
        let simulation = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if events.send(Event::Tick(transfer)).is_err() {
                    break;
                }
            }
        });
        self.simulations.insert(transfer, simulation);

        let events = self.events.clone();
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let outcome = transport.upload(files).await;
            let _ = events.send(Event::TransferSettled { transfer, outcome });
        });
    }

    fn settle(
        &mut self,
        transfer: TransferId,
        outcome: std::result::Result<UploadResponse, TransferError>,
    ) {
        if let Some(handle) = self.simulations.remove(&transfer) {
            handle.abort();
        }

        let result = outcome.as_ref().map(|_| ()).map_err(|e| e.to_string());
        let ids = self.board.settle(transfer, result);
        if ids.is_empty() {
            tracing::debug!("Ignoring outcome of superseded transfer {:?}", transfer);
            return;
        }

        match outcome {
            Ok(response) => {
                tracing::info!("{}", response.message);
                self.notify(
                    NotificationKind::Success,
                    "Upload Successful",
                    format!("{} image(s) have been uploaded", response.images.len()),
                );

                let events = self.events.clone();
                let linger = tokio::spawn(async move {
                    tokio::time::sleep(SUCCESS_LINGER).await;
                    let _ = events.send(Event::LingerElapsed { transfer, ids });
                });
                self.lingers.insert(transfer, linger);

                self.request_refresh();
            }
            Err(e) => {
                tracing::warn!("Upload of {} file(s) failed: {}", ids.len(), e);
                self.notify(NotificationKind::Error, "Upload Failed", e.to_string());
            }
        }
    }

    fn start_delete(&mut self, id: i64) {
        let events = self.events.clone();
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let outcome = transport.delete(id).await;
            let _ = events.send(Event::DeleteSettled { id, outcome });
        });
    }

    fn request_refresh(&mut self) {
        self.refresh_generation += 1;
        let generation = self.refresh_generation;

        let events = self.events.clone();
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let outcome = transport.list().await;
            let _ = events.send(Event::Refreshed { generation, outcome });
        });
    }

    fn notify(&mut self, kind: NotificationKind, title: &str, message: impl Into<String>) {
        let id = self.notifications.push(kind, title, message, true).id.clone();

        let events = self.events.clone();
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(AUTO_DISMISS_AFTER).await;
            let _ = events.send(Event::AutoDismiss(timer_id));
        });
        self.dismissals.insert(id, timer);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            selection: self.selection.clone(),
            tasks: self.board.tasks().to_vec(),
            notifications: self.notifications.list().to_vec(),
            images: self.gallery.images().to_vec(),
            view_mode: self.gallery.view_mode(),
            viewing: self.gallery.current().cloned(),
        }
    }
}
