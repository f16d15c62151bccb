//! Session event loop
//!
//! One task owns the session and reacts to three inputs in turn: user
//! commands, socket events and finished encodes. Each reaction runs to
//! completion before the next input is looked at, then a fresh snapshot is
//! published.

use super::connection::{ConnectionManager, SocketEvent};
use super::request::{self, SelectedFile, UploadRequest};
use super::state::{SessionEvent, SessionState, UploadPhase};
use super::dispatcher;
use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::{AppCommand, AppEvent};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the internal socket and encode channels
const CHANNEL_CAPACITY: usize = 256;

struct EncodeDone {
    upload_id: u64,
    result: Result<UploadRequest>,
}

pub struct Session {
    state: SessionState,
    connection: ConnectionManager,
    endpoint: String,
    event_tx: mpsc::Sender<AppEvent>,
    socket_rx: mpsc::Receiver<SocketEvent>,
    encoded_tx: mpsc::Sender<EncodeDone>,
    encoded_rx: mpsc::Receiver<EncodeDone>,
    upload_seq: u64,
}

impl Session {
    pub fn new(config: &ClientConfig, event_tx: mpsc::Sender<AppEvent>) -> Self {
        let (socket_tx, socket_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (encoded_tx, encoded_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            state: SessionState::new(),
            connection: ConnectionManager::new(
                socket_tx,
                config.connect_timeout(),
                config.max_message_size,
            ),
            endpoint: config.endpoint.clone(),
            event_tx,
            socket_rx,
            encoded_tx,
            encoded_rx,
            upload_seq: 0,
        }
    }

    /// Run until the command channel closes, then close the socket
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<AppCommand>) {
        self.publish().await;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                Some(event) = self.socket_rx.recv() => self.handle_socket_event(event).await,
                Some(done) = self.encoded_rx.recv() => self.handle_encoded(done).await,
            }
        }

        self.connection.close();
        info!("Session ended");
    }

    pub async fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::Connect => self.connect().await,
            AppCommand::Disconnect => self.connection.close(),
            AppCommand::SelectFile(path) => self.select_file(path).await,
            AppCommand::ClearSelection => self.state.apply(SessionEvent::SelectionCleared),
            AppCommand::SelectQuality(quality) => {
                debug!("Selected quality: {}", quality);
                self.state.apply(SessionEvent::QualitySelected(quality));
            }
            AppCommand::Upload => self.start_upload().await,
            AppCommand::SaveDownload(path) => self.save_download(path).await,
        }
        self.publish().await;
    }

    pub async fn connect(&mut self) {
        let endpoint = self.endpoint.clone();
        if let Err(e) = self.connection.connect(&mut self.state, &endpoint) {
            self.alert(&e).await;
        }
    }

    async fn select_file(&mut self, path: PathBuf) {
        match SelectedFile::from_path(path) {
            Ok(file) => {
                info!("Selected file: {}", file.path().display());
                self.state.apply(SessionEvent::FileSelected(file));
            }
            Err(e) => {
                self.state.apply(SessionEvent::SelectionCleared);
                self.alert(&e).await;
            }
        }
    }

    async fn start_upload(&mut self) {
        let file = match self.state.ready_for_upload() {
            Ok(file) => file.clone(),
            Err(e) => {
                self.alert(&e).await;
                return;
            }
        };

        let quality = self.state.quality();
        self.upload_seq += 1;
        let upload_id = self.upload_seq;

        self.state.apply(SessionEvent::EncodingStarted {
            file_name: file.name().to_string(),
            quality,
        });

        let encoded_tx = self.encoded_tx.clone();
        tokio::spawn(async move {
            let result = request::build(Some(&file), quality).await;
            let _ = encoded_tx.send(EncodeDone { upload_id, result }).await;
        });
    }

    async fn handle_encoded(&mut self, done: EncodeDone) {
        let encoding = matches!(self.state.upload(), UploadPhase::Encoding { .. });
        if done.upload_id != self.upload_seq || !encoding {
            debug!("Dropping result of abandoned upload #{}", done.upload_id);
            return;
        }

        let sent = done
            .result
            .and_then(|req| request::submit(&self.connection, &self.state, &req));

        match sent {
            Ok(()) => self.state.apply(SessionEvent::RequestSent),
            Err(e) => {
                warn!("Upload #{} failed: {}", done.upload_id, e);
                self.state.apply(SessionEvent::UploadAborted {
                    reason: format!("Upload failed: {}", e),
                });
                self.alert(&e).await;
            }
        }
        self.publish().await;
    }

    async fn handle_socket_event(&mut self, event: SocketEvent) {
        if let Some(frame) = self.connection.handle_event(&mut self.state, event) {
            dispatcher::dispatch(&mut self.state, frame);
        }
        self.publish().await;
    }

    async fn save_download(&mut self, path: PathBuf) {
        let Some(handle) = self.state.download() else {
            self.alert_text("No converted video to save yet".to_string()).await;
            return;
        };

        match handle.save_to(&path).await {
            Ok(()) => {
                let _ = self.event_tx.send(AppEvent::DownloadSaved(path)).await;
            }
            Err(e) => self.alert(&e).await,
        }
    }

    async fn publish(&self) {
        let _ = self
            .event_tx
            .send(AppEvent::Snapshot(self.state.snapshot()))
            .await;
    }

    async fn alert(&self, error: &SessionError) {
        self.alert_text(error.to_string()).await;
    }

    async fn alert_text(&self, message: String) {
        warn!("{}", message);
        let _ = self.event_tx.send(AppEvent::Alert(message)).await;
    }
}
