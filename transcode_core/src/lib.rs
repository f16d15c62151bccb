use std::path::PathBuf;
use tokio::sync::mpsc;

pub mod config;
pub mod error;
pub mod loopback;
pub mod quality;
pub mod session;

pub use config::ClientConfig;
pub use error::SessionError;
pub use quality::QualityTier;
pub use session::{ConnectionPhase, Session, SessionSnapshot, UploadPhase};

//Commands from GUI to Core
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Open the socket (no-op while one is open or opening)
    Connect,
    /// Close the socket; no automatic reconnect follows
    Disconnect,
    /// User picked a file; rejected unless it is .mp4/.m4v
    SelectFile(PathBuf),
    ClearSelection,
    SelectQuality(QualityTier),
    /// Encode the selected file and send it
    Upload,
    /// Write the current converted video to this path
    SaveDownload(PathBuf),
}

//Events from Core to GUI
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Session changed; render this
    Snapshot(SessionSnapshot),
    /// Blocking, user-facing error
    Alert(String),
    /// Converted video written to disk
    DownloadSaved(PathBuf),
}

/// Drive one session until `cmd_rx` closes.
///
/// Runs on whatever runtime calls it; the GUI gives it a current-thread
/// runtime so all session work is interleaved on one thread.
pub async fn run_backend(
    config: ClientConfig,
    cmd_rx: mpsc::Receiver<AppCommand>,
    event_tx: mpsc::Sender<AppEvent>,
) {
    tracing::info!("Starting transcode session against {}", config.endpoint);

    let mut session = Session::new(&config, event_tx);
    if config.connect_on_start {
        session.connect().await;
    }
    session.run(cmd_rx).await;
}
