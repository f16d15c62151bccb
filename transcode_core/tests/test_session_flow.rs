//! End-to-end session tests against the loopback server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use transcode_core::loopback::{LoopbackOptions, LoopbackState, create_loopback_router};
use transcode_core::session::dispatcher::StatusMessage;
use transcode_core::session::state::{STATUS_DISCONNECTED, STATUS_READY};
use transcode_core::{
    AppCommand, AppEvent, ClientConfig, ConnectionPhase, QualityTier, SessionSnapshot,
    UploadPhase, run_backend,
};

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_loopback(options: LoopbackOptions) -> (Arc<LoopbackState>, String) {
    let state = LoopbackState::new(options);
    let router = create_loopback_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (state, format!("ws://127.0.0.1:{}/ws", port))
}

fn test_config(endpoint: String, download_dir: PathBuf) -> ClientConfig {
    ClientConfig {
        endpoint,
        download_dir,
        connect_timeout_secs: 2,
        connect_on_start: true,
        max_message_size: None,
    }
}

fn start_session(config: ClientConfig) -> (mpsc::Sender<AppCommand>, mpsc::Receiver<AppEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    let (event_tx, event_rx) = mpsc::channel(100);
    tokio::spawn(run_backend(config, cmd_rx, event_tx));
    (cmd_tx, event_rx)
}

/// Collect snapshots until one matches, returning all seen so far
async fn snapshots_until(
    rx: &mut mpsc::Receiver<AppEvent>,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> Vec<SessionSnapshot> {
    snapshots_within(rx, WAIT, pred).await
}

async fn snapshots_within(
    rx: &mut mpsc::Receiver<AppEvent>,
    wait: Duration,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> Vec<SessionSnapshot> {
    tokio::time::timeout(wait, async {
        let mut seen = Vec::new();
        while let Some(evt) = rx.recv().await {
            if let AppEvent::Snapshot(snap) = evt {
                let done = pred(&snap);
                seen.push(snap);
                if done {
                    return seen;
                }
            }
        }
        panic!("Event channel closed");
    })
    .await
    .expect("Timeout waiting for snapshot")
}

async fn wait_for_alert(rx: &mut mpsc::Receiver<AppEvent>) -> String {
    tokio::time::timeout(WAIT, async {
        while let Some(evt) = rx.recv().await {
            if let AppEvent::Alert(msg) = evt {
                return msg;
            }
        }
        panic!("Event channel closed");
    })
    .await
    .expect("Timeout waiting for alert")
}

async fn write_video(dir: &tempfile::TempDir, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
    let path = dir.path().join(name);
    let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    tokio::fs::write(&path, &bytes).await.unwrap();
    (path, bytes)
}

#[tokio::test]
async fn test_upload_status_then_video() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));

    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    let (path, bytes) = write_video(&dir, "clip.mp4", 4096).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx
        .send(AppCommand::SelectQuality(QualityTier::High))
        .await
        .unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();

    let seen = snapshots_until(&mut event_rx, |s| s.download.is_some()).await;

    // "queued" was shown before any download existed
    assert!(
        seen.iter()
            .any(|s| s.upload_status == "queued" && s.download.is_none()),
        "Never saw the queued status: {:?}",
        seen
    );

    let last = seen.last().unwrap();
    assert_eq!(last.upload_status, STATUS_READY);
    assert_eq!(last.upload, UploadPhase::Idle);
    assert_eq!(last.download.as_ref().unwrap().size, bytes.len());

    // Exactly one frame, carrying the selection
    assert_eq!(server.frames_received(), 1);
    let requests = server.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].file_name, "clip.mp4");
    assert_eq!(requests[0].quality, QualityTier::High);
    drop(requests);

    // Save and compare with the original bytes
    let target = dir.path().join("saved").join("converted_video.mp4");
    cmd_tx
        .send(AppCommand::SaveDownload(target.clone()))
        .await
        .unwrap();
    let saved = tokio::time::timeout(WAIT, async {
        while let Some(evt) = event_rx.recv().await {
            if let AppEvent::DownloadSaved(path) = evt {
                return path;
            }
        }
        panic!("Event channel closed");
    })
    .await
    .expect("Timeout waiting for save");
    assert_eq!(saved, target);
    assert_eq!(tokio::fs::read(&target).await.unwrap(), bytes);
}

#[tokio::test]
async fn test_large_video_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    // Over 16 MiB once base64 encoded, and echoed back in one frame
    let len = 18 * 1024 * 1024;
    let (path, _) = write_video(&dir, "long.mp4", len).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();

    let seen = snapshots_within(&mut event_rx, Duration::from_secs(60), |s| {
        s.download.is_some() || s.phase == ConnectionPhase::Disconnected
    })
    .await;
    let last = seen.last().unwrap();
    assert_eq!(last.phase, ConnectionPhase::Connected, "status: {}", last.upload_status);
    assert_eq!(last.download.as_ref().unwrap().size, len);
    assert_eq!(server.frames_received(), 1);
}

#[tokio::test]
async fn test_each_quality_reaches_server() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    let (path, _) = write_video(&dir, "clip.m4v", 128).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();

    let mut previous = None;
    for quality in QualityTier::ALL {
        cmd_tx
            .send(AppCommand::SelectQuality(quality))
            .await
            .unwrap();
        cmd_tx.send(AppCommand::Upload).await.unwrap();

        // Each response supersedes the previous download
        let seen = snapshots_until(&mut event_rx, |s| {
            s.download.as_ref().map(|d| d.id).is_some_and(|id| Some(id) != previous)
        })
        .await;
        previous = seen.last().unwrap().download.as_ref().map(|d| d.id);
    }

    let requests = server.requests.lock().await;
    let qualities: Vec<QualityTier> = requests.iter().map(|r| r.quality).collect();
    assert_eq!(qualities, QualityTier::ALL.to_vec());
    assert!(requests.iter().all(|r| r.file_name == "clip.m4v"));
}

#[tokio::test]
async fn test_upload_without_file_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    cmd_tx.send(AppCommand::Upload).await.unwrap();
    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("select a file"), "unexpected alert: {}", alert);

    let seen = snapshots_until(&mut event_rx, |_| true).await;
    assert_eq!(seen.last().unwrap().phase, ConnectionPhase::Connected);
    assert_eq!(seen.last().unwrap().upload, UploadPhase::Idle);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.frames_received(), 0);
}

#[tokio::test]
async fn test_unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    let (good, _) = write_video(&dir, "clip.mp4", 16).await;
    cmd_tx.send(AppCommand::SelectFile(good)).await.unwrap();
    snapshots_until(&mut event_rx, |s| s.selected_file_name.is_some()).await;

    let (bad, _) = write_video(&dir, "movie.avi", 16).await;
    cmd_tx.send(AppCommand::SelectFile(bad)).await.unwrap();
    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("movie.avi"), "unexpected alert: {}", alert);

    // Selection cleared, so upload has nothing to send
    let seen = snapshots_until(&mut event_rx, |_| true).await;
    assert!(seen.last().unwrap().selected_file_name.is_none());

    cmd_tx.send(AppCommand::Upload).await.unwrap();
    wait_for_alert(&mut event_rx).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.frames_received(), 0);
}

#[tokio::test]
async fn test_upload_before_connected_is_refused() {
    let dir = tempfile::tempdir().unwrap();

    // Accepts TCP but never answers the WebSocket handshake
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let endpoint = format!("ws://127.0.0.1:{}/ws", port);

    let mut config = test_config(endpoint, dir.path().to_path_buf());
    config.connect_timeout_secs = 30;
    let (cmd_tx, mut event_rx) = start_session(config);
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connecting).await;

    let (path, _) = write_video(&dir, "clip.mp4", 16).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();

    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("not connected"), "unexpected alert: {}", alert);

    let seen = snapshots_until(&mut event_rx, |_| true).await;
    assert_eq!(seen.last().unwrap().upload, UploadPhase::Idle);
    drop(listener);
}

#[tokio::test]
async fn test_handshake_timeout_reports_error_then_disconnects() {
    let dir = tempfile::tempdir().unwrap();

    // TCP connects through the backlog; the handshake never completes
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let endpoint = format!("ws://127.0.0.1:{}/ws", port);

    let mut config = test_config(endpoint, dir.path().to_path_buf());
    config.connect_timeout_secs = 1;
    let (_cmd_tx, mut event_rx) = start_session(config);

    let seen = snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Disconnected).await;

    let timed_out = seen
        .iter()
        .position(|s| s.upload_status.contains("timed out"))
        .expect("No timeout error was shown");
    assert_eq!(seen[timed_out].phase, ConnectionPhase::Connecting);
    assert!(seen.iter().all(|s| s.phase != ConnectionPhase::Connected));
    assert_eq!(seen.last().unwrap().upload_status, STATUS_DISCONNECTED);
    drop(listener);
}

#[tokio::test]
async fn test_second_upload_rejected_while_outstanding() {
    let dir = tempfile::tempdir().unwrap();
    let (server, endpoint) = spawn_loopback(LoopbackOptions {
        reply: StatusMessage::success("queued"),
        echo_payload: false,
    })
    .await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    let (path, _) = write_video(&dir, "clip.mp4", 64).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();
    snapshots_until(&mut event_rx, |s| s.upload_status == "queued").await;

    cmd_tx.send(AppCommand::Upload).await.unwrap();
    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("already in progress"), "unexpected alert: {}", alert);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.frames_received(), 1);
}

#[tokio::test]
async fn test_failure_status_is_displayed() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, endpoint) = spawn_loopback(LoopbackOptions {
        reply: StatusMessage::error("transcode failed"),
        echo_payload: false,
    })
    .await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    let (path, _) = write_video(&dir, "clip.mp4", 64).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();

    let seen = snapshots_until(&mut event_rx, |s| s.upload_status == "transcode failed").await;
    let last = seen.last().unwrap();
    assert_eq!(last.upload, UploadPhase::Idle);
    assert!(last.download.is_none());
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, endpoint) = spawn_loopback(LoopbackOptions::default()).await;
    let (cmd_tx, mut event_rx) = start_session(test_config(endpoint, dir.path().to_path_buf()));
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;

    // Connecting again while open is a no-op
    cmd_tx.send(AppCommand::Connect).await.unwrap();
    let seen = snapshots_until(&mut event_rx, |_| true).await;
    assert_eq!(seen.last().unwrap().phase, ConnectionPhase::Connected);

    cmd_tx.send(AppCommand::Disconnect).await.unwrap();
    let seen =
        snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Disconnected).await;
    assert_eq!(seen.last().unwrap().upload_status, STATUS_DISCONNECTED);

    let (path, _) = write_video(&dir, "clip.mp4", 16).await;
    cmd_tx.send(AppCommand::SelectFile(path)).await.unwrap();
    cmd_tx.send(AppCommand::Upload).await.unwrap();
    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("not connected"), "unexpected alert: {}", alert);

    cmd_tx.send(AppCommand::Connect).await.unwrap();
    snapshots_until(&mut event_rx, |s| s.phase == ConnectionPhase::Connected).await;
}

#[tokio::test]
async fn test_invalid_endpoint_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let (_cmd_tx, mut event_rx) = start_session(test_config(
        "http://127.0.0.1:1/ws".to_string(),
        dir.path().to_path_buf(),
    ));

    let alert = wait_for_alert(&mut event_rx).await;
    assert!(alert.contains("Invalid endpoint"), "unexpected alert: {}", alert);
}
