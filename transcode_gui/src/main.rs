#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
use eframe::egui;
use std::thread;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use transcode_core::{AppCommand, AppEvent, ClientConfig, run_backend};

mod app;
mod ui;

use app::TranscodeApp;

fn main() -> Result<(), eframe::Error> {
    // 0. Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Load config (config.json, then TRANSCODE_ENDPOINT / .env)
    let config = ClientConfig::load();
    let download_dir = config.download_dir.clone();

    // 2. Create channels (bounded with capacity 1000 for backpressure)
    let (tx_cmd, rx_cmd) = mpsc::channel::<AppCommand>(1000);
    let (tx_event, rx_event) = mpsc::channel::<AppEvent>(1000);

    // 3. Spawn session thread. One current-thread runtime: every session
    // callback runs interleaved on this thread.
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to start session runtime: {}", e);
                return;
            }
        };

        rt.block_on(run_backend(config, rx_cmd, tx_event));
    });

    // 4. Configure window options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([640.0, 520.0]),
        ..Default::default()
    };

    // 5. Run App
    eframe::run_native(
        "Video Transcoder",
        options,
        Box::new(move |cc| {
            // Initialize phosphor icons font
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);

            Ok(Box::new(TranscodeApp::new(tx_cmd, rx_event, download_dir)))
        }),
    )
}
