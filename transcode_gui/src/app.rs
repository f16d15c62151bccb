use crate::ui;
use crate::ui::windows::alert::{self, AlertState};
use eframe::egui;
use egui_phosphor::regular::{DOWNLOAD_SIMPLE, FILE_VIDEO, UPLOAD_SIMPLE};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use transcode_core::{AppCommand, AppEvent, SessionSnapshot, UploadPhase};

#[derive(Default)]
pub struct AppUIState {
    pub show_quality_list: bool,
}

/// Log entry with type for color coding
#[derive(Clone)]
enum LogType {
    Info,
    Success,
    Error,
}

#[derive(Clone)]
struct LogEntry {
    message: String,
    log_type: LogType,
}

pub struct TranscodeApp {
    // Channels
    cmd_sender: mpsc::Sender<AppCommand>,
    event_receiver: mpsc::Receiver<AppEvent>,

    // App State
    ui_state: AppUIState,
    alert_state: AlertState,

    // Latest session view, replaced wholesale on every snapshot
    snapshot: SessionSnapshot,
    status_log: Vec<LogEntry>,
    download_dir: PathBuf,
}

impl TranscodeApp {
    pub fn new(
        tx: mpsc::Sender<AppCommand>,
        rx: mpsc::Receiver<AppEvent>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            cmd_sender: tx,
            event_receiver: rx,
            ui_state: AppUIState::default(),
            alert_state: AlertState::default(),
            snapshot: SessionSnapshot::default(),
            status_log: Vec::new(),
            download_dir,
        }
    }

    fn send(&self, cmd: AppCommand) {
        if let Err(e) = self.cmd_sender.blocking_send(cmd) {
            tracing::error!("Session is gone, dropping command: {}", e);
        }
    }

    fn log(&mut self, message: String, log_type: LogType) {
        if self.status_log.last().map(|e| &e.message) != Some(&message) {
            self.status_log.push(LogEntry { message, log_type });
        }
    }
}

impl eframe::App for TranscodeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                AppEvent::Snapshot(snapshot) => {
                    if !snapshot.upload_status.is_empty() {
                        self.log(snapshot.upload_status.clone(), LogType::Info);
                    }
                    self.snapshot = snapshot;
                }
                AppEvent::Alert(message) => {
                    self.log(format!("[ERROR] {}", message), LogType::Error);
                    self.alert_state.push(message);
                }
                AppEvent::DownloadSaved(path) => {
                    self.log(format!("Saved to {}", path.display()), LogType::Success);
                }
            }
        }

        ui::toolbar::show(ctx, self.snapshot.phase, &self.cmd_sender);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Convert your .mp4 video to HEVC (.mp4)!");
            ui.add_space(10.0);

            // 1. File picker
            ui.horizontal(|ui| {
                if ui.button(format!("{} Choose video...", FILE_VIDEO)).clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("Video", &["mp4", "m4v"])
                        .pick_file()
                {
                    self.send(AppCommand::SelectFile(path));
                }
                match &self.snapshot.selected_file_name {
                    Some(name) => ui.monospace(name),
                    None => ui.label(egui::RichText::new("No file selected").italics().weak()),
                };
            });

            ui.add_space(8.0);

            // 2. Quality picker
            if let Some(quality) = ui::quality::show(
                ui,
                &mut self.ui_state.show_quality_list,
                self.snapshot.quality,
            ) {
                self.send(AppCommand::SelectQuality(quality));
            }

            ui.add_space(8.0);

            // 3. Upload
            ui.horizontal(|ui| {
                if ui.button(format!("{} Upload", UPLOAD_SIMPLE)).clicked() {
                    self.send(AppCommand::Upload);
                }
                match &self.snapshot.upload {
                    UploadPhase::Idle => {}
                    UploadPhase::Encoding { file_name } => {
                        ui.spinner();
                        ui.label(format!("Encoding {}...", file_name));
                    }
                    UploadPhase::AwaitingResponse { file_name, quality } => {
                        ui.spinner();
                        ui.label(format!("Transcoding {} ({})...", file_name, quality));
                    }
                }
            });

            ui.label(format!("Status: {}", self.snapshot.upload_status));

            // 4. Download
            if let Some(download) = self.snapshot.download.clone() {
                ui.add_space(8.0);
                ui.colored_label(
                    egui::Color32::from_rgb(100, 200, 100),
                    format!("Download the converted video ({}):", format_size(download.size)),
                );
                if ui
                    .button(format!("{} Save converted video", DOWNLOAD_SIMPLE))
                    .clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .set_directory(&self.download_dir)
                        .set_file_name(&download.file_name)
                        .save_file()
                {
                    if let Some(parent) = path.parent() {
                        self.download_dir = parent.to_path_buf();
                    }
                    self.send(AppCommand::SaveDownload(path));
                }
            }

            // 5. Status log
            ui.separator();
            ui.label("Status Logs:");
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for entry in &self.status_log {
                        let color = match entry.log_type {
                            LogType::Info => egui::Color32::GRAY,
                            LogType::Success => egui::Color32::from_rgb(100, 200, 100),
                            LogType::Error => egui::Color32::from_rgb(255, 100, 100),
                        };
                        ui.colored_label(color, &entry.message);
                    }
                });
        });

        alert::show_alert_window(ctx, &mut self.alert_state);

        // Poll the session for new events
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
