use eframe::egui;
use egui_phosphor::regular::{PLUGS, PLUGS_CONNECTED};
use tokio::sync::mpsc;
use transcode_core::{AppCommand, ConnectionPhase};

pub fn show(ctx: &egui::Context, phase: ConnectionPhase, cmd_tx: &mpsc::Sender<AppCommand>) {
    egui::SidePanel::right("right_toolbar")
        .resizable(false)
        .default_width(150.0)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.add_space(8.0);

                let (label, color) = match phase {
                    ConnectionPhase::Connected => ("Connected", egui::Color32::from_rgb(100, 200, 100)),
                    ConnectionPhase::Connecting => ("Connecting...", egui::Color32::from_rgb(255, 200, 100)),
                    ConnectionPhase::Disconnected => ("Disconnected", egui::Color32::from_rgb(255, 100, 100)),
                };
                ui.colored_label(color, label);
                ui.add_space(8.0);

                // Connect is a no-op in the core unless disconnected; the
                // button state just mirrors that.
                let can_connect = phase == ConnectionPhase::Disconnected;
                if ui
                    .add_enabled(can_connect, egui::Button::new(format!("{} Connect", PLUGS_CONNECTED)))
                    .clicked()
                {
                    let _ = cmd_tx.blocking_send(AppCommand::Connect);
                }

                if ui
                    .add_enabled(!can_connect, egui::Button::new(format!("{} Disconnect", PLUGS)))
                    .clicked()
                {
                    let _ = cmd_tx.blocking_send(AppCommand::Disconnect);
                }
            });
        });
}
