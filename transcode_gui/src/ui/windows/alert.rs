use eframe::egui;
use egui_phosphor::regular::WARNING;
use std::collections::VecDeque;

/// Alerts waiting to be acknowledged, oldest first
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    queue: VecDeque<String>,
}

impl AlertState {
    pub fn push(&mut self, message: String) {
        self.queue.push_back(message);
    }
}

/// Render the oldest pending alert as a blocking dialog
pub fn show_alert_window(ctx: &egui::Context, state: &mut AlertState) {
    let Some(message) = state.queue.front() else {
        return;
    };

    let mut open = true;
    let mut acknowledged = false;

    egui::Window::new(format!("{} Alert", WARNING))
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label(message);
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                acknowledged = true;
            }
        });

    if !open || acknowledged {
        state.queue.pop_front();
    }
}
