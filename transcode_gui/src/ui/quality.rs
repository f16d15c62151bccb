use eframe::egui;
use transcode_core::QualityTier;

/// Quality picker: a toggle button opening the catalog list.
/// Returns the tier the user clicked, if any.
pub fn show(ui: &mut egui::Ui, open: &mut bool, current: QualityTier) -> Option<QualityTier> {
    let mut picked = None;

    if *open {
        ui.vertical(|ui| {
            for quality in QualityTier::ALL {
                let text = egui::RichText::new(quality.label()).color(egui::Color32::BLACK);
                let button = egui::Button::new(text).fill(egui::Color32::LIGHT_GREEN);
                if ui.add(button).clicked() {
                    picked = Some(quality);
                    *open = false;
                }
            }
        });
    }

    let toggle_text = if *open { "Close List" } else { "Select Video Quality" };
    if ui.button(toggle_text).clicked() {
        *open = !*open;
    }

    ui.colored_label(
        egui::Color32::YELLOW,
        format!("Selected Video Quality: {}", current.label()),
    );

    picked
}
