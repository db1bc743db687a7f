//! Reusable UI components

use crate::theme;
use eframe::egui;

/// Single-line form input with placeholder text
pub fn text_input(ui: &mut egui::Ui, value: &mut String, hint: &str) -> egui::Response {
    ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(egui::RichText::new(hint).color(theme::TEXT_DIM))
            .desired_width(theme::INPUT_WIDTH)
            .margin(egui::Margin::symmetric(8, 6)),
    )
}

/// Shown in place of the users table while a request is outstanding
pub fn loading_indicator(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(egui::RichText::new("Loading...").color(theme::TEXT_MUTED));
    });
}

/// Column header label
pub fn header_label(ui: &mut egui::Ui, text: &str) {
    ui.label(
        egui::RichText::new(text)
            .size(theme::FONT_LABEL)
            .strong()
            .color(theme::TEXT_MUTED),
    );
}
