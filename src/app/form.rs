//! Create/edit form

use super::UiAction;
use crate::manager::ViewState;
use crate::theme;
use crate::ui::components::text_input;
use eframe::egui;

pub(crate) fn render_form(ui: &mut egui::Ui, state: &mut ViewState, actions: &mut Vec<UiAction>) {
    ui.label(egui::RichText::new("Create User").size(theme::FONT_HEADING).strong());
    ui.add_space(theme::SPACING_MD);

    let mut enter_pressed = false;
    ui.horizontal(|ui| {
        for (value, hint) in [
            (&mut state.form.name, "Name"),
            (&mut state.form.email, "Email"),
            (&mut state.form.phone, "Phone"),
        ] {
            let response = text_input(ui, value, hint);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                enter_pressed = true;
            }
        }
    });

    let validation = state.form.validate();
    let can_submit = validation.is_ok() && !state.busy;

    ui.add_space(theme::SPACING_SM);
    ui.horizontal(|ui| {
        ui.set_min_height(theme::BUTTON_HEIGHT);
        let icon = if state.is_editing() {
            egui_phosphor::regular::FLOPPY_DISK
        } else {
            egui_phosphor::regular::USER_PLUS
        };
        let submit = ui.add_enabled(
            can_submit,
            theme::button_accent(format!("{}  {}", icon, state.submit_label())),
        );
        if submit.clicked() || (enter_pressed && can_submit) {
            actions.push(UiAction::Submit);
        }

        if state.is_editing() {
            let cancel = ui.add_enabled(
                !state.busy,
                theme::button(format!("{}  Cancel", egui_phosphor::regular::X)),
            );
            if cancel.clicked() {
                actions.push(UiAction::CancelEdit);
            }
        }

        // Required-field hint, like a browser's constraint tooltip
        let touched = !(state.form.name.is_empty() && state.form.email.is_empty() && state.form.phone.is_empty());
        if let (Err(e), true) = (validation, touched) {
            ui.label(egui::RichText::new(e.to_string()).size(theme::FONT_LABEL).color(theme::TEXT_DIM));
        }
    });
}
