//! Users table

use super::UiAction;
use crate::manager::ViewState;
use crate::theme;
use crate::ui::components::{header_label, loading_indicator};
use eframe::egui;
use egui_extras::{Column, TableBuilder};

const COLUMNS: [&str; 4] = ["Name", "Email", "Phone", "Actions"];

pub(crate) fn render_users(ui: &mut egui::Ui, state: &ViewState, actions: &mut Vec<UiAction>) {
    ui.label(egui::RichText::new("Users List").size(theme::FONT_HEADING).strong());
    ui.add_space(theme::SPACING_MD);

    if state.busy {
        loading_indicator(ui);
        return;
    }
    if state.users.is_empty() {
        ui.label(egui::RichText::new("No users").color(theme::TEXT_DIM));
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(200.0).at_least(80.0))
        .column(Column::initial(240.0).at_least(80.0))
        .column(Column::initial(200.0).at_least(80.0))
        .column(Column::remainder().at_least(180.0))
        .header(theme::HEADER_HEIGHT, |mut header| {
            for title in COLUMNS {
                header.col(|ui| header_label(ui, title));
            }
        })
        .body(|body| {
            body.rows(theme::ROW_HEIGHT, state.users.len(), |mut row| {
                let user = &state.users[row.index()];
                row.col(|ui| {
                    ui.label(user.name.as_str());
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(user.email.as_str()).color(theme::TEXT_MUTED));
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(user.phone.as_str()).color(theme::TEXT_MUTED));
                });
                row.col(|ui| {
                    let edit = ui.add(theme::button(format!("{}  Edit", egui_phosphor::regular::PENCIL_SIMPLE)));
                    if edit.clicked() {
                        actions.push(UiAction::Edit(user.id));
                    }
                    let delete = ui.add(theme::button_danger(format!("{}  Delete", egui_phosphor::regular::TRASH)));
                    if delete.clicked() {
                        actions.push(UiAction::Delete(user.id));
                    }
                });
            });
        });
}
