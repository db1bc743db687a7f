//! App module - window state and the glue between UI events and the manager

mod form;
mod table;

pub(crate) use form::render_form;
pub(crate) use table::render_users;

use crate::api::HttpUsersApi;
use crate::manager::{Pending, UserManager};
use crate::settings::Settings;
use crate::theme;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// User interaction collected during a frame, applied once the state lock is released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Submit,
    CancelEdit,
    Edit(u64),
    Delete(u64),
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) manager: UserManager,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) settings: Settings,
    pub(crate) data_dir: PathBuf,
    pub(crate) initial_load_started: bool,
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, data_dir: PathBuf) -> Result<Self, DynError> {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        theme::apply_visuals(&cc.egui_ctx);

        let base_url = settings.effective_api_url();
        info!(url = %base_url, timeout = ?settings.request_timeout(), "Using users endpoint");
        let api = HttpUsersApi::new(&base_url, settings.request_timeout())?;

        let ctx = cc.egui_ctx.clone();
        let manager = UserManager::new(Arc::new(api)).with_notifier(move || ctx.request_repaint());

        Ok(Self {
            manager,
            runtime: tokio::runtime::Runtime::new()?,
            settings,
            data_dir,
            initial_load_started: false,
            window_pos: None,
            window_size: None,
            needs_center: false,
        })
    }

    pub fn save_settings(&mut self) {
        if let Some(pos) = self.window_pos {
            self.settings.window_x = Some(pos.x);
            self.settings.window_y = Some(pos.y);
        }
        if let Some(size) = self.window_size {
            self.settings.window_w = Some(size.x);
            self.settings.window_h = Some(size.y);
        }
        self.settings.save(&self.data_dir);
    }

    /// Run a started request on the runtime. Busy is already set by the time
    /// this returns; failures are logged by the manager.
    fn spawn(&self, started: crate::error::Result<Pending>) {
        if let Ok(request) = started {
            self.runtime.spawn(async move {
                let _ = request.await;
            });
        }
    }

    pub fn start_initial_load(&mut self) {
        if self.initial_load_started {
            return;
        }
        self.initial_load_started = true;
        self.spawn(self.manager.start_load());
    }

    pub fn dispatch(&self, action: UiAction) {
        match action {
            UiAction::Submit => self.spawn(self.manager.start_submit()),
            UiAction::Delete(id) => self.spawn(self.manager.start_delete(id)),
            UiAction::Edit(id) => {
                let _ = self.manager.begin_edit(id);
            }
            UiAction::CancelEdit => self.manager.cancel_edit(),
        }
    }
}
