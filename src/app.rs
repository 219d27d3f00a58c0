use eframe::egui;

use crate::config::SourceConfig;
use crate::state::AppState;
use crate::ui::plot::Camera;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CuBlockViewerApp {
    pub state: AppState,
    pub camera: Camera,
}

impl CuBlockViewerApp {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            state: AppState::new(config),
            camera: Camera::default(),
        }
    }
}

impl eframe::App for CuBlockViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Paint one "Loading…" frame before the blocking fetch.
        if self.state.advance() {
            ctx.request_repaint();
        }

        // ---- Top panel: menu bar + banners ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: 3D scatter ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::scatter_3d(ui, &self.state, &mut self.camera);
        });
    }
}
