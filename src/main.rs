mod app;
mod chart;
mod color;
mod config;
mod data;
mod pipeline;
mod state;
mod ui;

use app::CuBlockViewerApp;
use clap::Parser;
use config::{Args, SourceConfig};
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = SourceConfig::from(Args::parse());
    log::info!("block model source: {}", config.location);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cu Block Viewer – 3D Mining Blocks",
        options,
        Box::new(|_cc| Ok(Box::new(CuBlockViewerApp::new(config)))),
    )
}
