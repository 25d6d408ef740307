mod actions;
mod app;
mod clipboard;
mod codec;
mod config;
mod error;
mod history;
mod image_state;
mod preview;
mod processing;
mod selection;
mod session;
mod viewer;
mod viewport;

use std::path::PathBuf;

use app::RetouchApp;
use config::AppConfig;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();
    let initial = std::env::args_os().nth(1).map(PathBuf::from);

    let width = config.window_width.unwrap_or(1000.0);
    let height = config.window_height.unwrap_or(700.0);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Retouch")
            .with_app_id("retouch")
            .with_inner_size([width, height]),
        ..Default::default()
    };

    eframe::run_native(
        "retouch",
        native_options,
        Box::new(|cc| Ok(Box::new(RetouchApp::new(cc, config, initial)))),
    )
}
