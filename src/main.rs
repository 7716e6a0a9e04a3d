mod app;
mod config;
mod editor;
mod error;
mod export;
mod image_set;
mod labels;
mod navigation;
mod session;
mod store;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::Cli;
use eframe::egui;
use session::Session;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let session = Session::start(&cli)
        .with_context(|| format!("cannot start marking {}", cli.input.display()))?;

    let title = format!("image-marker - {} ({})", cli.input.display(), cli.mode);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(app::MarkerApp::new(session)))),
    )
    .map_err(|e| anyhow!("window closed with an error: {e}"))
}
