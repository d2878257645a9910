//! Orbit Viewer - an interactive glTF model viewer on Vulkan
//!
//! Drag to orbit, scroll or pinch to zoom.

mod app;
mod settings;

use anyhow::{Context, Result};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use winit::event_loop::EventLoop;

use app::ViewerApp;
use settings::ViewerSettings;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Orbit Viewer...");

    let mut settings = ViewerSettings::load();
    if !ViewerSettings::file_exists() {
        if let Err(e) = settings.save() {
            warn!("Could not write default settings: {}", e);
        }
    }
    settings.apply_args(std::env::args().skip(1));
    info!("Model: {}", settings.model.path.display());

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = ViewerApp::new(settings);
    event_loop.run_app(&mut app).context("Event loop failed")?;

    app.into_result()
}
