#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod assets;
mod detector;
mod fps;
mod grid;
mod options;
mod orchestrator;
mod overlay;
mod source;
mod topology;
mod types;
mod ui;

use anyhow::Result;
use crossbeam_channel::bounded;
use gpui::Application;
use gpui_component;

use detector::DetectorBackend;
use options::PoseOptions;

fn main() -> Result<()> {
    env_logger::init();

    let (frame_tx, frame_rx) = bounded(1);

    let backend = DetectorBackend::default();
    let options = PoseOptions::default();

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, frame_rx, frame_tx, backend, options) {
                eprintln!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
