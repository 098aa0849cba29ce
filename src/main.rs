//! Vitrine: a glTF bottle configurator.
//!
//! Loads an equirectangular HDR environment and a product model, swaps in
//! glass, cap and label materials by node name, and exposes them in a small
//! egui control panel over an orbiting camera.

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

fn main() {
    if let Err(err) = app::run() {
        log::error!("{}", err);
        eprintln!("vitrine: {}", err);
        std::process::exit(1);
    }
}
