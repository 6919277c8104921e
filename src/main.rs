mod app;
mod audio;
mod config;
mod error;
mod library;
mod mpris;
mod playback;
mod runtime;
mod ui;
mod visualizer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
