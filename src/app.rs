//! Application module: view state for the TUI.
//!
//! The playback controller owns the queue and transport; `App` only tracks
//! what the terminal shows on top of it (cursor, popups, panels).

mod model;

pub use model::*;
