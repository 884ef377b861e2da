//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and ties the track catalog, the
//! playback engine and the view state together.

mod model;

pub use model::*;
