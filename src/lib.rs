//! Interactive dashboard over a CSV table of GitHub repositories.
//!
//! The [`data`] module holds the load → filter → aggregate pipeline and has
//! no UI dependencies; [`export`] turns its output into CSV files; [`app`]
//! and [`ui`] render it with egui.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod export;
pub mod state;
pub mod ui;
