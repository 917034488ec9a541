//! Terminal dashboard

mod app;

pub use app::{App, KeyAction};
