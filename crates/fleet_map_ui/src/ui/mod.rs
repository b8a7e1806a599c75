//! UI modules for the fleet map viewer.

pub mod app_shell;
pub mod controls;
pub mod dashboard;
pub mod rendering;
pub mod utils;
