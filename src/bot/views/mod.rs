//! Texts, keyboards and formatters shown to users

/// Main menu, FAQ, events and assistant screens
pub mod menu;

pub use menu::{MenuAction, Reply};
