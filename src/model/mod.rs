pub mod catalog;
pub mod config;
pub mod instruments;
pub mod keyboard;
pub mod notes;
pub mod song;
