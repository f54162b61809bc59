// src/config/mod.rs
pub mod settings;

pub use settings::{default_config_path, Settings};
