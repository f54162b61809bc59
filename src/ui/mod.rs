// src/ui/mod.rs
pub mod report;

pub use report::{render_ron, render_text};
