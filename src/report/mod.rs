//! Report rendering.

pub mod generator;

pub use generator::{console_summary, save_report};
