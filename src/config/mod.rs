//! Application configuration and constants.
//!
//! This module provides:
//! - Probe timing constants (authoritative timeout values)
//! - Configuration types (library-only, no CLI dependencies)

mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
