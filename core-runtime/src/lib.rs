//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Engine configuration and capability validation
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the engine crates depend on.
//! It establishes the logging conventions, the fail-fast configuration
//! surface, and the event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
