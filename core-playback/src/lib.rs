//! # Playback Module
//!
//! Owns the single current-playback state machine and the orchestration
//! that keeps it fed with playable sources.
//!
//! ## Components
//!
//! - **Queue** (`queue`): ordered track sequence with lossless shuffle.
//! - **Session** (`session`): the one mutable playback aggregate plus the
//!   command sum type and the pure reducer that applies commands to it.
//! - **Orchestrator** (`orchestrator`): glues the session to candidate
//!   resolution, format selection, resilient fetching, and the backing
//!   media engine; sole writer of the session.

pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod session;

pub use error::{PlaybackError, Result};
pub use orchestrator::PlaybackOrchestrator;
pub use queue::{PlaybackQueue, Track};
pub use session::{
    Command, CommandOutcome, CrossfadeConfig, NetworkState, PlaybackSession, RepeatMode,
    SessionEvent,
};
