//! Granulor Engine: feedback granular synthesis with realtime glue.
//!
//! Crate layout:
//! - [`ring`]      : `FeedbackRingBuffer`, the engine's two-second memory
//! - [`pool`]      : `Grain` and the fixed `GrainPool`
//! - [`scheduler`] : fractional-accumulator spawn scheduler
//! - [`params`]    : `EngineParameters`, `ParameterUpdate`, lock-free delivery
//! - [`granular`]  : `GranularEngine`, the per-block orchestrator
//! - [`graph`]     : `Generator` / `Processor` traits and the `BlockRunner`
//! - [`nodes`]     : oscillators and modulators for seed voices
//! - [`scenes`]    : presets (seed voice + parameters + cues) and the cue `Timeline`
//!
//! The block path never allocates, locks or logs. Everything that can fail
//! does so on the control side.

pub mod error;
pub mod granular;
pub mod graph;
pub mod nodes;
pub mod params;
pub mod pool;
pub mod ring;
pub mod scenes;
pub mod scheduler;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use error::ParamError;
pub use granular::{EngineStats, GranularEngine};
pub use graph::{BlockRunner, Generator, Processor, RENDER_QUANTUM};
pub use params::{EngineParameters, ParameterSender, ParameterUpdate};
pub use pool::{Grain, GrainPool, MAX_GRAINS};
pub use ring::FeedbackRingBuffer;
pub use scenes::{Cue, Scene, SceneKind, Timeline, UnknownScene};
pub use scheduler::GrainScheduler;
