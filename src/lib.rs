//! slam-stage
//!
//! Stages downloadable assets, composes them into a scene on an external AR
//! tracking engine, and drives the lifecycle that anchors a model on a
//! detected plane and starts its animation sequence. The engine itself
//! (decoding, plane detection, gestures, shadows) stays behind the
//! [`engine::Engine`] port; this crate only orchestrates it.
//!
//! High-level modules
//! - `context`: session configuration (asset manifest, scales, delays)
//! - `engine`: the engine adapter contract and the handle types it hands out
//! - `resources`: single-flight asset download and glTF clip inspection
//! - `data_structures`: transforms and scene composition
//! - `placement`: plane indicator lifecycle and anchoring
//! - `sequencer`: intro to idle animation handoff
//! - `stats`: coarse timing buckets and the telemetry sink
//! - `flow`: the session lifecycle that ties the stages together
//! - `error`: error taxonomy
//!

pub mod context;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod flow;
pub mod placement;
pub mod resources;
pub mod sequencer;
pub mod stats;

// Re-exports commonly used types for convenience in downstream code.
pub use context::Context;
pub use engine::{AnimationEnded, AnimationRequest, Engine, Handle, ListenerId};
pub use error::ArError;
pub use flow::{ArSession, Followup, GuidanceStep, Out};
pub use placement::PlacementState;
pub use cgmath;
