//! Error taxonomy of the staging core.
//!
//! Collaborators (engine adapter, downloader) report failures as
//! [`anyhow::Error`]; the core folds them into [`ArError`] with the full
//! message chain preserved.

use crate::placement::PlacementState;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ArError {
    /// One of the asset downloads failed. No part of the bundle is kept.
    #[error("asset download failed: {0}")]
    AssetFetch(String),

    /// An entity could not be created or configured by the engine.
    #[error("scene composition failed: {0}")]
    SceneComposition(String),

    /// The engine could not resolve a plane under the given screen point.
    /// Recoverable, the caller should ask the user to aim at a surface and retry.
    #[error("find plane failed at ({x}, {y})")]
    Placement { x: u32, y: u32 },

    /// An operation was invoked out of lifecycle order. This is a programming error.
    #[error("`{operation}` is not allowed while the session is {state:?}")]
    PreconditionViolation {
        operation: &'static str,
        state: PlacementState,
    },
}

impl ArError {
    pub(crate) fn fetch(err: anyhow::Error) -> Self {
        Self::AssetFetch(format!("{err:#}"))
    }

    pub(crate) fn composition(err: anyhow::Error) -> Self {
        Self::SceneComposition(format!("{err:#}"))
    }

    pub(crate) fn precondition(operation: &'static str, state: PlacementState) -> Self {
        Self::PreconditionViolation { operation, state }
    }

    /// `true` for failures the user can recover from by retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Placement { .. })
    }
}
