//! Scene data: transforms and the composed scene entities.
//!
//! - `transform` holds position/rotation/scale applied to engine entities
//! - `scene` composes the asset bundle into configured engine entities

pub mod scene;
pub mod transform;
