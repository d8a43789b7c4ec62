//! Engine adapter port.
//!
//! The tracking/rendering engine (model decoding, plane detection, gestures,
//! shadows) lives outside this crate. [`Engine`] is the contract the staging
//! core drives it through. Entities are identified by opaque [`Handle`]s; the
//! engine owns the underlying resources and the core only keeps handles.
//!
//! # Threading
//!
//! Engines are driven from a single thread. Methods take `&self` so that entity
//! creation can run concurrently on one task; implementations use interior
//! mutability where they need it.

use std::path::Path;

use crate::data_structures::transform::Transform;

/// Opaque reference to an engine-owned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(pub u32);

/// Identifies one animation-ended listener registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A request to play a clip of a glTF model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationRequest {
    /// `None` plays the model's default clip.
    pub name: Option<String>,
    pub looping: bool,
}

impl AnimationRequest {
    pub fn default_loop() -> Self {
        Self {
            name: None,
            looping: true,
        }
    }

    pub fn looping(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            looping: true,
        }
    }

    pub fn once(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            looping: false,
        }
    }
}

/// Delivered by the host when a clip of a listened-to model has finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationEnded {
    pub listener: ListenerId,
    pub target: Handle,
    pub animation_name: String,
}

/// Callbacks invoked by the engine while a plane indicator is registered.
///
/// None of them is needed for correct placement; they exist so embedders can
/// animate the indicator or update their UI.
pub trait PlaneIndicatorHandler {
    /// The screen centre started mapping onto a plane (edge-triggered).
    fn on_plane_show(&mut self) {}

    /// The screen centre no longer maps onto a plane (edge-triggered).
    fn on_plane_hide(&mut self) {}

    /// Fired continuously while the screen centre maps onto a plane.
    fn on_plane_showing(&mut self) {}
}

/// Indicator handler that only traces the callbacks.
#[derive(Debug, Default)]
pub struct LoggingIndicator;

impl PlaneIndicatorHandler for LoggingIndicator {
    fn on_plane_show(&mut self) {
        log::debug!("plane indicator shown");
    }

    fn on_plane_hide(&mut self) {
        log::debug!("plane indicator hidden");
    }

    fn on_plane_showing(&mut self) {
        log::trace!("plane indicator tracking");
    }
}

/// Contract of the external tracking engine.
#[allow(async_fn_in_trait)]
pub trait Engine {
    async fn create_gltf_model(&self, buffer: &[u8]) -> anyhow::Result<Handle>;

    async fn create_env_map_by_hdr(&self, buffer: &[u8]) -> anyhow::Result<Handle>;

    /// Creates a plane backed by an alpha-channel video. The engine shows
    /// `fallback_thumbnail` instead if the video cannot be rendered.
    async fn create_alpha_video(
        &self,
        path: &Path,
        fallback_thumbnail: Option<&str>,
    ) -> anyhow::Result<Handle>;

    fn create_group(&self) -> anyhow::Result<Handle>;

    fn is_tracking_v2(&self) -> bool;

    /// Registers `entity` with the scene. A scale of `0.0` keeps the model's own size.
    fn add_to_scene(
        &self,
        entity: Handle,
        initial_scale: f32,
        initial_rotation: cgmath::Deg<f32>,
    ) -> anyhow::Result<()>;

    /// Tap to move, one finger rotate, two finger scale.
    fn enable_gesture(&self, entity: Handle) -> anyhow::Result<()>;

    fn enable_shadow(&self) -> anyhow::Result<()>;

    /// Starts plane tracking. Placement is only possible afterwards.
    async fn start(&self) -> anyhow::Result<()>;

    fn add_plane_indicator(
        &self,
        entity: Handle,
        handler: Box<dyn PlaneIndicatorHandler>,
    ) -> anyhow::Result<()>;

    fn remove_plane_indicator(&self);

    /// Anchors `entity` on the plane under the screen point `(x, y)`.
    /// Returns `false` if no plane could be resolved there.
    fn stand_on_plane(&self, entity: Handle, x: u32, y: u32, reset_plane: bool) -> bool;

    fn add_child(&self, group: Handle, child: Handle) -> anyhow::Result<()>;

    fn set_name(&self, entity: Handle, name: &str) -> anyhow::Result<()>;

    fn set_transform(&self, entity: Handle, transform: Transform) -> anyhow::Result<()>;

    fn set_visible(&self, entity: Handle, visible: bool) -> anyhow::Result<()>;

    fn use_env_map(&self, model: Handle, env_map: Handle) -> anyhow::Result<()>;

    fn set_cast_shadow(&self, model: Handle, cast: bool) -> anyhow::Result<()>;

    fn play_animation(&self, model: Handle, request: AnimationRequest) -> anyhow::Result<()>;

    fn stop_animation(&self, model: Handle, name: &str) -> anyhow::Result<()>;

    fn set_video_loop(&self, video: Handle, looping: bool) -> anyhow::Result<()>;

    fn play_video(&self, video: Handle) -> anyhow::Result<()>;

    /// Subscribes to animation-ended notifications of `model`. Notifications
    /// reach the core through [`crate::flow::ArSession::on_animation_ended`]
    /// tagged with the returned id.
    fn add_animation_listener(&self, model: Handle) -> anyhow::Result<ListenerId>;

    fn remove_animation_listener(&self, listener: ListenerId);
}
