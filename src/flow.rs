//! Session lifecycle.
//!
//! [`ArSession`] is the page-level driver. It sequences the staging stages
//! against host events and owns every reference the core holds:
//!
//! 1. `new` records the session start and emits `loading_start`
//! 2. `load_assets` warms the single-flight asset download (optional)
//! 3. `on_engine_ready` (or the lower level `init_scene`) composes the scene and starts tracking
//! 4. `find_plane` / `follow_up` / `on_anchors_added` bring up the plane indicator
//! 5. `start_scene` (or `start_placement` + `start_animation`) anchors and animates the model
//! 6. `on_animation_ended` forwards engine notifications to the sequencer
//! 7. `clear` tears everything down
//!
//! Timers are the host's concern. Operations that want something to happen
//! later return an [`Out`] describing the delayed [`Followup`]; the host feeds
//! it back through [`ArSession::follow_up`] when the delay has passed.

use anyhow::Context as _;
use instant::{Duration, Instant};

use crate::{
    context::Context,
    data_structures::scene::{SceneEntities, compose_scene},
    engine::{AnimationEnded, Engine, LoggingIndicator, PlaneIndicatorHandler},
    error::ArError,
    placement::{PlacementController, PlacementState},
    resources::{AssetLoader, Downloader, SharedLoad},
    sequencer::AnimationSequencer,
    stats::{LoadTimings, Telemetry, TimeLevel, TimingReport},
};

/// Work the host should schedule on behalf of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Followup {
    /// Show the plane indicator (legacy tracking has no anchor event).
    ShowIndicator,
    /// Placement finished; start the host's media step.
    RevealMedia,
}

/// Output of lifecycle operations.
///
/// `Out::After` asks the host to call [`ArSession::follow_up`] with the given
/// followup once the delay has elapsed. `Empty` means nothing to schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Out {
    After(Duration, Followup),
    #[default]
    Empty,
}

/// Guidance shown to the user by the host UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GuidanceStep {
    #[default]
    Hidden,
    /// Ask the user to move the device until a surface is found.
    FindPlane,
    /// The indicator is up; a tap places the model.
    ShowPoint,
    /// The model is placed and the media step is running.
    StartScene,
}

pub struct ArSession<E, D, T> {
    ctx: Context,
    loader: AssetLoader<D>,
    telemetry: T,
    engine: Option<E>,
    entities: Option<SceneEntities>,
    placement: Option<PlacementController>,
    sequencer: AnimationSequencer,
    state: PlacementState,
    step: GuidanceStep,
    timings: TimingReport,
    started_at: Instant,
    ready_at: Option<Instant>,
}

impl<E, D, T> ArSession<E, D, T>
where
    E: Engine,
    D: Downloader + 'static,
    T: Telemetry,
{
    pub fn new(ctx: Context, downloader: D, telemetry: T) -> Self {
        let loader = AssetLoader::new(downloader, ctx.assets.clone());
        telemetry.emit("loading_start", &[]);
        Self {
            ctx,
            loader,
            telemetry,
            engine: None,
            entities: None,
            placement: None,
            sequencer: AnimationSequencer::new(),
            state: PlacementState::Idle,
            step: GuidanceStep::Hidden,
            timings: TimingReport::default(),
            started_at: Instant::now(),
            ready_at: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Current lifecycle state. While waiting for a plane, `PlaneShown` is
    /// reported as long as the engine maps the screen centre onto a plane.
    pub fn state(&self) -> PlacementState {
        match (&self.placement, self.state) {
            (Some(placement), PlacementState::AwaitingPlane) if placement.plane_in_view() => {
                PlacementState::PlaneShown
            }
            (_, state) => state,
        }
    }

    pub fn step(&self) -> GuidanceStep {
        self.step
    }

    pub fn timings(&self) -> &TimingReport {
        &self.timings
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn entities(&self) -> Option<&SceneEntities> {
        self.entities.as_ref()
    }

    pub fn sequencer(&self) -> &AnimationSequencer {
        &self.sequencer
    }

    pub fn loader(&self) -> &AssetLoader<D> {
        &self.loader
    }

    /// Starts (or joins) the asset download. See [`AssetLoader::load_assets`].
    pub fn load_assets(&self) -> SharedLoad {
        self.loader.load_assets()
    }

    /// Waits for the assets, composes the scene on `engine` and starts tracking.
    ///
    /// No engine call is made before the assets are available. On failure the
    /// session stays `Idle`, keeps no entity and drops `engine`.
    pub async fn init_scene(&mut self, engine: E) -> Result<LoadTimings, ArError> {
        self.expect("init_scene", &[PlacementState::Idle])?;

        let downloaded = self.loader.load().await?;
        let composed = compose_scene(&downloaded.bundle, &engine, &self.ctx).await?;
        engine
            .enable_shadow()
            .context("enable shadows")
            .map_err(ArError::composition)?;
        engine
            .start()
            .await
            .context("start tracking")
            .map_err(ArError::composition)?;

        let mut placement = PlacementController::new(&composed.entities);
        placement.tracking_started();

        self.timings.record_asset_download(downloaded.elapsed);
        self.timings.record_asset_load(composed.load_duration);
        self.engine = Some(engine);
        self.entities = Some(composed.entities);
        self.placement = Some(placement);
        self.ready_at = Some(Instant::now());
        self.transition(PlacementState::AwaitingPlane);

        let levels = &self.ctx.time_levels;
        Ok(LoadTimings {
            asset_download: TimeLevel::classify(downloaded.elapsed, levels),
            asset_load: TimeLevel::classify(composed.load_duration, levels),
        })
    }

    /// Host event: the engine component is ready. Initialises the scene,
    /// reports `ar_start` and begins the search for a plane.
    pub async fn on_engine_ready(&mut self, engine: E) -> Result<Out, ArError> {
        let timings = match self.init_scene(engine).await {
            Ok(timings) => timings,
            Err(e) => {
                log::error!("scene initialisation failed: {}", e);
                return Err(e);
            }
        };
        let out = self.find_plane()?;
        let loading = TimeLevel::since(self.started_at, &self.ctx.time_levels);
        self.telemetry.emit(
            "ar_start",
            &[
                ("assetDownloadDuration", timings.asset_download),
                ("assetLoadDuration", timings.asset_load),
                ("loadingDuration", loading),
            ],
        );
        Ok(out)
    }

    /// Enters the `FindPlane` guidance step. Legacy tracking shows the
    /// indicator after a fixed delay; v2 tracking waits for
    /// [`ArSession::on_anchors_added`].
    pub fn find_plane(&mut self) -> Result<Out, ArError> {
        self.expect("find_plane", &[PlacementState::AwaitingPlane])?;
        self.step = GuidanceStep::FindPlane;
        let tracking_v2 = self.engine.as_ref().is_some_and(|e| e.is_tracking_v2());
        if tracking_v2 {
            Ok(Out::Empty)
        } else {
            Ok(Out::After(self.ctx.indicator_delay, Followup::ShowIndicator))
        }
    }

    /// Host event (v2 tracking): the engine added plane anchors.
    pub fn on_anchors_added(&mut self) -> Result<(), ArError> {
        self.show_indicator()
    }

    /// Runs a followup previously returned in an [`Out`]. Followups that
    /// arrive after the session moved on are dropped.
    pub fn follow_up(&mut self, followup: Followup) -> Result<(), ArError> {
        match (followup, self.state) {
            (Followup::ShowIndicator, PlacementState::AwaitingPlane) => self.show_indicator(),
            (Followup::RevealMedia, PlacementState::Placed | PlacementState::Animating) => {
                self.step = GuidanceStep::StartScene;
                Ok(())
            }
            (followup, state) => {
                log::debug!("dropping {:?} in state {:?}", followup, state);
                Ok(())
            }
        }
    }

    pub fn show_indicator(&mut self) -> Result<(), ArError> {
        self.show_indicator_with(Box::new(LoggingIndicator))
    }

    /// Shows the plane indicator, routing the engine's plane callbacks to `handler`.
    pub fn show_indicator_with(
        &mut self,
        handler: Box<dyn PlaneIndicatorHandler>,
    ) -> Result<(), ArError> {
        self.expect("show_indicator", &[PlacementState::AwaitingPlane])?;
        let (Some(engine), Some(placement)) = (self.engine.as_ref(), self.placement.as_mut())
        else {
            return Err(ArError::precondition("show_indicator", self.state));
        };
        placement
            .show_indicator(engine, handler)
            .context("show plane indicator")
            .map_err(ArError::composition)?;
        self.step = GuidanceStep::ShowPoint;
        Ok(())
    }

    /// Anchors the model on the plane under `(x, y)`.
    ///
    /// A plane that cannot be resolved yields [`ArError::Placement`] and leaves
    /// the session waiting for a plane, so the call may be retried.
    pub fn start_placement(&mut self, x: u32, y: u32) -> Result<(), ArError> {
        self.expect("start_placement", &[PlacementState::AwaitingPlane])?;
        let (Some(engine), Some(placement)) = (self.engine.as_ref(), self.placement.as_mut())
        else {
            return Err(ArError::precondition("start_placement", self.state));
        };

        // the first attempt always selects a plane
        let reset_plane = placement.attempts() == 0 || self.ctx.reset_plane_on_retry;
        if !placement.place(engine, x, y, reset_plane)? {
            return Err(ArError::Placement { x, y });
        }

        if let Some(ready_at) = self.ready_at {
            self.timings.record_placement_latency(ready_at.elapsed());
        }
        self.transition(PlacementState::Placed);
        Ok(())
    }

    /// Starts the intro/idle animation sequence and the snow overlay.
    pub fn start_animation(&mut self) -> Result<(), ArError> {
        self.expect("start_animation", &[PlacementState::Placed])?;
        let (Some(engine), Some(entities)) = (self.engine.as_ref(), self.entities.as_ref()) else {
            return Err(ArError::precondition("start_animation", self.state));
        };
        self.sequencer
            .play_intro_then_loop(engine, entities.main_model)
            .context("start animation sequence")
            .map_err(ArError::composition)?;
        engine
            .play_video(entities.snow_model)
            .context("play snow video")
            .map_err(ArError::composition)?;
        self.transition(PlacementState::Animating);
        Ok(())
    }

    /// Host event: the user tapped the screen.
    ///
    /// Only acts while the indicator is shown. Places the model at the centre
    /// of the viewport, starts the animation and reports `ar_show_arScene`.
    pub fn start_scene(&mut self) -> Result<Out, ArError> {
        if self.step != GuidanceStep::ShowPoint {
            log::debug!("ignoring tap during {:?}", self.step);
            return Ok(Out::Empty);
        }
        let (x, y) = self.ctx.viewport_center();
        self.start_placement(x, y)?;
        self.start_animation()?;
        self.step = GuidanceStep::Hidden;

        if let Some(latency) = self.timings.placement_latency() {
            let level = TimeLevel::classify(latency, &self.ctx.time_levels);
            self.telemetry
                .emit("ar_show_arScene", &[("arAnchorDuration", level)]);
        }
        Ok(Out::After(self.ctx.reveal_delay, Followup::RevealMedia))
    }

    /// Host event: the engine reported the end of an animation clip.
    /// Returns whether the notification changed the animation.
    pub fn on_animation_ended(&mut self, event: &AnimationEnded) -> anyhow::Result<bool> {
        let Some(engine) = self.engine.as_ref() else {
            log::debug!("ignoring {:?}, session has no engine", event);
            return Ok(false);
        };
        self.sequencer.on_animation_ended(engine, event)
    }

    /// Tears the session down: unsubscribes the animation listener, removes
    /// the indicator and drops the engine, the entity handles and the
    /// memoized assets. The session cannot be used afterwards.
    pub fn clear(&mut self) {
        if self.state == PlacementState::Cleared {
            return;
        }
        if let Some(engine) = self.engine.take() {
            self.sequencer.unsubscribe(&engine);
            if let Some(placement) = self.placement.as_mut() {
                placement.clear_indicator(&engine);
            }
        }
        self.placement = None;
        self.entities = None;
        self.loader.clear();
        self.step = GuidanceStep::Hidden;
        self.transition(PlacementState::Cleared);
    }

    fn expect(&self, operation: &'static str, allowed: &[PlacementState]) -> Result<(), ArError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ArError::precondition(operation, self.state))
        }
    }

    fn transition(&mut self, next: PlacementState) {
        log::debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Installs the platform logger. Safe to call more than once.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::warn!("Could not initialize logger: {}", e);
        }
    }
}
