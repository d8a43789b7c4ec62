#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    path::{Path, PathBuf},
    rc::Rc,
};

use futures::{
    FutureExt,
    channel::oneshot,
    future::{LocalBoxFuture, Shared},
};
use slam_stage::{
    AnimationRequest, ArSession, Context, Engine, Handle, ListenerId,
    data_structures::transform::Transform,
    engine::PlaneIndicatorHandler,
    resources::Downloader,
    stats::{Telemetry, TimeLevel},
};

/// Every call the staging core made on the [`MockEngine`], in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateGltfModel(Handle),
    CreateEnvMap(Handle),
    CreateAlphaVideo(Handle, PathBuf, Option<String>),
    CreateGroup(Handle),
    AddToScene(Handle, f32, f32),
    EnableGesture(Handle),
    EnableShadow,
    Start,
    AddPlaneIndicator(Handle),
    RemovePlaneIndicator,
    StandOnPlane(Handle, u32, u32, bool),
    AddChild(Handle, Handle),
    SetName(Handle, String),
    SetTransform(Handle, Transform),
    SetVisible(Handle, bool),
    UseEnvMap(Handle, Handle),
    SetCastShadow(Handle, bool),
    PlayAnimation(Handle, AnimationRequest),
    StopAnimation(Handle, String),
    SetVideoLoop(Handle, bool),
    PlayVideo(Handle),
    AddAnimationListener(Handle, ListenerId),
    RemoveAnimationListener(ListenerId),
}

struct EngineState {
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    next_listener: Cell<u64>,
    tracking_v2: bool,
    plane_results: RefCell<VecDeque<bool>>,
    fail_on: Option<&'static str>,
    indicator: RefCell<Option<Box<dyn PlaneIndicatorHandler>>>,
}

/// Recording engine. Clones share the same recording.
#[derive(Clone)]
pub struct MockEngine {
    state: Rc<EngineState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::build(false, None)
    }

    pub fn v2() -> Self {
        Self::build(true, None)
    }

    /// Rejects every call of the named operation, e.g. `"set_cast_shadow"`.
    pub fn failing(operation: &'static str) -> Self {
        Self::build(false, Some(operation))
    }

    fn build(tracking_v2: bool, fail_on: Option<&'static str>) -> Self {
        Self {
            state: Rc::new(EngineState {
                calls: RefCell::new(Vec::new()),
                next_handle: Cell::new(1),
                next_listener: Cell::new(1),
                tracking_v2,
                plane_results: RefCell::new(VecDeque::new()),
                fail_on,
                indicator: RefCell::new(None),
            }),
        }
    }

    /// Outcomes of the next `stand_on_plane` calls. Once used up, placement succeeds.
    pub fn with_plane_results(self, results: &[bool]) -> Self {
        self.state.plane_results.borrow_mut().extend(results);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.calls.borrow().iter().filter(|c| predicate(*c)).count()
    }

    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.state.calls.borrow().iter().position(|c| predicate(c))
    }

    pub fn last_transform(&self, entity: Handle) -> Option<Transform> {
        self.state.calls.borrow().iter().rev().find_map(|c| match c {
            Call::SetTransform(h, t) if *h == entity => Some(*t),
            _ => None,
        })
    }

    pub fn is_visible(&self, entity: Handle) -> Option<bool> {
        self.state.calls.borrow().iter().rev().find_map(|c| match c {
            Call::SetVisible(h, v) if *h == entity => Some(*v),
            _ => None,
        })
    }

    pub fn stand_on_plane_calls(&self) -> Vec<(u32, u32, bool)> {
        self.state
            .calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::StandOnPlane(_, x, y, reset) => Some((*x, *y, *reset)),
                _ => None,
            })
            .collect()
    }

    pub fn last_listener(&self) -> Option<ListenerId> {
        self.state.calls.borrow().iter().rev().find_map(|c| match c {
            Call::AddAnimationListener(_, id) => Some(*id),
            _ => None,
        })
    }

    pub fn has_indicator_handler(&self) -> bool {
        self.state.indicator.borrow().is_some()
    }

    pub fn fire_plane_show(&self) {
        if let Some(handler) = self.state.indicator.borrow_mut().as_mut() {
            handler.on_plane_show();
            handler.on_plane_showing();
        }
    }

    pub fn fire_plane_hide(&self) {
        if let Some(handler) = self.state.indicator.borrow_mut().as_mut() {
            handler.on_plane_hide();
        }
    }

    fn record(&self, call: Call) {
        self.state.calls.borrow_mut().push(call);
    }

    fn check(&self, operation: &str) -> anyhow::Result<()> {
        if self.state.fail_on == Some(operation) {
            anyhow::bail!("{operation} rejected by engine");
        }
        Ok(())
    }

    fn handle(&self) -> Handle {
        let id = self.state.next_handle.get();
        self.state.next_handle.set(id + 1);
        Handle(id)
    }
}

impl Engine for MockEngine {
    async fn create_gltf_model(&self, _buffer: &[u8]) -> anyhow::Result<Handle> {
        self.check("create_gltf_model")?;
        let handle = self.handle();
        self.record(Call::CreateGltfModel(handle));
        Ok(handle)
    }

    async fn create_env_map_by_hdr(&self, _buffer: &[u8]) -> anyhow::Result<Handle> {
        self.check("create_env_map_by_hdr")?;
        let handle = self.handle();
        self.record(Call::CreateEnvMap(handle));
        Ok(handle)
    }

    async fn create_alpha_video(
        &self,
        path: &Path,
        fallback_thumbnail: Option<&str>,
    ) -> anyhow::Result<Handle> {
        self.check("create_alpha_video")?;
        let handle = self.handle();
        self.record(Call::CreateAlphaVideo(
            handle,
            path.to_path_buf(),
            fallback_thumbnail.map(str::to_string),
        ));
        Ok(handle)
    }

    fn create_group(&self) -> anyhow::Result<Handle> {
        self.check("create_group")?;
        let handle = self.handle();
        self.record(Call::CreateGroup(handle));
        Ok(handle)
    }

    fn is_tracking_v2(&self) -> bool {
        self.state.tracking_v2
    }

    fn add_to_scene(
        &self,
        entity: Handle,
        initial_scale: f32,
        initial_rotation: cgmath::Deg<f32>,
    ) -> anyhow::Result<()> {
        self.check("add_to_scene")?;
        self.record(Call::AddToScene(entity, initial_scale, initial_rotation.0));
        Ok(())
    }

    fn enable_gesture(&self, entity: Handle) -> anyhow::Result<()> {
        self.check("enable_gesture")?;
        self.record(Call::EnableGesture(entity));
        Ok(())
    }

    fn enable_shadow(&self) -> anyhow::Result<()> {
        self.check("enable_shadow")?;
        self.record(Call::EnableShadow);
        Ok(())
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.check("start")?;
        self.record(Call::Start);
        Ok(())
    }

    fn add_plane_indicator(
        &self,
        entity: Handle,
        handler: Box<dyn PlaneIndicatorHandler>,
    ) -> anyhow::Result<()> {
        self.check("add_plane_indicator")?;
        self.record(Call::AddPlaneIndicator(entity));
        *self.state.indicator.borrow_mut() = Some(handler);
        Ok(())
    }

    fn remove_plane_indicator(&self) {
        self.record(Call::RemovePlaneIndicator);
        self.state.indicator.borrow_mut().take();
    }

    fn stand_on_plane(&self, entity: Handle, x: u32, y: u32, reset_plane: bool) -> bool {
        self.record(Call::StandOnPlane(entity, x, y, reset_plane));
        self.state.plane_results.borrow_mut().pop_front().unwrap_or(true)
    }

    fn add_child(&self, group: Handle, child: Handle) -> anyhow::Result<()> {
        self.check("add_child")?;
        self.record(Call::AddChild(group, child));
        Ok(())
    }

    fn set_name(&self, entity: Handle, name: &str) -> anyhow::Result<()> {
        self.check("set_name")?;
        self.record(Call::SetName(entity, name.to_string()));
        Ok(())
    }

    fn set_transform(&self, entity: Handle, transform: Transform) -> anyhow::Result<()> {
        self.check("set_transform")?;
        self.record(Call::SetTransform(entity, transform));
        Ok(())
    }

    fn set_visible(&self, entity: Handle, visible: bool) -> anyhow::Result<()> {
        self.check("set_visible")?;
        self.record(Call::SetVisible(entity, visible));
        Ok(())
    }

    fn use_env_map(&self, model: Handle, env_map: Handle) -> anyhow::Result<()> {
        self.check("use_env_map")?;
        self.record(Call::UseEnvMap(model, env_map));
        Ok(())
    }

    fn set_cast_shadow(&self, model: Handle, cast: bool) -> anyhow::Result<()> {
        self.check("set_cast_shadow")?;
        self.record(Call::SetCastShadow(model, cast));
        Ok(())
    }

    fn play_animation(&self, model: Handle, request: AnimationRequest) -> anyhow::Result<()> {
        self.check("play_animation")?;
        self.record(Call::PlayAnimation(model, request));
        Ok(())
    }

    fn stop_animation(&self, model: Handle, name: &str) -> anyhow::Result<()> {
        self.check("stop_animation")?;
        self.record(Call::StopAnimation(model, name.to_string()));
        Ok(())
    }

    fn set_video_loop(&self, video: Handle, looping: bool) -> anyhow::Result<()> {
        self.check("set_video_loop")?;
        self.record(Call::SetVideoLoop(video, looping));
        Ok(())
    }

    fn play_video(&self, video: Handle) -> anyhow::Result<()> {
        self.check("play_video")?;
        self.record(Call::PlayVideo(video));
        Ok(())
    }

    fn add_animation_listener(&self, model: Handle) -> anyhow::Result<ListenerId> {
        self.check("add_animation_listener")?;
        let id = ListenerId(self.state.next_listener.get());
        self.state.next_listener.set(id.0 + 1);
        self.record(Call::AddAnimationListener(model, id));
        Ok(id)
    }

    fn remove_animation_listener(&self, listener: ListenerId) {
        self.record(Call::RemoveAnimationListener(listener));
    }
}

struct DownloaderState {
    fetches: RefCell<Vec<String>>,
    failing: Option<String>,
    gate: Option<Shared<LocalBoxFuture<'static, ()>>>,
}

/// Serves every URL as its own bytes, or as a path named after it.
/// Clones share the fetch log.
#[derive(Clone)]
pub struct MockDownloader {
    state: Rc<DownloaderState>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Rejects every URL containing `fragment`.
    pub fn failing(fragment: &str) -> Self {
        Self::build(Some(fragment.to_string()), None)
    }

    /// Holds every fetch until the returned sender fires (or is dropped).
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let gate = rx.map(|_| ()).boxed_local().shared();
        (Self::build(None, Some(gate)), tx)
    }

    fn build(failing: Option<String>, gate: Option<Shared<LocalBoxFuture<'static, ()>>>) -> Self {
        Self {
            state: Rc::new(DownloaderState {
                fetches: RefCell::new(Vec::new()),
                failing,
                gate,
            }),
        }
    }

    pub fn fetches(&self) -> Vec<String> {
        self.state.fetches.borrow().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.fetches.borrow().len()
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<()> {
        self.state.fetches.borrow_mut().push(url.to_string());
        if let Some(gate) = self.state.gate.clone() {
            gate.await;
        }
        if let Some(fragment) = &self.state.failing {
            if url.contains(fragment.as_str()) {
                anyhow::bail!("404 for {url}");
            }
        }
        Ok(())
    }
}

impl Downloader for MockDownloader {
    async fn fetch_as_buffer(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.fetch(url).await?;
        Ok(url.as_bytes().to_vec())
    }

    async fn fetch_as_local_path(&self, url: &str) -> anyhow::Result<PathBuf> {
        self.fetch(url).await?;
        Ok(PathBuf::from("/tmp/downloads").join(url))
    }
}

/// Telemetry sink that keeps every event. Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingTelemetry {
    events: Rc<RefCell<Vec<(String, Vec<(String, TimeLevel)>)>>>,
}

impl RecordingTelemetry {
    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn payload(&self, event: &str) -> Option<Vec<(String, TimeLevel)>> {
        self.events
            .borrow()
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
    }
}

impl Telemetry for RecordingTelemetry {
    fn emit(&self, event: &str, payload: &[(&str, TimeLevel)]) {
        let payload = payload
            .iter()
            .map(|(key, level)| (key.to_string(), *level))
            .collect();
        self.events.borrow_mut().push((event.to_string(), payload));
    }
}

pub type TestSession = ArSession<MockEngine, MockDownloader, RecordingTelemetry>;

/// 320x568 viewport, so the centre tap lands on (160, 284).
pub fn test_context() -> Context {
    Context {
        viewport: (320, 568),
        ..Default::default()
    }
}

pub fn new_session(downloader: MockDownloader) -> (TestSession, RecordingTelemetry) {
    let _ = env_logger::builder().is_test(true).try_init();
    let telemetry = RecordingTelemetry::default();
    let session = ArSession::new(test_context(), downloader, telemetry.clone());
    (session, telemetry)
}

/// A session whose scene was initialised on `engine`.
pub fn ready_session(engine: &MockEngine) -> (TestSession, RecordingTelemetry) {
    let (mut session, telemetry) = new_session(MockDownloader::new());
    futures::executor::block_on(session.init_scene(engine.clone()))
        .expect("scene initialisation");
    (session, telemetry)
}
