//! Drives a full session against a logging engine and assets served from a
//! temporary directory. Run with `RUST_LOG=debug` to see every engine call.

use std::{
    cell::{Cell, RefCell},
    path::Path,
};

use slam_stage::{
    AnimationEnded, AnimationRequest, ArSession, Context, Engine, Handle, ListenerId, Out,
    data_structures::transform::Transform,
    engine::PlaneIndicatorHandler,
    flow::init_logging,
    resources::download::LocalAssets,
    stats::LogTelemetry,
};

#[derive(Default)]
struct ConsoleEngine {
    next_handle: Cell<u32>,
    listener: Cell<Option<(Handle, ListenerId)>>,
    indicator: RefCell<Option<Box<dyn PlaneIndicatorHandler>>>,
}

impl ConsoleEngine {
    fn handle(&self, what: &str) -> Handle {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        log::debug!("created {} #{}", what, id);
        Handle(id)
    }

    /// What a real engine would deliver once the intro clip finished.
    fn intro_ended(&self) -> Option<AnimationEnded> {
        self.listener.get().map(|(target, listener)| AnimationEnded {
            listener,
            target,
            animation_name: "start".to_string(),
        })
    }
}

impl Engine for ConsoleEngine {
    async fn create_gltf_model(&self, buffer: &[u8]) -> anyhow::Result<Handle> {
        log::debug!("decoding {} bytes of glTF", buffer.len());
        Ok(self.handle("model"))
    }

    async fn create_env_map_by_hdr(&self, _buffer: &[u8]) -> anyhow::Result<Handle> {
        Ok(self.handle("env map"))
    }

    async fn create_alpha_video(
        &self,
        path: &Path,
        _fallback_thumbnail: Option<&str>,
    ) -> anyhow::Result<Handle> {
        Ok(self.handle(&format!("video {}", path.display())))
    }

    fn create_group(&self) -> anyhow::Result<Handle> {
        Ok(self.handle("group"))
    }

    fn is_tracking_v2(&self) -> bool {
        false
    }

    fn add_to_scene(
        &self,
        entity: Handle,
        initial_scale: f32,
        _initial_rotation: cgmath::Deg<f32>,
    ) -> anyhow::Result<()> {
        log::debug!("{:?} added at scale {}", entity, initial_scale);
        Ok(())
    }

    fn enable_gesture(&self, _entity: Handle) -> anyhow::Result<()> {
        Ok(())
    }

    fn enable_shadow(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn start(&self) -> anyhow::Result<()> {
        log::info!("tracking started");
        Ok(())
    }

    fn add_plane_indicator(
        &self,
        entity: Handle,
        mut handler: Box<dyn PlaneIndicatorHandler>,
    ) -> anyhow::Result<()> {
        log::debug!("indicator {:?} follows the screen centre", entity);
        handler.on_plane_show();
        *self.indicator.borrow_mut() = Some(handler);
        Ok(())
    }

    fn remove_plane_indicator(&self) {
        self.indicator.borrow_mut().take();
    }

    fn stand_on_plane(&self, entity: Handle, x: u32, y: u32, reset_plane: bool) -> bool {
        log::info!("{:?} anchored at ({}, {}), reset {}", entity, x, y, reset_plane);
        true
    }

    fn add_child(&self, _group: Handle, _child: Handle) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_name(&self, _entity: Handle, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_transform(&self, entity: Handle, transform: Transform) -> anyhow::Result<()> {
        log::debug!("{:?} transform {:?}", entity, transform);
        Ok(())
    }

    fn set_visible(&self, entity: Handle, visible: bool) -> anyhow::Result<()> {
        log::debug!("{:?} visible {}", entity, visible);
        Ok(())
    }

    fn use_env_map(&self, _model: Handle, _env_map: Handle) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_cast_shadow(&self, _model: Handle, _cast: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn play_animation(&self, model: Handle, request: AnimationRequest) -> anyhow::Result<()> {
        log::info!("{:?} plays {:?}", model, request);
        Ok(())
    }

    fn stop_animation(&self, model: Handle, name: &str) -> anyhow::Result<()> {
        log::info!("{:?} stops {}", model, name);
        Ok(())
    }

    fn set_video_loop(&self, _video: Handle, _looping: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn play_video(&self, video: Handle) -> anyhow::Result<()> {
        log::info!("{:?} video playing", video);
        Ok(())
    }

    fn add_animation_listener(&self, model: Handle) -> anyhow::Result<ListenerId> {
        let listener = ListenerId(1);
        self.listener.set(Some((model, listener)));
        Ok(listener)
    }

    fn remove_animation_listener(&self, _listener: ListenerId) {
        self.listener.set(None);
    }
}

fn stage_assets(ctx: &Context) -> anyhow::Result<std::path::PathBuf> {
    let root = std::env::temp_dir().join("slam-stage-demo");
    let model = r#"{"asset":{"version":"2.0"},"animations":[{"name":"start","channels":[],"samplers":[]}]}"#;
    let files: [(&str, &[u8]); 4] = [
        (ctx.assets.model.as_str(), model.as_bytes()),
        (ctx.assets.env_map.as_str(), b"#?RADIANCE".as_slice()),
        (ctx.assets.plane_video.as_str(), b"webm".as_slice()),
        (ctx.assets.snow_video.as_str(), b"webm".as_slice()),
    ];
    for (path, content) in files {
        let path = root.join(ctx.assets.url(path).trim_start_matches('/'));
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, content)?;
    }
    Ok(root)
}

async fn after(out: Out) -> Option<slam_stage::Followup> {
    match out {
        Out::After(delay, followup) => {
            tokio::time::sleep(delay).await;
            Some(followup)
        }
        Out::Empty => None,
    }
}

async fn run() -> anyhow::Result<()> {
    let ctx = Context {
        indicator_delay: instant::Duration::from_millis(300),
        reveal_delay: instant::Duration::from_millis(200),
        ..Default::default()
    };
    let root = stage_assets(&ctx)?;
    let mut session = ArSession::new(ctx, LocalAssets::new(root), LogTelemetry);

    // warm the download while the engine boots
    let warm_up = tokio::task::spawn_local(session.load_assets());

    let out = session.on_engine_ready(ConsoleEngine::default()).await?;
    warm_up.await??;
    if let Some(followup) = after(out).await {
        session.follow_up(followup)?;
    }

    log::info!("state {:?}, guidance {:?}", session.state(), session.step());
    let out = session.start_scene()?;
    if let Some(followup) = after(out).await {
        session.follow_up(followup)?;
    }

    let ended = session.engine().and_then(ConsoleEngine::intro_ended);
    if let Some(event) = ended {
        session.on_animation_ended(&event)?;
    }

    log::info!("timings {:?}", session.timings());
    session.clear();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();
    tokio::task::LocalSet::new().run_until(run()).await
}
