//! Scene composition.
//!
//! Turns the raw [`AssetBundle`] into configured engine entities: the main
//! composite (model plus snow overlay) and the plane indicator. Nothing here
//! owns rendering resources; the engine does, and the composer hands back
//! [`Handle`]s only.

use anyhow::Context as _;
use instant::{Duration, Instant};

use crate::{
    context::Context,
    data_structures::transform::Transform,
    engine::{AnimationRequest, Engine, Handle},
    error::ArError,
    resources::{AssetBundle, animation},
    sequencer,
};

pub const INDICATOR_NAME: &str = "indicatorModel";

/// Handles of the composed scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneEntities {
    /// Composite of main model and snow overlay. Anchored on placement.
    pub main_group: Handle,
    /// Parent of the indicator video; absorbs the rotation the engine
    /// applies while anchoring so the indicator's own correction survives.
    pub indicator_group: Handle,
    pub main_model: Handle,
    pub snow_model: Handle,
    pub indicator_model: Handle,
}

#[derive(Debug)]
pub struct ComposedScene {
    pub entities: SceneEntities,
    /// Time spent creating and configuring the entities, download excluded.
    pub load_duration: Duration,
}

/// Builds and configures all scene entities from `bundle`.
///
/// Entity creation runs concurrently; configuration of an entity only starts
/// after it exists. Any failing engine call aborts the whole composition.
pub async fn compose_scene<E: Engine>(
    bundle: &AssetBundle,
    engine: &E,
    ctx: &Context,
) -> Result<ComposedScene, ArError> {
    inspect_clips(bundle);
    let started = Instant::now();
    let thumbnail = ctx.fallback_thumbnail.as_deref();

    let (main_model, env_map, indicator_model, snow_model) = futures::try_join!(
        async {
            engine
                .create_gltf_model(&bundle.model)
                .await
                .context("create glTF model")
        },
        async {
            engine
                .create_env_map_by_hdr(&bundle.env_map)
                .await
                .context("create environment map")
        },
        async {
            engine
                .create_alpha_video(&bundle.plane_video, thumbnail)
                .await
                .context("create plane indicator video")
        },
        async {
            engine
                .create_alpha_video(&bundle.snow_video, thumbnail)
                .await
                .context("create snow video")
        },
    )
    .map_err(ArError::composition)?;

    let tracking_v2 = engine.is_tracking_v2();
    let main_group = configure_main(engine, ctx, tracking_v2, main_model, env_map, snow_model)
        .map_err(ArError::composition)?;
    let indicator_group = configure_indicator(engine, ctx, tracking_v2, indicator_model)
        .map_err(ArError::composition)?;

    let load_duration = started.elapsed();
    log::debug!(
        "scene composed in {load_duration:?} (tracking {})",
        if tracking_v2 { "v2" } else { "v1" }
    );

    Ok(ComposedScene {
        entities: SceneEntities {
            main_group,
            indicator_group,
            main_model,
            snow_model,
            indicator_model,
        },
        load_duration,
    })
}

fn configure_main<E: Engine>(
    engine: &E,
    ctx: &Context,
    tracking_v2: bool,
    model: Handle,
    env_map: Handle,
    snow: Handle,
) -> anyhow::Result<Handle> {
    let scales = &ctx.scales;

    engine
        .use_env_map(model, env_map)
        .context("attach environment map")?;
    engine
        .set_cast_shadow(model, true)
        .context("enable shadow casting")?;
    engine
        .set_transform(model, Transform::uniform(scales.model))
        .context("scale model")?;
    engine
        .play_animation(model, AnimationRequest::default_loop())
        .context("start idle animation")?;

    engine.set_video_loop(snow, true).context("loop snow video")?;
    engine
        .set_transform(snow, Transform::uniform(scales.snow).at(scales.snow_offset))
        .context("position snow video")?;

    let group = engine.create_group().context("create model group")?;
    engine.add_child(group, model)?;
    engine.add_child(group, snow)?;

    // hidden until anchored on a plane
    engine
        .set_visible(group, false)
        .context("hide model group")?;
    engine
        .add_to_scene(group, scales.composite(tracking_v2), cgmath::Deg(0.0))
        .context("add model group to scene")?;
    engine
        .enable_gesture(group)
        .context("enable gestures on model group")?;

    Ok(group)
}

fn configure_indicator<E: Engine>(
    engine: &E,
    ctx: &Context,
    tracking_v2: bool,
    indicator: Handle,
) -> anyhow::Result<Handle> {
    engine
        .set_name(indicator, INDICATOR_NAME)
        .context("name indicator")?;
    engine
        .set_video_loop(indicator, true)
        .context("loop indicator video")?;
    // Alpha videos stand upright; lay the indicator flat onto the plane.
    let transform = Transform::uniform(ctx.scales.indicator(tracking_v2))
        .rotated_x(cgmath::Rad(std::f32::consts::FRAC_PI_2));
    engine
        .set_transform(indicator, transform)
        .context("orient indicator")?;

    let group = engine.create_group().context("create indicator group")?;
    engine.add_child(group, indicator)?;
    Ok(group)
}

fn inspect_clips(bundle: &AssetBundle) {
    match animation::missing_clips(&bundle.model, &sequencer::REQUIRED_CLIPS) {
        Ok(missing) if !missing.is_empty() => {
            log::warn!("model is missing animation clips {:?}", missing)
        }
        Ok(_) => (),
        Err(e) => log::debug!("model clips could not be inspected: {}", e),
    }
}
