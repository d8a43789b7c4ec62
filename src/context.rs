use instant::Duration;

/// Locations of the four assets a session needs.
///
/// Paths are relative to `base_url`; [`AssetManifest::url`] performs the join.
#[derive(Clone, Debug)]
pub struct AssetManifest {
    pub base_url: String,
    pub model: String,
    pub env_map: String,
    pub plane_video: String,
    pub snow_video: String,
}

impl AssetManifest {
    pub fn url(&self, path: &str) -> String {
        if path.contains("://") || self.base_url.is_empty() {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: "model/rabbit_dancing.glb".to_string(),
            env_map: "media/default.hdr".to_string(),
            plane_video: "media/point.mp4".to_string(),
            snow_video: "media/snow-animate-compressed-2.mp4".to_string(),
        }
    }
}

/// Scales handed to the engine. Tracking v2 is calibrated closer to real
/// world size, so it gets smaller nominal values than legacy tracking.
#[derive(Clone, Debug)]
pub struct PlacementScales {
    pub composite_legacy: f32,
    pub composite_v2: f32,
    pub indicator_legacy: f32,
    pub indicator_v2: f32,
    pub model: f32,
    pub snow: f32,
    pub snow_offset: cgmath::Vector3<f32>,
}

impl PlacementScales {
    pub fn composite(&self, tracking_v2: bool) -> f32 {
        if tracking_v2 {
            self.composite_v2
        } else {
            self.composite_legacy
        }
    }

    pub fn indicator(&self, tracking_v2: bool) -> f32 {
        if tracking_v2 {
            self.indicator_v2
        } else {
            self.indicator_legacy
        }
    }
}

impl Default for PlacementScales {
    fn default() -> Self {
        Self {
            composite_legacy: 1.5,
            composite_v2: 0.5,
            indicator_legacy: 0.25,
            indicator_v2: 0.075,
            model: 100.0,
            snow: 20.0,
            snow_offset: cgmath::Vector3::new(0.0, 30.0, 0.0),
        }
    }
}

/// Upper bounds of the coarse telemetry buckets. Anything above `slow` is very slow.
#[derive(Clone, Debug)]
pub struct TimeThresholds {
    pub fast: Duration,
    pub medium: Duration,
    pub slow: Duration,
}

impl Default for TimeThresholds {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(1000),
            medium: Duration::from_millis(3000),
            slow: Duration::from_millis(8000),
        }
    }
}

/// Session configuration.
///
/// Owned by the [`crate::flow::ArSession`] and read by every stage. The
/// defaults are the production values; tests and embedders override fields
/// directly.
#[derive(Clone, Debug)]
pub struct Context {
    pub assets: AssetManifest,
    /// Shown by the engine when an alpha video cannot be rendered. `None` disables the fallback.
    pub fallback_thumbnail: Option<String>,
    pub scales: PlacementScales,
    /// Width and height of the tracking view in screen points.
    pub viewport: (u32, u32),
    /// Legacy tracking shows the plane indicator this long after the scene is ready.
    pub indicator_delay: Duration,
    /// Delay between a successful placement and the media step.
    pub reveal_delay: Duration,
    /// Whether retries after the first placement attempt re-select the plane.
    pub reset_plane_on_retry: bool,
    pub time_levels: TimeThresholds,
}

impl Context {
    /// Screen point at the centre of the viewport.
    pub fn viewport_center(&self) -> (u32, u32) {
        let (width, height) = self.viewport;
        (
            (width as f32 / 2.0).round() as u32,
            (height as f32 / 2.0).round() as u32,
        )
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            assets: AssetManifest::default(),
            fallback_thumbnail: Some("/static/images/video.png".to_string()),
            scales: PlacementScales::default(),
            viewport: (375, 667),
            indicator_delay: Duration::from_millis(3000),
            reveal_delay: Duration::from_millis(2000),
            reset_plane_on_retry: true,
            time_levels: TimeThresholds::default(),
        }
    }
}
