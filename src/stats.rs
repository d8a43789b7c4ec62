//! Timing instrumentation and telemetry.
//!
//! Durations are reported as coarse [`TimeLevel`] buckets so that the
//! telemetry backend only ever sees low-cardinality values.

use std::fmt;

use instant::{Duration, Instant};

use crate::context::TimeThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeLevel {
    Fast,
    Medium,
    Slow,
    VerySlow,
}

impl TimeLevel {
    pub fn classify(elapsed: Duration, thresholds: &TimeThresholds) -> Self {
        if elapsed < thresholds.fast {
            Self::Fast
        } else if elapsed < thresholds.medium {
            Self::Medium
        } else if elapsed < thresholds.slow {
            Self::Slow
        } else {
            Self::VerySlow
        }
    }

    /// Bucket for the time passed since `start`.
    pub fn since(start: Instant, thresholds: &TimeThresholds) -> Self {
        Self::classify(start.elapsed(), thresholds)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::VerySlow => "very_slow",
        }
    }
}

impl fmt::Display for TimeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw durations of one session. Every field is written at most once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingReport {
    asset_download: Option<Duration>,
    asset_load: Option<Duration>,
    placement_latency: Option<Duration>,
}

impl TimingReport {
    pub fn asset_download(&self) -> Option<Duration> {
        self.asset_download
    }

    pub fn asset_load(&self) -> Option<Duration> {
        self.asset_load
    }

    pub fn placement_latency(&self) -> Option<Duration> {
        self.placement_latency
    }

    pub(crate) fn record_asset_download(&mut self, elapsed: Duration) {
        write_once(&mut self.asset_download, elapsed, "asset download");
    }

    pub(crate) fn record_asset_load(&mut self, elapsed: Duration) {
        write_once(&mut self.asset_load, elapsed, "asset load");
    }

    pub(crate) fn record_placement_latency(&mut self, elapsed: Duration) {
        write_once(&mut self.placement_latency, elapsed, "placement latency");
    }
}

fn write_once(slot: &mut Option<Duration>, elapsed: Duration, what: &str) {
    match slot {
        Some(first) => log::warn!(
            "{} was already recorded as {:?}, ignoring {:?}",
            what,
            first,
            elapsed
        ),
        None => *slot = Some(elapsed),
    }
}

/// Bucketed durations handed back by scene initialisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTimings {
    pub asset_download: TimeLevel,
    pub asset_load: TimeLevel,
}

/// Sink for named telemetry events with a flat key/value payload.
pub trait Telemetry {
    fn emit(&self, event: &str, payload: &[(&str, TimeLevel)]);
}

/// Writes telemetry events to the log.
#[derive(Debug, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn emit(&self, event: &str, payload: &[(&str, TimeLevel)]) {
        let fields = payload
            .iter()
            .map(|(key, level)| format!("{key}={level}"))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!("[stats] {event} {fields}");
    }
}

impl<T: Telemetry + ?Sized> Telemetry for &T {
    fn emit(&self, event: &str, payload: &[(&str, TimeLevel)]) {
        (**self).emit(event, payload);
    }
}

impl<T: Telemetry + ?Sized> Telemetry for std::rc::Rc<T> {
    fn emit(&self, event: &str, payload: &[(&str, TimeLevel)]) {
        (**self).emit(event, payload);
    }
}
