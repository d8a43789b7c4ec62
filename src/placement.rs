//! Plane indicator lifecycle and anchoring of the main composite.

use std::{cell::Cell, rc::Rc};

use crate::{
    data_structures::scene::SceneEntities,
    engine::{Engine, Handle, PlaneIndicatorHandler},
    error::ArError,
};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementState {
    Idle,
    AwaitingPlane,
    PlaneShown,
    Placed,
    Animating,
    Cleared,
}

/// Forwards indicator callbacks to the embedder's handler and remembers
/// whether the engine currently maps (or ever mapped) the screen centre onto a plane.
struct PlaneSignal {
    in_view: Rc<Cell<bool>>,
    seen: Rc<Cell<bool>>,
    inner: Box<dyn PlaneIndicatorHandler>,
}

impl PlaneIndicatorHandler for PlaneSignal {
    fn on_plane_show(&mut self) {
        self.in_view.set(true);
        self.seen.set(true);
        self.inner.on_plane_show();
    }

    fn on_plane_hide(&mut self) {
        self.in_view.set(false);
        self.inner.on_plane_hide();
    }

    fn on_plane_showing(&mut self) {
        self.inner.on_plane_showing();
    }
}

pub struct PlacementController {
    indicator: Handle,
    composite: Handle,
    tracking_started: bool,
    indicator_active: bool,
    plane_in_view: Rc<Cell<bool>>,
    plane_seen: Rc<Cell<bool>>,
    attempts: u32,
}

impl PlacementController {
    pub fn new(entities: &SceneEntities) -> Self {
        Self {
            indicator: entities.indicator_group,
            composite: entities.main_group,
            tracking_started: false,
            indicator_active: false,
            plane_in_view: Rc::new(Cell::new(false)),
            plane_seen: Rc::new(Cell::new(false)),
            attempts: 0,
        }
    }

    /// Must be called once the engine's `start()` has completed.
    pub fn tracking_started(&mut self) {
        self.tracking_started = true;
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking_started
    }

    pub fn indicator_active(&self) -> bool {
        self.indicator_active
    }

    /// `true` between the engine's plane-found and plane-lost callbacks.
    pub fn plane_in_view(&self) -> bool {
        self.indicator_active && self.plane_in_view.get()
    }

    /// Number of `place` calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Registers the indicator with the plane-detection feed and shows it.
    /// Showing an already active indicator is a no-op.
    pub fn show_indicator<E: Engine>(
        &mut self,
        engine: &E,
        handler: Box<dyn PlaneIndicatorHandler>,
    ) -> anyhow::Result<()> {
        if self.indicator_active {
            log::debug!("plane indicator is already active");
            return Ok(());
        }
        self.plane_in_view.set(false);
        let signal = PlaneSignal {
            in_view: Rc::clone(&self.plane_in_view),
            seen: Rc::clone(&self.plane_seen),
            inner: handler,
        };
        engine.add_plane_indicator(self.indicator, Box::new(signal))?;
        engine.set_visible(self.indicator, true)?;
        self.indicator_active = true;
        Ok(())
    }

    /// Anchors the composite on the plane under `(x, y)`.
    ///
    /// `reset_plane = false` reuses the plane the engine already reported; if it
    /// has not reported one yet a new plane is selected anyway.
    ///
    /// Returns `Ok(false)` if the engine could not resolve a plane there; the
    /// caller may retry. On success the indicator is removed and the composite
    /// becomes visible. Calling this before tracking started is an error.
    pub fn place<E: Engine>(
        &mut self,
        engine: &E,
        x: u32,
        y: u32,
        reset_plane: bool,
    ) -> Result<bool, ArError> {
        if !self.tracking_started {
            return Err(ArError::precondition("place", PlacementState::Idle));
        }
        let reset_plane = if !reset_plane && !self.plane_seen.get() {
            log::warn!("no plane reported yet, selecting a new one");
            true
        } else {
            reset_plane
        };
        self.attempts += 1;

        if !engine.stand_on_plane(self.composite, x, y, reset_plane) {
            log::warn!(
                "no plane at ({x}, {y}) on attempt {} (reset_plane: {reset_plane})",
                self.attempts
            );
            return Ok(false);
        }
        self.plane_seen.set(true);

        self.clear_indicator(engine);
        engine
            .set_visible(self.composite, true)
            .map_err(ArError::composition)?;
        Ok(true)
    }

    /// Deregisters the indicator from the plane-detection feed if it is active.
    pub fn clear_indicator<E: Engine>(&mut self, engine: &E) {
        if self.indicator_active {
            engine.remove_plane_indicator();
            self.indicator_active = false;
            self.plane_in_view.set(false);
        }
    }
}
