//! Scripted animation after placement.
//!
//! A one-shot `start` clip hands off to the looping `loop2` clip once the
//! engine reports it finished. The ambient `loop` clip runs alongside,
//! independent of that handoff.

use crate::engine::{AnimationEnded, AnimationRequest, Engine, Handle, ListenerId};

pub const INTRO_CLIP: &str = "start";
pub const AMBIENT_CLIP: &str = "loop";
pub const IDLE_CLIP: &str = "loop2";

pub const REQUIRED_CLIPS: [&str; 3] = [INTRO_CLIP, AMBIENT_CLIP, IDLE_CLIP];

#[derive(Debug)]
struct Subscription {
    model: Handle,
    listener: ListenerId,
    handed_off: bool,
}

#[derive(Debug, Default)]
pub struct AnimationSequencer {
    subscription: Option<Subscription>,
}

impl AnimationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// `true` once the intro has handed off to the idle loop.
    pub fn handed_off(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.handed_off)
    }

    /// Starts the intro and ambient clips on `model` and listens for the end
    /// of the intro. Any listener of a previous attempt is dropped first.
    pub fn play_intro_then_loop<E: Engine>(
        &mut self,
        engine: &E,
        model: Handle,
    ) -> anyhow::Result<()> {
        self.unsubscribe(engine);

        let listener = engine.add_animation_listener(model)?;
        self.subscription = Some(Subscription {
            model,
            listener,
            handed_off: false,
        });
        engine.play_animation(model, AnimationRequest::once(INTRO_CLIP))?;
        engine.play_animation(model, AnimationRequest::looping(AMBIENT_CLIP))?;
        Ok(())
    }

    /// Handles an animation-ended notification. Returns whether it was acted upon.
    ///
    /// Notifications for other listeners, other models or other clips are
    /// ignored, as is every notification after the first handoff.
    pub fn on_animation_ended<E: Engine>(
        &mut self,
        engine: &E,
        event: &AnimationEnded,
    ) -> anyhow::Result<bool> {
        let Some(subscription) = self.subscription.as_mut() else {
            log::debug!("ignoring {:?}, no active subscription", event);
            return Ok(false);
        };
        if subscription.listener != event.listener || subscription.model != event.target {
            log::warn!("ignoring stray animation event {:?}", event);
            return Ok(false);
        }
        if event.animation_name != INTRO_CLIP || subscription.handed_off {
            return Ok(false);
        }

        subscription.handed_off = true;
        engine.stop_animation(subscription.model, INTRO_CLIP)?;
        engine.play_animation(subscription.model, AnimationRequest::looping(IDLE_CLIP))?;
        Ok(true)
    }

    pub fn unsubscribe<E: Engine>(&mut self, engine: &E) {
        if let Some(subscription) = self.subscription.take() {
            engine.remove_animation_listener(subscription.listener);
        }
    }
}
