//! Cooperative timed tasks.
//!
//! Reorientation, gravity flip cooldowns and power-up decay are modelled as
//! explicit tasks that are advanced once per frame by a system, never as
//! blocking waits. Each task can be cancelled, and restarting a task replaces
//! whatever was in flight.

use std::time::Duration;

use bevy::prelude::*;

/// A cancellable countdown advanced by frame ticks.
///
/// Wraps a one-shot [`Timer`] with an explicit idle state.
#[derive(Reflect, Debug, Clone, Default)]
pub struct TimedTask {
    #[reflect(ignore)]
    timer: Option<Timer>,
}

impl TimedTask {
    /// Create an idle task.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Start (or restart) the task for `seconds`.
    ///
    /// Any run already in flight is cancelled first. Non-positive durations
    /// start a task that completes on its next tick.
    pub fn start(&mut self, seconds: f32) {
        self.timer = Some(Timer::from_seconds(seconds.max(0.0), TimerMode::Once));
    }

    /// Cancel the running task, if any. Cancelling never reports completion.
    pub fn cancel(&mut self) {
        self.timer = None;
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Advance by one frame. Returns `true` exactly once, on the tick where the
    /// run completes; the task is idle afterwards.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        timer.tick(delta);
        if timer.finished() {
            self.timer = None;
            true
        } else {
            false
        }
    }

    /// Remaining time of the current run (zero when idle).
    pub fn remaining_secs(&self) -> f32 {
        self.timer.as_ref().map(|t| t.remaining_secs()).unwrap_or(0.0)
    }
}
