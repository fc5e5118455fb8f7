//! Directional gravity.
//!
//! [`GravityState`] owns the gravity direction of a controller, the flip
//! cooldown and the smooth visual reorientation that follows a direction
//! change. The physics-side effects (pushing the new acceleration to the
//! backend, reprojecting velocity) are performed by the frame systems based on
//! the values returned here.

use std::time::Duration;

use bevy::prelude::*;

use crate::abilities::AbilityFlags;
use crate::axis::{shortest_arc, AxisFrame};
use crate::config::ControllerConfig;
use crate::tasks::TimedTask;

/// Reorientations shorter than this snap immediately.
pub const SNAP_DURATION: f32 = 1e-4;

/// Why a gravity flip was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipRejection {
    ZeroDirection,
    CoolingDown,
    Locked,
}

/// Result of a gravity change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// The direction changed and a reorientation started.
    Applied {
        /// The reorientation already finished (zero duration).
        snapped: bool,
    },
    Rejected(FlipRejection),
}

impl FlipOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FlipOutcome::Applied { .. })
    }
}

/// Smooth rotation of the visual "up" toward a new gravity direction.
///
/// Interpolates linearly along the shortest arc and snaps to the exact target
/// angle when the duration has elapsed.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct Reorientation {
    start_angle: f32,
    target_angle: f32,
    arc: f32,
    elapsed: f32,
    duration: f32,
    running: bool,
}

impl Reorientation {
    /// Start rotating from `from` to `to` over `duration` seconds.
    pub fn start(from: f32, to: f32, duration: f32) -> Self {
        Self {
            start_angle: from,
            target_angle: to,
            arc: shortest_arc(from, to),
            elapsed: 0.0,
            duration,
            running: duration > SNAP_DURATION,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    /// Angle at the current progress.
    pub fn angle(&self) -> f32 {
        if !self.running {
            return self.target_angle;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.start_angle + self.arc * t
    }

    /// Advance by `dt` seconds. Returns `true` on the tick the rotation ends.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.running = false;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }
}

/// Gravity direction, magnitude, flip cooldown and visual orientation.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct GravityState {
    direction: Vec2,
    /// Magnitude of the gravity acceleration.
    pub magnitude: f32,
    flip_cooldown: TimedTask,
    reorientation: Reorientation,
    visual_angle: f32,
    #[reflect(ignore)]
    pending_sync: bool,
}

impl Default for GravityState {
    fn default() -> Self {
        Self::new(Vec2::NEG_Y, ControllerConfig::default().gravity_magnitude)
    }
}

impl GravityState {
    /// Create a gravity state. A zero direction falls back to world down.
    pub fn new(direction: Vec2, magnitude: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec2::NEG_Y);
        Self {
            direction,
            magnitude,
            flip_cooldown: TimedTask::idle(),
            reorientation: Reorientation::default(),
            visual_angle: AxisFrame::from_gravity(direction).up_angle(),
            pending_sync: true,
        }
    }

    /// Gravity state using the config's magnitude.
    pub fn from_config(direction: Vec2, config: &ControllerConfig) -> Self {
        Self::new(direction, config.gravity_magnitude)
    }

    /// Unit gravity direction.
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Gravity acceleration vector.
    pub fn acceleration(&self) -> Vec2 {
        self.direction * self.magnitude
    }

    /// Axis frame of the current direction.
    pub fn axes(&self) -> AxisFrame {
        AxisFrame::from_gravity(self.direction)
    }

    pub fn up(&self) -> Vec2 {
        -self.direction
    }

    pub fn right(&self) -> Vec2 {
        self.axes().right()
    }

    /// Current visual rotation (radians) of graphics following gravity.
    pub fn visual_angle(&self) -> f32 {
        self.visual_angle
    }

    pub fn is_reorienting(&self) -> bool {
        self.reorientation.is_running()
    }

    /// Whether a player flip would pass the cooldown check.
    pub fn is_flip_ready(&self) -> bool {
        !self.flip_cooldown.is_running()
    }

    pub fn flip_cooldown_remaining(&self) -> f32 {
        self.flip_cooldown.remaining_secs()
    }

    /// Player-triggered gravity flip.
    ///
    /// Ignored while the flip cooldown runs (unless unlimited gravity is
    /// active), for a zero direction, or without the flip ability.
    pub fn request_flip(
        &mut self,
        new_direction: Vec2,
        abilities: &AbilityFlags,
        config: &ControllerConfig,
    ) -> FlipOutcome {
        let Some(direction) = new_direction.try_normalize() else {
            return FlipOutcome::Rejected(FlipRejection::ZeroDirection);
        };
        if !abilities.can_flip_gravity {
            return FlipOutcome::Rejected(FlipRejection::Locked);
        }
        let unlimited = abilities.has_unlimited_gravity();
        if !unlimited && !self.is_flip_ready() {
            return FlipOutcome::Rejected(FlipRejection::CoolingDown);
        }

        if !unlimited {
            self.flip_cooldown.start(config.flip_cooldown);
        }
        let duration = if config.rotate_visuals_with_gravity {
            config.rotation_duration
        } else {
            0.0
        };
        self.set_direction(direction, duration)
    }

    /// Externally requested gravity change.
    ///
    /// Bypasses the cooldown and the flip ability; only a zero direction is
    /// ignored.
    pub fn request_vector(&mut self, new_direction: Vec2, duration: f32) -> FlipOutcome {
        match new_direction.try_normalize() {
            Some(direction) => self.set_direction(direction, duration),
            None => FlipOutcome::Rejected(FlipRejection::ZeroDirection),
        }
    }

    /// Change direction and restart the reorientation. The newest request
    /// always replaces one in flight.
    fn set_direction(&mut self, direction: Vec2, duration: f32) -> FlipOutcome {
        self.direction = direction;
        self.pending_sync = true;
        let target = AxisFrame::from_gravity(direction).up_angle();
        self.reorientation = Reorientation::start(self.visual_angle, target, duration);
        let snapped = !self.reorientation.is_running();
        if snapped {
            self.visual_angle = target;
        }
        FlipOutcome::Applied { snapped }
    }

    /// Returns `true` once after the direction changed (or after creation),
    /// when the physics world's gravity and the body's velocity still have to
    /// follow the new direction.
    pub fn take_pending_sync(&mut self) -> bool {
        std::mem::take(&mut self.pending_sync)
    }

    /// Advance the reorientation by one frame. Returns `true` on the frame it
    /// completes.
    pub fn advance_reorientation(&mut self, dt: f32) -> bool {
        if !self.reorientation.is_running() {
            return false;
        }
        let finished = self.reorientation.advance(dt);
        self.visual_angle = self.reorientation.angle();
        finished
    }

    /// Advance the flip cooldown by one frame. Returns `true` when it expires.
    pub fn tick_cooldown(&mut self, delta: Duration) -> bool {
        self.flip_cooldown.tick(delta)
    }

    /// Cancel the cooldown and the reorientation, snapping the visuals.
    pub fn cancel_tasks(&mut self) {
        self.flip_cooldown.cancel();
        if self.reorientation.is_running() {
            self.visual_angle = self.reorientation.target_angle();
        }
        self.reorientation.cancel();
    }
}

/// Rotates a visual entity with the gravity of a controller.
///
/// Put this on a child or sibling sprite entity. Its rotation follows
/// [`GravityState::visual_angle`] and, with `mirror_facing`, its x scale
/// follows the controller's facing.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct GravityVisual {
    pub controller: Entity,
    pub mirror_facing: bool,
}

impl GravityVisual {
    pub fn new(controller: Entity) -> Self {
        Self {
            controller,
            mirror_facing: true,
        }
    }

    pub fn without_mirroring(mut self) -> Self {
        self.mirror_facing = false;
        self
    }
}
