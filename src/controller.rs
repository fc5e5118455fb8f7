//! The controller component.
//!
//! [`CharacterController`] is the per-entity hub of runtime state: the physics
//! clock, contact flags, jump and dash bookkeeping, platform attachment and
//! the probe results written by the backend. The movement stages that mutate
//! it live in [`crate::motion`].

use bevy::prelude::*;

use crate::axis::AxisFrame;
use crate::collision::SurfaceContact;
use crate::config::ControllerConfig;
use crate::contacts::{ContactState, ContactTransition, ProbeHits, ProbeLayout};
use crate::motion::{DashState, JumpState};
use crate::platform::{PlatformAttachment, PlatformUpdate};

/// Input magnitude below which the stick counts as centered.
pub const INPUT_DEADZONE: f32 = 0.05;

/// Result of classifying this step's contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactUpdate {
    pub transition: ContactTransition,
    /// A landing cue passed its rate limit.
    pub land_cue: bool,
}

/// Runtime state of a gravity platformer controller.
///
/// # Example
///
/// ```rust
/// use gravity_platformer_controller::prelude::*;
///
/// let controller = CharacterController::new();
/// assert!(!controller.is_grounded());
/// assert_eq!(controller.facing(), 1.0);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterController {
    /// Physics clock in seconds, advanced by the fixed timestep.
    pub clock: f32,
    pub contacts: ContactState,
    pub jump: JumpState,
    pub dash: DashState,
    /// Horizontal input is ignored until this time (after a wall jump).
    pub wall_jump_lock_until: Option<f32>,
    pub platform: PlatformAttachment,
    /// Last computed wall-slide condition.
    pub wall_sliding: bool,
    facing: f32,
    last_move_sign: Option<f32>,
    move_input: f32,
    #[reflect(ignore)]
    probe_layout: Option<ProbeLayout>,
    #[reflect(ignore)]
    probe_hits: ProbeHits,
    #[reflect(ignore)]
    surface_contacts: Vec<SurfaceContact>,
    last_land_cue: Option<f32>,
    pub(crate) last_slide_cue: Option<f32>,
    last_reported_velocity: Option<Vec2>,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            clock: 0.0,
            contacts: ContactState::default(),
            jump: JumpState::default(),
            dash: DashState::default(),
            wall_jump_lock_until: None,
            platform: PlatformAttachment::default(),
            wall_sliding: false,
            facing: 1.0,
            last_move_sign: None,
            move_input: 0.0,
            probe_layout: None,
            probe_hits: ProbeHits::default(),
            surface_contacts: Vec::new(),
            last_land_cue: None,
            last_slide_cue: None,
            last_reported_velocity: None,
        }
    }
}

impl CharacterController {
    /// Create a new controller facing right.
    pub fn new() -> Self {
        Self::default()
    }

    // === Queries ===

    pub fn is_grounded(&self) -> bool {
        self.contacts.grounded
    }

    pub fn is_wall_sliding(&self) -> bool {
        self.wall_sliding
    }

    pub fn is_dashing(&self) -> bool {
        self.dash.is_dashing
    }

    /// Facing sign: 1.0 for right, -1.0 for left (along the right axis).
    pub fn facing(&self) -> f32 {
        self.facing
    }

    /// Horizontal input scalar along the right axis, after screen-relative
    /// remapping and the wall-jump lock.
    pub fn move_input(&self) -> f32 {
        self.move_input
    }

    /// Sign of the last non-zero horizontal input.
    pub fn last_move_sign(&self) -> Option<f32> {
        self.last_move_sign
    }

    /// The platform the character stands on.
    pub fn attached_platform(&self) -> Option<Entity> {
        self.platform.platform()
    }

    /// Whether horizontal input is locked after a wall jump.
    pub fn is_input_locked(&self) -> bool {
        self.wall_jump_lock_until
            .is_some_and(|until| self.clock < until)
    }

    // === Backend sensor input/output ===

    /// Store the probes to cast this step.
    pub fn set_probe_layout(&mut self, layout: ProbeLayout) {
        self.probe_layout = Some(layout);
    }

    /// Probes laid out at the start of this step (`None` before the first step).
    pub fn probe_layout(&self) -> Option<&ProbeLayout> {
        self.probe_layout.as_ref()
    }

    /// Store this step's probe results.
    pub fn set_probe_hits(&mut self, hits: ProbeHits) {
        self.probe_hits = hits;
    }

    pub fn probe_hits(&self) -> &ProbeHits {
        &self.probe_hits
    }

    /// Store this step's contacts with other bodies.
    pub fn set_surface_contacts(&mut self, contacts: Vec<SurfaceContact>) {
        self.surface_contacts = contacts;
    }

    pub fn surface_contacts(&self) -> &[SurfaceContact] {
        &self.surface_contacts
    }

    // === Step bookkeeping ===

    /// Advance the physics clock by one step.
    pub fn advance_clock(&mut self, dt: f32) {
        self.clock += dt;
    }

    /// Record a jump press at the current physics time.
    pub fn press_jump(&mut self) {
        self.jump.last_pressed_time = Some(self.clock);
    }

    /// Resolve the raw horizontal input into the right-axis scalar used by
    /// the movement stages and remember its sign.
    pub fn resolve_input(&mut self, raw: f32, axes: &AxisFrame, config: &ControllerConfig) -> f32 {
        let mut input = raw.clamp(-1.0, 1.0);
        if config.screen_relative_input {
            input = axes.screen_relative_scalar(input);
        }
        if self.is_input_locked() {
            input = 0.0;
        }
        if input.abs() > INPUT_DEADZONE {
            self.last_move_sign = Some(input.signum());
        }
        self.move_input = input;
        input
    }

    /// Update the facing sign from input, or from the wall while sliding.
    pub fn update_facing(&mut self) {
        if self.move_input.abs() > INPUT_DEADZONE {
            self.facing = self.move_input.signum();
        } else if self.wall_sliding {
            if self.contacts.wall_left {
                self.facing = -1.0;
            }
            if self.contacts.wall_right {
                self.facing = 1.0;
            }
        }
    }

    /// Classify the stored probe hits at the current physics time.
    ///
    /// Landing restores the single air jump and may produce a landing cue,
    /// rate limited by `land_sfx_cooldown`.
    pub fn update_contacts(&mut self, config: &ControllerConfig) -> ContactUpdate {
        let now = self.clock;
        let transition = self.contacts.classify(&self.probe_hits, now, config);
        let mut land_cue = false;
        if transition == ContactTransition::Landed {
            self.jump.has_used_air_jump = false;
            land_cue = cue_ready(self.last_land_cue, now, config.land_sfx_cooldown);
            if land_cue {
                self.last_land_cue = Some(now);
            }
        }
        ContactUpdate {
            transition,
            land_cue,
        }
    }

    /// Update the platform attachment from the stored surface contacts.
    pub fn update_platform(&mut self, gravity_dir: Vec2) -> PlatformUpdate {
        self.platform.update(&self.surface_contacts, gravity_dir)
    }

    /// Returns `true` if `velocity` differs from the last reported one and
    /// remembers it.
    pub fn report_velocity(&mut self, velocity: Vec2) -> bool {
        if self.last_reported_velocity == Some(velocity) {
            return false;
        }
        self.last_reported_velocity = Some(velocity);
        true
    }

    /// End every in-flight timed state (dash, input lock).
    pub fn cancel_tasks(&mut self) {
        self.dash.is_dashing = false;
        self.dash.end_time = None;
        self.wall_jump_lock_until = None;
        self.platform.detach();
    }
}

/// Whether a cue last played at `last` may play again at `now`.
pub(crate) fn cue_ready(last: Option<f32>, now: f32, cooldown: f32) -> bool {
    last.is_none_or(|t| now - t >= cooldown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionData;

    fn grounded_hits() -> ProbeHits {
        ProbeHits {
            ground: [Some(CollisionData::new(0.1, Vec2::Y, Vec2::ZERO, None)), None, None],
            walls: [None, None],
        }
    }

    #[test]
    fn new_controller_defaults() {
        let controller = CharacterController::new();
        assert_eq!(controller.clock, 0.0);
        assert!(!controller.is_grounded());
        assert!(!controller.is_dashing());
        assert_eq!(controller.facing(), 1.0);
        assert_eq!(controller.attached_platform(), None);
    }

    #[test]
    fn landing_restores_air_jump() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        controller.jump.has_used_air_jump = true;
        controller.set_probe_hits(grounded_hits());
        let update = controller.update_contacts(&config);
        assert_eq!(update.transition, ContactTransition::Landed);
        assert!(!controller.jump.has_used_air_jump);
    }

    #[test]
    fn landing_cue_is_rate_limited() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();

        controller.set_probe_hits(grounded_hits());
        assert!(controller.update_contacts(&config).land_cue);

        // Bounce off and land again quickly.
        controller.advance_clock(0.05);
        controller.set_probe_hits(ProbeHits::default());
        controller.update_contacts(&config);
        controller.advance_clock(0.05);
        controller.set_probe_hits(grounded_hits());
        let update = controller.update_contacts(&config);
        assert_eq!(update.transition, ContactTransition::Landed);
        assert!(!update.land_cue);

        controller.advance_clock(0.05);
        controller.set_probe_hits(ProbeHits::default());
        controller.update_contacts(&config);
        controller.advance_clock(config.land_sfx_cooldown);
        controller.set_probe_hits(grounded_hits());
        assert!(controller.update_contacts(&config).land_cue);
    }

    #[test]
    fn resolve_input_applies_screen_relative_and_lock() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        let upside_down = AxisFrame::from_gravity(Vec2::Y);
        assert_eq!(controller.resolve_input(1.0, &upside_down, &config), -1.0);
        assert_eq!(controller.last_move_sign(), Some(-1.0));

        controller.wall_jump_lock_until = Some(0.1);
        assert_eq!(controller.resolve_input(1.0, &AxisFrame::default(), &config), 0.0);
        // The locked input does not overwrite the last sign.
        assert_eq!(controller.last_move_sign(), Some(-1.0));

        controller.advance_clock(0.1);
        assert_eq!(controller.resolve_input(1.0, &AxisFrame::default(), &config), 1.0);
    }

    #[test]
    fn screen_relative_input_can_be_disabled() {
        let config = ControllerConfig::default().with_screen_relative_input(false);
        let mut controller = CharacterController::new();
        let upside_down = AxisFrame::from_gravity(Vec2::Y);
        assert_eq!(controller.resolve_input(1.0, &upside_down, &config), 1.0);
    }

    #[test]
    fn facing_follows_input_then_wall() {
        let config = ControllerConfig::default();
        let mut controller = CharacterController::new();
        controller.resolve_input(-1.0, &AxisFrame::default(), &config);
        controller.update_facing();
        assert_eq!(controller.facing(), -1.0);

        controller.resolve_input(0.0, &AxisFrame::default(), &config);
        controller.wall_sliding = true;
        controller.contacts.wall_right = true;
        controller.update_facing();
        assert_eq!(controller.facing(), 1.0);
    }

    #[test]
    fn velocity_reports_only_changes() {
        let mut controller = CharacterController::new();
        assert!(controller.report_velocity(Vec2::ZERO));
        assert!(!controller.report_velocity(Vec2::ZERO));
        assert!(controller.report_velocity(Vec2::X));
    }

    #[test]
    fn press_jump_uses_clock() {
        let mut controller = CharacterController::new();
        controller.advance_clock(0.5);
        controller.press_jump();
        assert_eq!(controller.jump.last_pressed_time, Some(0.5));
    }
}
