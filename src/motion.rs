//! Motion integration.
//!
//! [`CharacterController::integrate`] turns input, contacts and abilities into
//! a new velocity once per physics step. The stages run in a fixed order and
//! each one sees the velocity produced by the previous one:
//!
//! 1. dash trigger (a running dash overrides everything below)
//! 2. horizontal drive
//! 3. ground jump (coyote time and jump buffering)
//! 4. air jump
//! 5. variable jump height and fall gravity
//! 6. wall slide and wall jump
//!
//! The base gravity acceleration is applied by the physics engine; the stages
//! only add the extra gravity used to shape jumps.

use bevy::prelude::*;

use crate::abilities::AbilityFlags;
use crate::axis::AxisFrame;
use crate::config::ControllerConfig;
use crate::controller::{cue_ready, CharacterController, INPUT_DEADZONE};
use crate::events::{CueKind, JumpKind};

/// Target speeds below this count as "no input" for the horizontal drive.
const TARGET_EPSILON: f32 = 0.01;

/// Speed along gravity above which the character counts as moving down a wall.
const SLIDE_EPSILON: f32 = 0.01;

/// Jump bookkeeping.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpState {
    /// Time of the buffered jump press, cleared when a jump consumes it.
    pub last_pressed_time: Option<f32>,
    /// Start time of the latest jump.
    pub last_jump_time: Option<f32>,
    /// The short-hop cut was applied to the current rise.
    pub jump_cut_applied: bool,
    /// The single air jump was used; restored on landing.
    pub has_used_air_jump: bool,
    /// A jump already fired during the current step.
    pub jumped_this_step: bool,
}

impl JumpState {
    /// Age of the buffered press (infinite if there is none).
    pub fn time_since_pressed(&self, now: f32) -> f32 {
        self.last_pressed_time
            .map(|t| now - t)
            .unwrap_or(f32::INFINITY)
    }

    /// Time since the latest jump started (infinite if none).
    pub fn time_since_jump(&self, now: f32) -> f32 {
        self.last_jump_time
            .map(|t| now - t)
            .unwrap_or(f32::INFINITY)
    }

    fn begin_jump(&mut self, now: f32) {
        self.jumped_this_step = true;
        self.last_pressed_time = None;
        self.last_jump_time = Some(now);
        self.jump_cut_applied = false;
    }
}

/// Dash bookkeeping.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct DashState {
    pub is_dashing: bool,
    pub end_time: Option<f32>,
    /// No new dash may start before this time.
    pub next_dash_time: Option<f32>,
    /// Unit direction along the right axis, fixed at dash start.
    pub direction: Vec2,
}

impl DashState {
    /// Whether the cooldown allows a new dash at `now`.
    pub fn is_ready(&self, now: f32) -> bool {
        !self.is_dashing && self.next_dash_time.is_none_or(|t| now >= t)
    }
}

/// Input consumed by one physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepInput {
    /// Horizontal input along the right axis in `[-1, 1]`.
    pub move_input: f32,
    /// Jump button held.
    pub jump_held: bool,
    /// A dash press was latched since the last step.
    pub dash_pressed: bool,
}

/// Environment of one physics step.
#[derive(Debug, Clone, Copy)]
pub struct StepEnv<'a> {
    pub axes: AxisFrame,
    pub gravity_magnitude: f32,
    pub dt: f32,
    pub config: &'a ControllerConfig,
    pub abilities: &'a AbilityFlags,
}

/// Result of one physics step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub velocity: Vec2,
    /// Kind of jump fired this step and the velocity right after it.
    pub jump: Option<(JumpKind, Vec2)>,
    pub cues: Vec<CueKind>,
    pub dash_started: bool,
    pub dash_ended: bool,
}

/// Move `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

impl CharacterController {
    /// Integrate one physics step at the current clock.
    pub fn integrate(&mut self, velocity: Vec2, input: StepInput, env: &StepEnv) -> StepOutcome {
        let mut outcome = StepOutcome {
            velocity,
            ..default()
        };

        if input.dash_pressed && self.try_start_dash(velocity, input.move_input, env) {
            outcome.dash_started = true;
            outcome.cues.push(CueKind::Dash);
        }

        if self.dash.is_dashing {
            self.wall_sliding = false;
            let (velocity, ended) = self.dash_motion(env);
            outcome.velocity = velocity;
            outcome.dash_ended = ended;
            self.jump.jumped_this_step = false;
            return outcome;
        }

        let mut v = self.horizontal_drive(velocity, input.move_input, env);
        v = self.ground_jump(v, env, &mut outcome);
        v = self.air_jump(v, env, &mut outcome);
        v = self.jump_tuning(v, input.jump_held, env);
        v = self.wall_slide(v, input.move_input, env, &mut outcome);

        self.jump.jumped_this_step = false;
        outcome.velocity = v;
        outcome
    }

    /// Accelerate along the right axis toward the input's target speed.
    ///
    /// The drive works relative to the attached platform, whose velocity is
    /// added back afterwards.
    pub fn horizontal_drive(&self, velocity: Vec2, move_input: f32, env: &StepEnv) -> Vec2 {
        let config = env.config;
        let speed_mult = env.abilities.speed_multiplier();
        let platform_velocity = self.platform.velocity();
        let local = env.axes.to_local(velocity - platform_velocity);
        let grounded = self.contacts.grounded;

        let target = config.move_speed * speed_mult * move_input;
        let control = if grounded { 1.0 } else { config.air_control };
        let mut v_right = if target.abs() > TARGET_EPSILON {
            move_towards(local.x, target, config.acceleration * control * env.dt)
        } else {
            move_towards(local.x, 0.0, config.deceleration * control * env.dt)
        };

        if !grounded {
            let max_air = config.max_air_speed * speed_mult.max(1.0);
            v_right = v_right.clamp(-max_air, max_air);
        }

        env.axes.to_world(Vec2::new(v_right, local.y)) + platform_velocity
    }

    /// Ground jump within coyote time, from a buffered press.
    pub fn ground_jump(&mut self, velocity: Vec2, env: &StepEnv, outcome: &mut StepOutcome) -> Vec2 {
        let now = self.clock;
        let config = env.config;
        let coyote = self.contacts.time_since_grounded(now) <= config.coyote_time;
        let buffered = self.jump.time_since_pressed(now) <= config.jump_buffer_time;
        if !coyote || !buffered || self.jump.jumped_this_step || self.dash.is_dashing {
            return velocity;
        }

        let v = self.launch(velocity, env);
        self.record_jump(JumpKind::Ground, v, outcome);
        v
    }

    /// Air jump according to the air jump policy.
    pub fn air_jump(&mut self, velocity: Vec2, env: &StepEnv, outcome: &mut StepOutcome) -> Vec2 {
        let now = self.clock;
        let policy = env.abilities.air_jumps;
        if !policy.allows(self.jump.has_used_air_jump)
            || self.contacts.grounded
            || self.dash.is_dashing
            || self.jump.time_since_pressed(now) > env.config.jump_buffer_time
        {
            return velocity;
        }

        if policy.consumes() {
            self.jump.has_used_air_jump = true;
        }
        let v = self.launch(velocity, env);
        self.record_jump(JumpKind::Air, v, outcome);
        v
    }

    /// Extra gravity while rising with the button released and while
    /// falling, plus the one-shot short-hop cut.
    pub fn jump_tuning(&mut self, velocity: Vec2, jump_held: bool, env: &StepEnv) -> Vec2 {
        let config = env.config;
        let now = self.clock;
        let down = env.axes.down();
        let gravity = env.gravity_magnitude;

        let rising = env.axes.to_local(velocity).y > config.rising_epsilon;
        let released = !jump_held && self.jump.time_since_jump(now) > config.jump_release_grace;

        let mut v = velocity;
        if rising {
            if released {
                v += down * (gravity * (config.low_jump_gravity - 1.0) * env.dt);
            }
        } else {
            v += down * (gravity * (config.fall_gravity - 1.0) * env.dt);
        }

        if rising && released && !self.jump.jump_cut_applied {
            let max_up = config.jump_speed * env.abilities.jump_multiplier() * config.jump_cut_multiplier;
            let local = env.axes.to_local(v);
            v = env.axes.to_world(Vec2::new(local.x, local.y.min(max_up)));
            self.jump.jump_cut_applied = true;
        }

        if !rising {
            self.jump.jump_cut_applied = false;
        }
        v
    }

    /// Whether the wall slide conditions hold for `velocity`.
    pub fn wall_slide_active(&self, velocity: Vec2, move_input: f32, env: &StepEnv) -> bool {
        if self.contacts.grounded || self.dash.is_dashing || !self.contacts.touching_wall() {
            return false;
        }
        let moving_down = velocity.dot(env.axes.down()) > SLIDE_EPSILON;
        let input_ok =
            !env.config.require_input_into_wall || self.contacts.pushing_into_wall(move_input);
        moving_down && input_ok
    }

    /// Clamp the slide speed and fire wall jumps.
    pub fn wall_slide(
        &mut self,
        velocity: Vec2,
        move_input: f32,
        env: &StepEnv,
        outcome: &mut StepOutcome,
    ) -> Vec2 {
        self.wall_sliding = self.wall_slide_active(velocity, move_input, env);
        if !self.wall_sliding {
            return velocity;
        }

        let config = env.config;
        let now = self.clock;
        let down = env.axes.down();
        let right = env.axes.right();

        let v_down = velocity.dot(down).min(config.wall_slide_max_speed.abs());
        let mut v = right * velocity.dot(right) + down * v_down;

        if cue_ready(self.last_slide_cue, now, config.slide_sfx_cooldown) {
            self.last_slide_cue = Some(now);
            outcome.cues.push(CueKind::Slide);
        }

        if env.abilities.can_wall_jump
            && self.jump.time_since_pressed(now) <= config.wall_jump_input_window
        {
            let away = self.contacts.away_from_wall(&env.axes);
            v = away * config.wall_jump_lateral
                + env.axes.up() * (config.wall_jump_vertical * env.abilities.jump_multiplier());
            self.jump.begin_jump(now);
            self.wall_jump_lock_until = Some(now + config.wall_jump_lock_time);
            self.wall_sliding = false;
            self.record_jump(JumpKind::Wall, v, outcome);
        }
        v
    }

    /// Start a dash if the ability, state and cooldown allow it.
    ///
    /// The direction is the first non-zero of: input sign, horizontal
    /// velocity sign, last input sign, facing.
    pub fn try_start_dash(&mut self, velocity: Vec2, move_input: f32, env: &StepEnv) -> bool {
        let now = self.clock;
        if !env.abilities.can_dash || !self.dash.is_ready(now) {
            return false;
        }

        let v_right = env.axes.to_local(velocity).x;
        let sign = if move_input.abs() > INPUT_DEADZONE {
            move_input.signum()
        } else if v_right.abs() > INPUT_DEADZONE {
            v_right.signum()
        } else {
            self.last_move_sign().unwrap_or(self.facing())
        };

        self.dash = DashState {
            is_dashing: true,
            end_time: Some(now + env.config.dash_time),
            next_dash_time: Some(now + env.config.dash_cooldown),
            direction: env.axes.right() * sign,
        };
        self.platform.clear_velocity();
        true
    }

    /// Forced dash velocity. Returns the velocity and whether the dash ended
    /// this step; on the final step the velocity is reprojected onto the
    /// current axes.
    pub fn dash_motion(&mut self, env: &StepEnv) -> (Vec2, bool) {
        let speed = env.config.dash_speed * env.abilities.speed_multiplier().max(1.0);
        let v = self.dash.direction * speed;
        let ended = self.dash.end_time.is_none_or(|end| self.clock >= end);
        if !ended {
            return (v, false);
        }
        self.dash.is_dashing = false;
        self.dash.end_time = None;
        (env.axes.reproject(v), true)
    }

    /// Keep the right component and set the up component to the jump speed.
    fn launch(&mut self, velocity: Vec2, env: &StepEnv) -> Vec2 {
        let v_right = env.axes.to_local(velocity).x;
        let v_up = env.config.jump_speed * env.abilities.jump_multiplier();
        self.jump.begin_jump(self.clock);
        env.axes.to_world(Vec2::new(v_right, v_up))
    }

    fn record_jump(&self, kind: JumpKind, velocity: Vec2, outcome: &mut StepOutcome) {
        outcome.jump = Some((kind, velocity));
        outcome.cues.push(CueKind::Jump);
    }
}
