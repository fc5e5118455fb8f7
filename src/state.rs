//! Animation state and state marker components.
//!
//! [`PlayerStateMachine`] derives a discrete state from the controller's
//! contacts and velocity once per rendered frame. The marker components are
//! kept in sync by the controller systems so gameplay code can filter queries
//! with them.

use bevy::prelude::*;

/// Default minimum horizontal speed for [`PlayerState::Run`].
pub const RUN_EPSILON: f32 = 0.06;

/// Default dead band around zero vertical speed.
pub const VERTICAL_EPSILON: f32 = 0.05;

/// Discrete movement state for animation and sound hooks.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlayerState {
    #[default]
    Idle,
    Run,
    Jump,
    Fall,
    WallSlide,
}

/// State machine observing a controller.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct PlayerStateMachine {
    state: PlayerState,
    /// Horizontal speed above which a grounded character runs.
    pub run_epsilon: f32,
    /// Upward speed a character must exceed to count as jumping.
    pub vertical_epsilon: f32,
}

impl Default for PlayerStateMachine {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            run_epsilon: RUN_EPSILON,
            vertical_epsilon: VERTICAL_EPSILON,
        }
    }
}

impl PlayerStateMachine {
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Evaluate the state for this frame.
    ///
    /// Returns `Some((previous, next))` only when the state changed.
    pub fn tick(
        &mut self,
        grounded: bool,
        wall_sliding: bool,
        up_velocity: f32,
        right_speed: f32,
    ) -> Option<(PlayerState, PlayerState)> {
        let previous = self.state;
        let next = if grounded {
            if right_speed > self.run_epsilon {
                PlayerState::Run
            } else {
                PlayerState::Idle
            }
        } else if wall_sliding {
            PlayerState::WallSlide
        } else if up_velocity > self.vertical_epsilon {
            PlayerState::Jump
        } else {
            // Anything not clearly rising falls, including the dead band.
            PlayerState::Fall
        };

        self.state = next;
        (previous != next).then_some((previous, next))
    }
}

/// Marker component indicating the character is grounded.
///
/// Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is sliding down a wall.
///
/// Contains the side of the wall along the right axis.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct WallSliding {
    /// -1.0 for a wall on the left, 1.0 for a wall on the right.
    pub side: f32,
}

impl WallSliding {
    pub fn is_left(&self) -> bool {
        self.side < 0.0
    }

    pub fn is_right(&self) -> bool {
        self.side > 0.0
    }
}
