//! Controller events and commands.
//!
//! Notifications are Bevy events written by the controller systems and read
//! by animation, audio or gameplay code. Each transition produces at most one
//! notification. Commands flow the other way: the application writes them and
//! the frame systems apply them.

use bevy::prelude::*;

use crate::abilities::Modifier;
use crate::state::PlayerState;

/// The grounded flag changed.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GroundedChanged {
    pub entity: Entity,
    pub grounded: bool,
}

/// The character started standing on a (possibly moving) body.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttachedToPlatform {
    pub entity: Entity,
    pub platform: Entity,
}

/// The character stopped standing on the platform it was attached to.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DetachedFromPlatform {
    pub entity: Entity,
    pub platform: Entity,
}

/// The velocity written by the integrator differs from the last one reported.
///
/// Sent from the physics step, de-duplicated per controller: a step that
/// writes the same velocity as the previous report sends nothing, so a
/// character at rest is silent.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct VelocityChanged {
    pub entity: Entity,
    pub velocity: Vec2,
}

/// Kind of jump that fired.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    /// From the ground, including coyote time and buffered presses.
    Ground,
    /// Away from a wall while wall sliding.
    Wall,
    /// While airborne.
    Air,
}

/// A jump fired this physics step.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct JumpPerformed {
    pub entity: Entity,
    /// Velocity right after the jump impulse.
    pub velocity: Vec2,
    pub kind: JumpKind,
}

/// The animation state changed.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    pub entity: Entity,
    pub previous: PlayerState,
    pub next: PlayerState,
}

/// Sound effect hook.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    Jump,
    /// Rate limited by `land_sfx_cooldown`.
    Land,
    /// Rate limited by `slide_sfx_cooldown`.
    Slide,
    Dash,
}

/// Request to play a sound effect.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCue {
    pub entity: Entity,
    pub kind: CueKind,
}

/// Command: change gravity of a controller, bypassing cooldown and ability.
///
/// A zero direction is ignored.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct RequestGravityVector {
    pub entity: Entity,
    pub direction: Vec2,
    /// Duration of the visual reorientation in seconds.
    pub duration: f32,
}

/// Command: apply an ability unlock or power-up to a controller.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ApplyModifier {
    pub entity: Entity,
    pub modifier: Modifier,
}
