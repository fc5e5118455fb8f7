//! # `gravity_platformer_controller`
//!
//! A 2D platformer player controller with reorientable gravity and physics
//! backend abstraction.
//!
//! This crate provides a responsive, tuneable controller that:
//! - Moves along axes derived from an arbitrary gravity direction
//! - Supports coyote time, buffered jumps, variable jump height and air jumps
//! - Handles wall sliding, wall jumps and dashing
//! - Flips gravity with a cooldown and a smooth visual reorientation
//! - Applies ability unlocks and timed power-ups
//! - Abstracts the physics backend (Rapier2D included)
//!
//! ## Architecture
//!
//! Every physics step (`FixedUpdate`) runs, in order:
//! 1. [`GravityControllerSet::Preparation`]: advance the controller clock and
//!    consume input
//! 2. [`GravityControllerSet::Sensors`]: the backend casts the ground and wall
//!    probes along the current gravity axes
//! 3. [`GravityControllerSet::Contacts`]: classify contacts, platform
//!    attachment
//! 4. [`GravityControllerSet::Motion`]: the motion integrator writes the new
//!    velocity
//!
//! Once per rendered frame ([`GravityControllerSet::Frame`] in `Update`) the
//! gravity requests, reorientation, power-up decay, facing and state machine
//! are updated.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use gravity_platformer_controller::prelude::*;
//!
//! let config = ControllerConfig::default();
//! let controller = CharacterController::new();
//! let gravity = GravityState::from_config(Vec2::NEG_Y, &config);
//! let intent = MovementIntent::default();
//! let abilities = AbilityFlags::all();
//!
//! // These can be spawned together with the backend's physics components.
//! assert_eq!(gravity.up(), Vec2::Y);
//! ```

use bevy::prelude::*;

pub mod abilities;
pub mod axis;
pub mod backend;
pub mod collision;
pub mod config;
pub mod contacts;
pub mod controller;
pub mod error;
pub mod events;
pub mod gravity;
pub mod intent;
pub mod motion;
pub mod platform;
pub mod state;
pub mod systems;
pub mod tasks;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::abilities::{
        Ability, AbilityFlags, AbilitySession, AirJumpPolicy, Modifier, TimedEffect,
    };
    pub use crate::axis::AxisFrame;
    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::config::ControllerConfig;
    pub use crate::controller::CharacterController;
    pub use crate::error::{ConfigError, ControllerSetupError};
    pub use crate::events::{
        ApplyModifier, AttachedToPlatform, AudioCue, CueKind, DetachedFromPlatform,
        GroundedChanged, JumpKind, JumpPerformed, RequestGravityVector, StateChanged,
        VelocityChanged,
    };
    pub use crate::gravity::{FlipOutcome, FlipRejection, GravityState, GravityVisual};
    pub use crate::intent::MovementIntent;
    pub use crate::state::{Airborne, Grounded, PlayerState, PlayerStateMachine, WallSliding};
    pub use crate::{GravityControllerPlugin, GravityControllerSet};

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::{Rapier2dBackend, Rapier2dCharacterBundle};
}

/// System sets of the controller.
///
/// The first four run chained in `FixedUpdate`; `Frame` runs in `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GravityControllerSet {
    /// Clock and input.
    Preparation,
    /// Backend probes and contact collection.
    Sensors,
    /// Contact classification and platform attachment.
    Contacts,
    /// Motion integration.
    Motion,
    /// Per-frame gravity, power-up, facing, state and visual updates.
    Frame,
}

/// Main plugin for the gravity platformer controller.
///
/// This plugin is generic over a physics backend `B` which provides velocity
/// access, probing and the world gravity.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier2dBackend`)
///
/// # Examples
///
/// With Rapier2D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use gravity_platformer_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(GravityControllerPlugin::<Rapier2dBackend>::default())
///     .run();
/// ```
pub struct GravityControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for GravityControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for GravityControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<gravity::GravityState>();
        app.register_type::<gravity::GravityVisual>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<abilities::AbilityFlags>();
        app.register_type::<state::PlayerStateMachine>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::WallSliding>();

        // Notifications
        app.add_event::<events::GroundedChanged>()
            .add_event::<events::AttachedToPlatform>()
            .add_event::<events::DetachedFromPlatform>()
            .add_event::<events::VelocityChanged>()
            .add_event::<events::JumpPerformed>()
            .add_event::<events::StateChanged>()
            .add_event::<events::AudioCue>();
        // Commands
        app.add_event::<events::RequestGravityVector>()
            .add_event::<events::ApplyModifier>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                GravityControllerSet::Preparation,
                GravityControllerSet::Sensors,
                GravityControllerSet::Contacts,
                GravityControllerSet::Motion,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::prepare_step::<B>.in_set(GravityControllerSet::Preparation),
                systems::update_contacts.in_set(GravityControllerSet::Contacts),
                (systems::apply_motion::<B>, systems::sync_state_markers)
                    .chain()
                    .in_set(GravityControllerSet::Motion),
            ),
        );

        app.add_systems(PreUpdate, systems::validate_controllers::<B>);

        app.add_systems(
            Update,
            (
                systems::handle_gravity_requests,
                systems::advance_gravity::<B>,
                systems::apply_modifiers,
                systems::tick_power_ups,
                systems::update_facing,
                systems::update_state_machine::<B>,
                systems::sync_visuals,
            )
                .chain()
                .in_set(GravityControllerSet::Frame),
        );

        app.add_observer(systems::cancel_tasks_on_remove);
    }
}
