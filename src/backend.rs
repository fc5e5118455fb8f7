//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the gravity controller. The controller only needs velocity
//! access, collider extents, a fixed timestep and a way to set the world's
//! gravity; probing and contact collection are done by systems the backend
//! registers through its plugin.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller.
/// The backend plugin must also schedule a sensor system in
/// [`GravityControllerSet::Sensors`](crate::GravityControllerSet::Sensors)
/// that casts the probes of each controller's stored
/// [`ProbeLayout`](crate::contacts::ProbeLayout) (see
/// [`CharacterController::probe_layout`](crate::controller::CharacterController::probe_layout))
/// and stores the results with
/// [`CharacterController::set_probe_hits`](crate::controller::CharacterController::set_probe_hits)
/// and [`CharacterController::set_surface_contacts`](crate::controller::CharacterController::set_surface_contacts).
///
/// For an example implementation, see the `rapier` module's `Rapier2dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// The velocity component type used by this backend.
    ///
    /// Controllers spawned without it are rejected at startup.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec2;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec2;

    /// Get the world-space half extents of the entity's collider bounds.
    ///
    /// Together with [`Self::get_position`] this places the probes each step.
    fn get_half_extents(_world: &World, _entity: Entity) -> Vec2 {
        Vec2::ZERO
    }

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    /// Set the global gravity acceleration of the physics world.
    fn set_global_gravity(world: &mut World, gravity: Vec2);
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
