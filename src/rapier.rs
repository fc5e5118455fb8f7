//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier2D.
//! Enable with the `rapier2d` feature.

use bevy::prelude::*;
use bevy_rapier2d::geometry::Group;
use bevy_rapier2d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::{CollisionData, SurfaceContact};
use crate::contacts::{Probe, ProbeHits};
use crate::controller::CharacterController;

/// Rapier2D physics backend for the gravity controller.
///
/// Velocity and world gravity go through Rapier's components. Probing and
/// contact collection are handled by dedicated Rapier systems that receive
/// `RapierContext` as a system parameter.
pub struct Rapier2dBackend;

impl CharacterPhysicsBackend for Rapier2dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier2dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec2) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec2 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation.xy())
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation().xy())
            })
            .unwrap_or(Vec2::ZERO)
    }

    fn get_half_extents(world: &World, entity: Entity) -> Vec2 {
        let scale = world
            .get::<Transform>(entity)
            .map(|t| t.scale.xy().abs())
            .unwrap_or(Vec2::ONE);
        world
            .get::<Collider>(entity)
            .map(|collider| get_collider_half_extents(collider) * scale)
            .unwrap_or(Vec2::ZERO)
    }

    fn set_global_gravity(world: &mut World, gravity: Vec2) {
        let mut q = world.query::<&mut RapierConfiguration>();
        for mut config in q.iter_mut(world) {
            config.gravity = gravity;
        }
    }
}

/// Plugin that sets up Rapier2D-specific systems for the gravity controller.
pub struct Rapier2dBackendPlugin;

impl Plugin for Rapier2dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::GravityControllerSet;

        // Probes and contact collection are independent of each other.
        app.add_systems(
            FixedUpdate,
            (rapier_probe_contacts, rapier_surface_contacts).in_set(GravityControllerSet::Sensors),
        );
    }
}

/// Get the half extents of the axis-aligned bounds of a collider.
///
/// Capsules include their radius. Unsupported shapes return zero, which
/// starts every probe at the collider center.
pub fn get_collider_half_extents(collider: &Collider) -> Vec2 {
    if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents()
    } else if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        let half_segment = (segment.a() - segment.b()).abs() / 2.0;
        half_segment + Vec2::splat(capsule.radius())
    } else if let Some(ball) = collider.as_ball() {
        Vec2::splat(ball.radius())
    } else {
        Vec2::ZERO
    }
}

/// Cast a single probe using RapierContext.
fn rapier_raycast(
    context: &RapierContext,
    probe: &Probe,
    exclude_entity: Entity,
    layers: Group,
) -> Option<CollisionData> {
    // Create filter to exclude the casting entity
    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(Group::ALL, layers));

    context
        .cast_ray_and_get_normal(probe.origin, probe.direction, probe.length, true, filter)
        .map(|(hit_entity, hit)| {
            CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
        })
}

/// Rapier-specific probe system.
///
/// Casts the probes laid out by the preparation step, which follow the axes
/// of the controller's gravity, NOT the body's Transform rotation.
fn rapier_probe_contacts(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(Entity, &mut CharacterController)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut controller) in &mut q_controllers {
        let Some(layout) = controller.probe_layout().copied() else {
            continue;
        };
        let layers = Group::from_bits_truncate(layout.layers);

        let mut hits = ProbeHits::default();
        for (slot, probe) in hits.ground.iter_mut().zip(layout.ground.iter()) {
            *slot = rapier_raycast(&context, probe, entity, layers);
        }
        for (slot, probe) in hits.walls.iter_mut().zip(layout.walls.iter()) {
            *slot = rapier_raycast(&context, probe, entity, layers);
        }
        controller.set_probe_hits(hits);
    }
}

/// Rapier-specific contact collection.
///
/// Records every body touching the character with the contact normal
/// pointing toward the character and the other body's velocity.
fn rapier_surface_contacts(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(Entity, &mut CharacterController)>,
    q_velocities: Query<&Velocity>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut controller) in &mut q_controllers {
        let contacts = context
            .contact_pairs_with(entity)
            .filter(|pair| pair.has_any_active_contact())
            .filter_map(|pair| {
                // Rapier's manifold normal points from collider1 to collider2.
                let (other, normal_sign) = if pair.collider1() == Some(entity) {
                    (pair.collider2()?, -1.0)
                } else {
                    (pair.collider1()?, 1.0)
                };
                let manifold = pair.manifolds().find(|m| m.num_points() > 0)?;
                let velocity = q_velocities
                    .get(other)
                    .map(|v| v.linvel)
                    .unwrap_or(Vec2::ZERO);
                Some(SurfaceContact::new(
                    other,
                    manifold.normal() * normal_sign,
                    velocity,
                ))
            })
            .collect();
        controller.set_surface_contacts(contacts);
    }
}

/// Bundle for creating a gravity platformer character with Rapier2D physics.
///
/// This bundle provides the Rapier2D components a controller entity needs:
/// a dynamic rigid body, velocity, locked rotation, frictionless contacts so
/// the character does not stick to walls, and continuous collision detection
/// for dashes.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier2d::prelude::*;
/// use gravity_platformer_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     let config = ControllerConfig::default();
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         CharacterController::new(),
///         GravityState::from_config(Vec2::NEG_Y, &config),
///         config,
///         MovementIntent::default(),
///         AbilityFlags::all(),
///         PlayerStateMachine::default(),
///         Rapier2dCharacterBundle::new(),
///         Collider::capsule_y(0.3, 0.25),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `friction`: 0.0, combined with `Min`
/// - `gravity_scale`: 1.0 (gravity comes from the world, set by the controller)
/// - `ccd`: enabled
#[derive(Bundle)]
pub struct Rapier2dCharacterBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub locked_axes: LockedAxes,
    pub friction: Friction,
    pub gravity_scale: GravityScale,
    pub ccd: Ccd,
}

impl Default for Rapier2dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier2dCharacterBundle {
    /// Create a character bundle with rotation locked.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            gravity_scale: GravityScale(1.0),
            ccd: Ccd::enabled(),
        }
    }

    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the friction coefficient against other colliders.
    pub fn with_friction(mut self, coefficient: f32) -> Self {
        self.friction.coefficient = coefficient;
        self
    }

    /// Set the locked axes.
    pub fn with_locked_axes(mut self, locked_axes: LockedAxes) -> Self {
        self.locked_axes = locked_axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(100.0, 200.0, 0.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier2dBackend::get_position(app.world(), entity);
        assert!((pos.x - 100.0).abs() < 0.01);
        assert!((pos.y - 200.0).abs() < 0.01);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec2::new(50.0, 30.0)),
            ))
            .id();

        Rapier2dBackend::set_velocity(app.world_mut(), entity, Vec2::new(100.0, 0.0));

        let vel = Rapier2dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 100.0).abs() < 0.01);
        assert!(vel.y.abs() < 0.01);
    }

    #[test]
    fn rapier_backend_sets_world_gravity() {
        let mut app = create_test_app();
        app.finish();
        app.cleanup();
        app.update();

        Rapier2dBackend::set_global_gravity(app.world_mut(), Vec2::new(7.2, 0.0));

        let mut q = app.world_mut().query::<&RapierConfiguration>();
        let configs: Vec<Vec2> = q.iter(app.world()).map(|c| c.gravity).collect();
        assert!(!configs.is_empty());
        assert!(configs.iter().all(|g| *g == Vec2::new(7.2, 0.0)));
    }

    #[test]
    fn half_extents_from_shapes() {
        assert_eq!(
            get_collider_half_extents(&Collider::cuboid(2.0, 3.0)),
            Vec2::new(2.0, 3.0)
        );
        let capsule = get_collider_half_extents(&Collider::capsule_y(0.5, 0.25));
        assert!((capsule - Vec2::new(0.25, 0.75)).length() < 1e-5);
        assert_eq!(get_collider_half_extents(&Collider::ball(1.5)), Vec2::splat(1.5));
    }

    #[test]
    fn half_extents_use_transform_scale() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((
                Transform::from_scale(Vec3::new(2.0, -1.0, 1.0)),
                Collider::cuboid(1.0, 1.0),
            ))
            .id();
        assert_eq!(
            Rapier2dBackend::get_half_extents(app.world(), entity),
            Vec2::new(2.0, 1.0)
        );
    }

    #[test]
    fn rapier_character_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier2dCharacterBundle::new(),
                Collider::capsule_y(0.3, 0.25),
            ))
            .id();

        app.update();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<Velocity>(entity).is_some());
        assert_eq!(
            app.world().get::<LockedAxes>(entity),
            Some(&LockedAxes::ROTATION_LOCKED)
        );
        assert_eq!(
            app.world().get::<Friction>(entity).map(|f| f.coefficient),
            Some(0.0)
        );
    }

    #[test]
    fn bundle_builders_override_defaults() {
        let bundle = Rapier2dCharacterBundle::new()
            .with_body(RigidBody::KinematicVelocityBased)
            .with_friction(0.4)
            .with_locked_axes(LockedAxes::empty());

        assert_eq!(bundle.rigid_body, RigidBody::KinematicVelocityBased);
        assert_eq!(bundle.friction.coefficient, 0.4);
        assert_eq!(bundle.locked_axes, LockedAxes::empty());
        assert_eq!(bundle.gravity_scale.0, 1.0);
    }
}
