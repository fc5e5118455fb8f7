//! Integration tests for the Rapier2D backend.
//!
//! These tests run real Rapier colliders and check what the backend's sensor
//! systems write into the controller.

#![cfg(feature = "rapier2d")]

use bevy::prelude::*;
use bevy::time::Virtual;
use bevy_rapier2d::prelude::*;
use gravity_platformer_controller::prelude::*;

/// Create a minimal test app with physics and the gravity controller.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(GravityControllerPlugin::<Rapier2dBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static box collider.
fn spawn_box(app: &mut App, position: Vec2, half_size: Vec2) -> Entity {
    let transform = Transform::from_translation(position.extend(0.0));
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(half_size.x, half_size.y),
        ))
        .id()
}

/// Spawn a floor whose top surface is at y = 0.
fn spawn_floor(app: &mut App) -> Entity {
    spawn_box(app, Vec2::new(0.0, -0.5), Vec2::new(50.0, 0.5))
}

/// Spawn a character whose collider bounds have half extents (0.25, 0.5).
fn spawn_character(app: &mut App, position: Vec2, gravity: Vec2, config: ControllerConfig) -> Entity {
    let transform = Transform::from_translation(position.extend(0.0));
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            CharacterController::new(),
            GravityState::from_config(gravity, &config),
            config,
            MovementIntent::default(),
            AbilityFlags::all(),
            Rapier2dCharacterBundle::new(),
            Collider::capsule_y(0.25, 0.25),
        ))
        .id()
}

/// Run one physics step.
fn tick(app: &mut App) {
    let timestep = std::time::Duration::from_secs_f64(1.0 / 60.0);
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .advance_by(timestep);
    app.update();
    app.world_mut().run_schedule(FixedUpdate);
    app.update();
}

fn controller(app: &App, entity: Entity) -> &CharacterController {
    app.world()
        .get::<CharacterController>(entity)
        .expect("character has a controller")
}

mod probes {
    use super::*;

    #[test]
    fn character_on_floor_is_grounded() {
        let mut app = create_test_app();
        spawn_floor(&mut app);
        let character = spawn_character(
            &mut app,
            Vec2::new(0.0, 0.52),
            Vec2::NEG_Y,
            ControllerConfig::default(),
        );

        tick(&mut app);

        let controller = controller(&app, character);
        let closest = controller.probe_hits().closest_ground();
        println!("PROOF: closest ground hit = {closest:?}");
        assert!(controller.is_grounded());
        let hit = closest.expect("a ground probe hit");
        assert!(hit.normal.y > 0.9);
    }

    #[test]
    fn character_high_above_floor_is_airborne() {
        let mut app = create_test_app();
        spawn_floor(&mut app);
        let character = spawn_character(
            &mut app,
            Vec2::new(0.0, 20.0),
            Vec2::NEG_Y,
            ControllerConfig::default(),
        );

        tick(&mut app);

        assert!(!controller(&app, character).is_grounded());
    }

    #[test]
    fn wall_on_the_right_is_detected() {
        let mut app = create_test_app();
        // Face of the wall at x = 0.3, character edge at x = 0.25.
        spawn_box(&mut app, Vec2::new(0.8, 10.0), Vec2::new(0.5, 5.0));
        let character = spawn_character(
            &mut app,
            Vec2::new(0.0, 10.0),
            Vec2::NEG_Y,
            ControllerConfig::default(),
        );

        tick(&mut app);

        let controller = controller(&app, character);
        assert!(controller.contacts.wall_right);
        assert!(!controller.contacts.wall_left);
    }

    #[test]
    fn probes_follow_gravity() {
        let mut app = create_test_app();
        // Ceiling whose bottom surface is at y = 2.
        spawn_box(&mut app, Vec2::new(0.0, 2.5), Vec2::new(50.0, 0.5));
        let character = spawn_character(
            &mut app,
            Vec2::new(0.0, 1.48),
            Vec2::Y,
            ControllerConfig::default(),
        );

        tick(&mut app);

        assert!(controller(&app, character).is_grounded());
    }

    #[test]
    fn probes_respect_ground_layers() {
        let mut app = create_test_app();
        let floor = spawn_floor(&mut app);
        app.world_mut()
            .entity_mut(floor)
            .insert(CollisionGroups::new(Group::GROUP_1, Group::ALL));

        let layered = ControllerConfig::default().with_ground_layers(Group::GROUP_2.bits());
        let character = spawn_character(&mut app, Vec2::new(0.0, 0.52), Vec2::NEG_Y, layered);

        tick(&mut app);

        assert!(!controller(&app, character).is_grounded());
    }
}

mod world {
    use super::*;

    #[test]
    fn controller_gravity_reaches_rapier() {
        let mut app = create_test_app();
        spawn_character(
            &mut app,
            Vec2::new(0.0, 5.0),
            Vec2::X,
            ControllerConfig::default(),
        );

        tick(&mut app);

        let mut q = app.world_mut().query::<&RapierConfiguration>();
        let gravity: Vec<Vec2> = q.iter(app.world()).map(|c| c.gravity).collect();
        println!("PROOF: rapier gravity = {gravity:?}");
        assert!(!gravity.is_empty());
        assert!(gravity.iter().all(|g| (*g - Vec2::new(7.2, 0.0)).length() < 1e-5));
    }

    #[test]
    fn resting_character_records_floor_contact() {
        let mut app = create_test_app();
        let floor = spawn_floor(&mut app);
        // Slightly overlapping so the narrow phase reports a contact.
        let character = spawn_character(
            &mut app,
            Vec2::new(0.0, 0.49),
            Vec2::NEG_Y,
            ControllerConfig::default(),
        );

        tick(&mut app);
        tick(&mut app);

        let contacts = controller(&app, character).surface_contacts();
        println!("PROOF: surface contacts = {contacts:?}");
        let contact = contacts
            .iter()
            .find(|c| c.entity == floor)
            .expect("floor contact");
        assert!(contact.normal.y > 0.5);
        assert_eq!(controller(&app, character).attached_platform(), Some(floor));
    }
}
