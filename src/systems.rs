//! Core controller systems.
//!
//! The physics-step systems run in `FixedUpdate` and are generic over the
//! physics backend. The frame systems run in `Update` and drive everything
//! that advances with rendered frames: gravity requests and reorientation,
//! power-up decay, facing, the state machine and visuals.

use bevy::prelude::*;

use crate::abilities::{AbilityFlags, AbilitySession, Modifier};
use crate::axis::AxisFrame;
use crate::backend::CharacterPhysicsBackend;
use crate::config::ControllerConfig;
use crate::contacts::{ContactTransition, ProbeLayout};
use crate::controller::CharacterController;
use crate::error::ControllerSetupError;
use crate::events::{
    ApplyModifier, AttachedToPlatform, AudioCue, CueKind, DetachedFromPlatform, GroundedChanged,
    JumpPerformed, RequestGravityVector, StateChanged, VelocityChanged,
};
use crate::gravity::{FlipOutcome, GravityState, GravityVisual};
use crate::intent::MovementIntent;
use crate::motion::{StepEnv, StepInput};
use crate::state::{Airborne, Grounded, PlayerStateMachine, WallSliding};

/// Hotkey directions closer than this (dot product) to the current gravity
/// count as the current direction.
const SAME_DIRECTION_DOT: f32 = 0.9999;

// === Physics step ===

/// Advance the physics clock, lay out the probes and consume this step's
/// input.
///
/// Probes are placed from the backend's body position and collider extents
/// along the current axis frame. Latched jump presses are stamped with the new
/// clock time and the raw horizontal input is resolved against the axis frame.
pub fn prepare_step<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let mut q_layout = world
        .query_filtered::<(Entity, &ControllerConfig, &GravityState), With<CharacterController>>();
    let layouts: Vec<(Entity, ProbeLayout)> = q_layout
        .iter(world)
        .map(|(entity, config, gravity)| {
            let layout = ProbeLayout::new(
                B::get_position(world, entity),
                B::get_half_extents(world, entity),
                gravity.axes(),
                config,
            );
            (entity, layout)
        })
        .collect();

    for (entity, layout) in layouts {
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.set_probe_layout(layout);
        }
    }

    let mut q = world.query::<(
        &mut CharacterController,
        &ControllerConfig,
        &GravityState,
        Option<&mut MovementIntent>,
    )>();

    for (mut controller, config, gravity, intent) in q.iter_mut(world) {
        controller.advance_clock(dt);

        let raw = match intent {
            Some(mut intent) => {
                if intent.take_jump_press() {
                    controller.press_jump();
                }
                intent.walk
            }
            None => 0.0,
        };
        controller.resolve_input(raw, &gravity.axes(), config);
    }
}

/// Classify the probe hits written by the backend and update the platform
/// attachment.
pub fn update_contacts(
    mut q_controllers: Query<(
        Entity,
        &mut CharacterController,
        &ControllerConfig,
        &GravityState,
    )>,
    mut grounded_events: EventWriter<GroundedChanged>,
    mut attached_events: EventWriter<AttachedToPlatform>,
    mut detached_events: EventWriter<DetachedFromPlatform>,
    mut cues: EventWriter<AudioCue>,
) {
    for (entity, mut controller, config, gravity) in &mut q_controllers {
        let update = controller.update_contacts(config);

        if update.transition.changed() {
            let grounded = update.transition == ContactTransition::Landed;
            if grounded {
                debug!("{entity} landed at t={:.3}", controller.clock);
            }
            grounded_events.write(GroundedChanged { entity, grounded });
        }
        if update.land_cue {
            cues.write(AudioCue {
                entity,
                kind: CueKind::Land,
            });
        }

        let platform = controller.update_platform(gravity.direction());
        if let Some(old) = platform.detached {
            debug!("{entity} detached from platform {old}");
            detached_events.write(DetachedFromPlatform {
                entity,
                platform: old,
            });
        }
        if let Some(new) = platform.attached {
            debug!("{entity} attached to platform {new}");
            attached_events.write(AttachedToPlatform {
                entity,
                platform: new,
            });
        }
    }
}

/// Run the motion integrator for every controller and write the result back
/// through the backend.
pub fn apply_motion<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    // Collect everything the integrator reads so the world is free for the
    // backend calls below.
    let entities: Vec<(Entity, ControllerConfig, AbilityFlags, AxisFrame, f32, StepInput)> = world
        .query::<(
            Entity,
            &CharacterController,
            &ControllerConfig,
            &GravityState,
            Option<&AbilityFlags>,
            Option<&mut MovementIntent>,
        )>()
        .iter_mut(world)
        .map(|(e, controller, config, gravity, abilities, intent)| {
            let (jump_held, dash_pressed) = match intent {
                Some(mut intent) => (intent.is_jump_pressed(), intent.take_dash_press()),
                None => (false, false),
            };
            let input = StepInput {
                move_input: controller.move_input(),
                jump_held,
                dash_pressed,
            };
            (
                e,
                *config,
                abilities.cloned().unwrap_or_default(),
                gravity.axes(),
                gravity.magnitude,
                input,
            )
        })
        .collect();

    for (entity, config, abilities, axes, gravity_magnitude, input) in entities {
        let velocity = B::get_velocity(world, entity);
        let env = StepEnv {
            axes,
            gravity_magnitude,
            dt,
            config: &config,
            abilities: &abilities,
        };

        let (outcome, velocity_changed) = {
            let Some(mut controller) = world.get_mut::<CharacterController>(entity) else {
                continue;
            };
            let outcome = controller.integrate(velocity, input, &env);
            let changed = controller.report_velocity(outcome.velocity);
            (outcome, changed)
        };

        B::set_velocity(world, entity, outcome.velocity);

        if outcome.dash_started {
            debug!("{entity} dashing");
        }
        if let Some((kind, velocity)) = outcome.jump {
            debug!("{entity} {kind:?} jump, velocity {velocity}");
            world.send_event(JumpPerformed {
                entity,
                velocity,
                kind,
            });
        }
        for kind in outcome.cues {
            world.send_event(AudioCue { entity, kind });
        }
        if velocity_changed {
            world.send_event(VelocityChanged {
                entity,
                velocity: outcome.velocity,
            });
        }
    }
}

/// Sync state marker components based on the controller's contacts.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&WallSliding>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, wall_sliding) in &q_controllers {
        let grounded = controller.is_grounded();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        if controller.is_wall_sliding() {
            let side = if controller.contacts.wall_left { -1.0 } else { 1.0 };
            if wall_sliding.is_none_or(|current| current.side != side) {
                commands.entity(entity).insert(WallSliding { side });
            }
        } else if wall_sliding.is_some() {
            commands.entity(entity).remove::<WallSliding>();
        }
    }
}

// === Frame ===

/// Reject controllers that cannot be simulated.
pub fn validate_controllers<B: CharacterPhysicsBackend>(
    q_added: Query<
        (
            Entity,
            Has<B::VelocityComponent>,
            Has<GravityState>,
            Option<&ControllerConfig>,
        ),
        Added<CharacterController>,
    >,
) -> Result {
    for (entity, has_velocity, has_gravity, config) in &q_added {
        if !has_velocity {
            return Err(ControllerSetupError::MissingVelocity {
                entity,
                component: std::any::type_name::<B::VelocityComponent>(),
            }
            .into());
        }
        if !has_gravity {
            return Err(ControllerSetupError::MissingGravityState { entity }.into());
        }
        let Some(config) = config else {
            return Err(ControllerSetupError::MissingConfig { entity }.into());
        };
        config
            .validate()
            .map_err(|source| ControllerSetupError::InvalidConfig { entity, source })?;
    }
    Ok(())
}

/// Apply gravity hotkeys latched on the intent and `RequestGravityVector`
/// commands.
pub fn handle_gravity_requests(
    mut q_controllers: Query<(
        Entity,
        &mut GravityState,
        &ControllerConfig,
        Option<&AbilityFlags>,
        Option<&mut MovementIntent>,
    )>,
    mut requests: EventReader<RequestGravityVector>,
) {
    let locked = AbilityFlags::default();

    for (entity, mut gravity, config, abilities, intent) in &mut q_controllers {
        let Some(requested) = intent.and_then(|mut intent| intent.take_gravity_request()) else {
            continue;
        };
        if requested
            .try_normalize()
            .is_some_and(|dir| dir.dot(gravity.direction()) > SAME_DIRECTION_DOT)
        {
            continue;
        }
        match gravity.request_flip(requested, abilities.unwrap_or(&locked), config) {
            FlipOutcome::Applied { .. } => {
                debug!("{entity} gravity flipped to {}", gravity.direction());
            }
            FlipOutcome::Rejected(reason) => {
                debug!("{entity} gravity flip to {requested} rejected: {reason:?}");
            }
        }
    }

    for request in requests.read() {
        let Ok((entity, mut gravity, ..)) = q_controllers.get_mut(request.entity) else {
            warn!(
                "RequestGravityVector targets {} which has no gravity controller",
                request.entity
            );
            continue;
        };
        if gravity
            .request_vector(request.direction, request.duration)
            .is_applied()
        {
            debug!("{entity} gravity set to {}", gravity.direction());
        }
    }
}

/// Push gravity changes to the physics world, advance reorientations and
/// tick flip cooldowns.
///
/// Velocity is reprojected onto the new axes when a direction change is
/// synced and again when its reorientation completes.
pub fn advance_gravity<B: CharacterPhysicsBackend>(world: &mut World) {
    let delta = world
        .get_resource::<Time>()
        .map(|t| t.delta())
        .unwrap_or_default();

    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<GravityState>, With<CharacterController>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let (synced, finished, acceleration, axes) = {
            let Some(mut gravity) = world.get_mut::<GravityState>(entity) else {
                continue;
            };
            let synced = gravity.take_pending_sync();
            let finished = gravity.advance_reorientation(delta.as_secs_f32());
            gravity.tick_cooldown(delta);
            (synced, finished, gravity.acceleration(), gravity.axes())
        };

        if synced {
            B::set_global_gravity(world, acceleration);
        }
        if synced || finished {
            let velocity = B::get_velocity(world, entity);
            B::set_velocity(world, entity, axes.reproject(velocity));
        }
    }
}

/// Apply ability unlocks and power-ups from `ApplyModifier` commands.
///
/// Unlocks are recorded into the [`AbilitySession`] resource when present.
pub fn apply_modifiers(
    mut q_abilities: Query<&mut AbilityFlags>,
    mut modifiers: EventReader<ApplyModifier>,
    mut session: Option<ResMut<AbilitySession>>,
) {
    for command in modifiers.read() {
        let Ok(mut flags) = q_abilities.get_mut(command.entity) else {
            warn!(
                "ApplyModifier targets {} which has no AbilityFlags",
                command.entity
            );
            continue;
        };
        command.modifier.activate(&mut flags);
        if let Modifier::Unlock(ability) = command.modifier {
            info!("{} unlocked {ability:?}", command.entity);
            if let Some(session) = session.as_mut() {
                session.record(&flags);
            }
        }
    }
}

/// Decay timed power-ups.
pub fn tick_power_ups(time: Res<Time>, mut q_abilities: Query<(Entity, &mut AbilityFlags)>) {
    for (entity, mut flags) in &mut q_abilities {
        for effect in flags.tick(time.delta()) {
            debug!("{entity} power-up expired: {effect:?}");
        }
    }
}

/// Update the facing sign from the latest input.
pub fn update_facing(
    mut q_controllers: Query<(
        &mut CharacterController,
        &ControllerConfig,
        &GravityState,
        Option<&MovementIntent>,
    )>,
) {
    for (mut controller, config, gravity, intent) in &mut q_controllers {
        let raw = intent.map_or(0.0, |intent| intent.walk);
        controller.resolve_input(raw, &gravity.axes(), config);
        controller.update_facing();
    }
}

/// Evaluate the animation state machine once per frame.
pub fn update_state_machine<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, bool, bool, AxisFrame)> = world
        .query_filtered::<(Entity, &CharacterController, &GravityState), With<PlayerStateMachine>>()
        .iter(world)
        .map(|(e, controller, gravity)| {
            (
                e,
                controller.is_grounded(),
                controller.is_wall_sliding(),
                gravity.axes(),
            )
        })
        .collect();

    for (entity, grounded, wall_sliding, axes) in entities {
        let local = axes.to_local(B::get_velocity(world, entity));
        let change = {
            let Some(mut machine) = world.get_mut::<PlayerStateMachine>(entity) else {
                continue;
            };
            machine.tick(grounded, wall_sliding, local.y, local.x.abs())
        };
        if let Some((previous, next)) = change {
            world.send_event(StateChanged {
                entity,
                previous,
                next,
            });
        }
    }
}

/// Rotate (and mirror) visual entities with their controller.
pub fn sync_visuals(
    mut q_visuals: Query<(&GravityVisual, &mut Transform)>,
    q_controllers: Query<(&GravityState, Option<&CharacterController>)>,
) {
    for (visual, mut transform) in &mut q_visuals {
        let Ok((gravity, controller)) = q_controllers.get(visual.controller) else {
            continue;
        };
        transform.rotation = Quat::from_rotation_z(gravity.visual_angle());
        if visual.mirror_facing {
            if let Some(controller) = controller {
                transform.scale.x = transform.scale.x.abs() * controller.facing();
            }
        }
    }
}

/// Cancel every in-flight task when the controller is removed from an
/// entity that stays alive.
pub fn cancel_tasks_on_remove(
    trigger: Trigger<OnRemove, CharacterController>,
    mut q: Query<(
        Option<&mut CharacterController>,
        Option<&mut GravityState>,
        Option<&mut AbilityFlags>,
    )>,
) {
    let Ok((controller, gravity, abilities)) = q.get_mut(trigger.target()) else {
        return;
    };
    if let Some(mut controller) = controller {
        controller.cancel_tasks();
    }
    if let Some(mut gravity) = gravity {
        gravity.cancel_tasks();
    }
    if let Some(mut abilities) = abilities {
        abilities.cancel_tasks();
    }
}
