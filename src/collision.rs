//! Collision data handed from the physics backend to the controller.
//!
//! Backends translate their raycast and contact-manifold results into these
//! plain structures, so the controller logic never touches engine types.

use bevy::prelude::*;

/// Information about a single probe (raycast) hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance from the probe origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec2,
    /// World position of the hit point.
    pub point: Vec2,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec2, point: Vec2, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// A resolved contact between the character and another body.
///
/// Produced every physics step for each body the character is touching.
/// The normal points from the other body toward the character, so standing on
/// flat ground under downward gravity yields `Vec2::Y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContact {
    /// The other body.
    pub entity: Entity,
    /// Contact normal, pointing toward the character.
    pub normal: Vec2,
    /// Linear velocity of the other body (zero for static geometry).
    pub velocity: Vec2,
}

impl SurfaceContact {
    /// Create a contact record.
    pub fn new(entity: Entity, normal: Vec2, velocity: Vec2) -> Self {
        Self {
            entity,
            normal,
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_data_hit() {
        let cast = CollisionData::new(5.0, Vec2::Y, Vec2::new(10.0, 0.0), None);

        assert_eq!(cast.distance, 5.0);
        assert_eq!(cast.normal, Vec2::Y);
        assert_eq!(cast.point, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn collision_data_with_entity() {
        let entity = Entity::from_raw(42);
        let cast = CollisionData::new(3.0, Vec2::X, Vec2::ZERO, Some(entity));

        assert_eq!(cast.entity, Some(entity));
    }

    #[test]
    fn surface_contact_new() {
        let entity = Entity::from_raw(7);
        let contact = SurfaceContact::new(entity, Vec2::Y, Vec2::new(2.0, 0.0));
        assert_eq!(contact.entity, entity);
        assert_eq!(contact.velocity, Vec2::new(2.0, 0.0));
    }
}
