//! Platform attachment.
//!
//! A body the character stands on (contact normal opposing gravity) becomes
//! its attached platform. The platform's velocity is inherited during the
//! horizontal drive so the character rides along. The attachment ends when
//! the contact with that body is lost.

use bevy::prelude::*;

use crate::collision::SurfaceContact;

/// A contact counts as standing when `dot(normal, gravity)` is below this.
pub const STANDING_DOT: f32 = -0.6;

/// Attachment changes produced by one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformUpdate {
    pub detached: Option<Entity>,
    pub attached: Option<Entity>,
}

/// The platform a controller stands on, if any.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformAttachment {
    platform: Option<Entity>,
    velocity: Vec2,
}

impl PlatformAttachment {
    /// The attached platform.
    pub fn platform(&self) -> Option<Entity> {
        self.platform
    }

    /// Velocity inherited from the platform (zero when detached).
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Drop the inherited velocity until the next standing contact refreshes it.
    pub fn clear_velocity(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// Update from this step's contacts.
    pub fn update(&mut self, contacts: &[SurfaceContact], gravity_dir: Vec2) -> PlatformUpdate {
        let mut update = PlatformUpdate::default();
        let standing = contacts
            .iter()
            .find(|contact| contact.normal.dot(gravity_dir) < STANDING_DOT);

        match (standing, self.platform) {
            (Some(contact), current) => {
                if current != Some(contact.entity) {
                    update.detached = current;
                    update.attached = Some(contact.entity);
                    self.platform = Some(contact.entity);
                }
                self.velocity = contact.velocity;
            }
            (None, Some(current)) => {
                // Still touching the platform (e.g. on its edge): stay attached.
                match contacts.iter().find(|contact| contact.entity == current) {
                    Some(contact) => self.velocity = contact.velocity,
                    None => update.detached = self.detach(),
                }
            }
            (None, None) => self.velocity = Vec2::ZERO,
        }
        update
    }

    /// Detach from the current platform.
    pub fn detach(&mut self) -> Option<Entity> {
        self.velocity = Vec2::ZERO;
        self.platform.take()
    }
}
