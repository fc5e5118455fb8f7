//! Contact probing and classification.
//!
//! Every physics step the backend casts five short probes laid out in the
//! current axis frame: three ground probes along gravity and one wall probe
//! along each side of the right axis. [`ContactState::classify`] turns the
//! results into grounded and wall flags, with a grace window that keeps a wall
//! flag alive for a moment after its probe stops hitting.

use bevy::prelude::*;

use crate::axis::AxisFrame;
use crate::collision::CollisionData;
use crate::config::ControllerConfig;

/// Index of the left wall probe/flag.
pub const WALL_LEFT: usize = 0;
/// Index of the right wall probe/flag.
pub const WALL_RIGHT: usize = 1;

/// A single ray to cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub origin: Vec2,
    /// Unit direction of the cast.
    pub direction: Vec2,
    pub length: f32,
}

/// Probe rays for one physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeLayout {
    /// Center, left and right ground probes.
    pub ground: [Probe; 3],
    /// Left and right wall probes, indexed by [`WALL_LEFT`] and [`WALL_RIGHT`].
    pub walls: [Probe; 2],
    /// Collision layer bits the probes should hit.
    pub layers: u32,
}

impl ProbeLayout {
    /// Lay out the probes for a collider centered at `center`.
    ///
    /// `half_extents` are the world-space half extents of the collider bounds.
    /// They are projected onto the axis frame so the probes start at the
    /// collider's "feet" and "sides" for any gravity direction.
    pub fn new(
        center: Vec2,
        half_extents: Vec2,
        axes: AxisFrame,
        config: &ControllerConfig,
    ) -> Self {
        let up = axes.up();
        let right = axes.right();
        let extent_up = up.x.abs() * half_extents.x + up.y.abs() * half_extents.y;
        let extent_right = right.x.abs() * half_extents.x + right.y.abs() * half_extents.y;

        let feet = center - up * (extent_up - config.probe_inset);
        let spread = right * (extent_right * config.ground_probe_spread);
        let ground_probe = |origin: Vec2| Probe {
            origin,
            direction: axes.down(),
            length: config.ground_check_distance,
        };

        let side = (extent_right - config.probe_inset).max(0.0);
        let wall_probe = |direction: Vec2| Probe {
            origin: center + direction * side,
            direction,
            length: config.wall_check_distance,
        };

        Self {
            ground: [
                ground_probe(feet),
                ground_probe(feet - spread),
                ground_probe(feet + spread),
            ],
            walls: [wall_probe(-right), wall_probe(right)],
            layers: config.ground_layers,
        }
    }
}

/// Results of casting a [`ProbeLayout`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeHits {
    pub ground: [Option<CollisionData>; 3],
    pub walls: [Option<CollisionData>; 2],
}

impl ProbeHits {
    /// Whether any ground probe hit.
    pub fn any_ground(&self) -> bool {
        self.ground.iter().any(Option::is_some)
    }

    /// Closest ground hit, if any.
    pub fn closest_ground(&self) -> Option<CollisionData> {
        self.ground
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Whether the wall probe on `side` hit.
    pub fn wall(&self, side: usize) -> bool {
        self.walls[side].is_some()
    }
}

/// Change of the grounded flag produced by one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTransition {
    Unchanged,
    /// false -> true
    Landed,
    /// true -> false
    LeftGround,
}

impl ContactTransition {
    /// Whether the grounded flag changed.
    pub fn changed(self) -> bool {
        self != ContactTransition::Unchanged
    }
}

/// Grounded and wall contact flags of a controller.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactState {
    pub grounded: bool,
    pub wall_left: bool,
    pub wall_right: bool,
    /// Last physics time any ground probe hit.
    pub last_grounded_time: Option<f32>,
    /// Last physics time each wall probe hit, indexed by [`WALL_LEFT`] and [`WALL_RIGHT`].
    pub last_wall_contact_time: [Option<f32>; 2],
}

impl ContactState {
    /// Update the flags from this step's probe results.
    ///
    /// Ground beats wall: while grounded both wall flags and the wall contact
    /// memory are cleared, regardless of the grace window.
    pub fn classify(
        &mut self,
        hits: &ProbeHits,
        now: f32,
        config: &ControllerConfig,
    ) -> ContactTransition {
        let was_grounded = self.grounded;
        self.grounded = hits.any_ground();

        if self.grounded {
            self.last_grounded_time = Some(now);
            self.wall_left = false;
            self.wall_right = false;
            self.last_wall_contact_time = [None, None];
        } else {
            for side in [WALL_LEFT, WALL_RIGHT] {
                if hits.wall(side) {
                    self.last_wall_contact_time[side] = Some(now);
                }
            }
            let within_grace = |time: Option<f32>| {
                time.is_some_and(|t| t == now || now - t < config.wall_detach_grace)
            };
            self.wall_left = within_grace(self.last_wall_contact_time[WALL_LEFT]);
            self.wall_right = within_grace(self.last_wall_contact_time[WALL_RIGHT]);
        }

        match (was_grounded, self.grounded) {
            (false, true) => ContactTransition::Landed,
            (true, false) => ContactTransition::LeftGround,
            _ => ContactTransition::Unchanged,
        }
    }

    /// Time since the last grounded step (infinite if never grounded).
    pub fn time_since_grounded(&self, now: f32) -> f32 {
        self.last_grounded_time
            .map(|t| now - t)
            .unwrap_or(f32::INFINITY)
    }

    /// Whether either wall flag is set.
    pub fn touching_wall(&self) -> bool {
        self.wall_left || self.wall_right
    }

    /// Unit direction pointing away from the touched wall, along the right axis.
    ///
    /// Left wall wins when both are touched. Zero when no wall is touched.
    pub fn away_from_wall(&self, axes: &AxisFrame) -> Vec2 {
        if self.wall_left {
            axes.right()
        } else if self.wall_right {
            -axes.right()
        } else {
            Vec2::ZERO
        }
    }

    /// Whether `input` (a right-axis scalar) pushes into a touched wall.
    pub fn pushing_into_wall(&self, input: f32) -> bool {
        (self.wall_left && input < 0.0) || (self.wall_right && input > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(distance: f32) -> Option<CollisionData> {
        Some(CollisionData::new(distance, Vec2::Y, Vec2::ZERO, None))
    }

    fn ground_hits() -> ProbeHits {
        ProbeHits {
            ground: [hit(0.1), None, None],
            walls: [None, None],
        }
    }

    fn left_wall_hits() -> ProbeHits {
        ProbeHits {
            ground: [None; 3],
            walls: [hit(0.05), None],
        }
    }

    #[test]
    fn layout_for_default_gravity() {
        let config = ControllerConfig::default();
        let layout = ProbeLayout::new(
            Vec2::new(0.0, 1.0),
            Vec2::new(0.5, 1.0),
            AxisFrame::default(),
            &config,
        );

        let feet_y = 1.0 - (1.0 - config.probe_inset);
        assert!((layout.ground[0].origin - Vec2::new(0.0, feet_y)).length() < 1e-5);
        assert!((layout.ground[1].origin - Vec2::new(-0.35, feet_y)).length() < 1e-5);
        assert!((layout.ground[2].origin - Vec2::new(0.35, feet_y)).length() < 1e-5);
        for probe in layout.ground {
            assert_eq!(probe.direction, Vec2::NEG_Y);
            assert_eq!(probe.length, config.ground_check_distance);
        }

        let left = layout.walls[WALL_LEFT];
        assert!((left.origin - Vec2::new(-0.5 + config.probe_inset, 1.0)).length() < 1e-5);
        assert_eq!(left.direction, Vec2::NEG_X);
        assert_eq!(layout.walls[WALL_RIGHT].direction, Vec2::X);
    }

    #[test]
    fn layout_follows_gravity_direction() {
        let config = ControllerConfig::default();
        // Gravity toward +X: feet are on the +X side of a tall collider.
        let axes = AxisFrame::from_gravity(Vec2::X);
        let layout = ProbeLayout::new(Vec2::ZERO, Vec2::new(0.5, 1.0), axes, &config);

        assert!((layout.ground[0].origin.x - (0.5 - config.probe_inset)).abs() < 1e-5);
        assert!((layout.ground[0].direction - Vec2::X).length() < 1e-5);
        // The right axis is +Y, so the spread uses the vertical extent.
        assert!((layout.ground[2].origin.y - 0.7).abs() < 1e-5);
        assert!((layout.walls[WALL_RIGHT].direction - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn grounded_when_any_probe_hits() {
        let config = ControllerConfig::default();
        let mut contacts = ContactState::default();
        let hits = ProbeHits {
            ground: [None, None, hit(0.2)],
            walls: [None, None],
        };
        assert_eq!(contacts.classify(&hits, 0.0, &config), ContactTransition::Landed);
        assert!(contacts.grounded);
        assert_eq!(contacts.last_grounded_time, Some(0.0));
    }

    #[test]
    fn transitions_are_reported_once() {
        let config = ControllerConfig::default();
        let mut contacts = ContactState::default();
        assert_eq!(contacts.classify(&ground_hits(), 0.0, &config), ContactTransition::Landed);
        assert_eq!(contacts.classify(&ground_hits(), 0.1, &config), ContactTransition::Unchanged);
        assert_eq!(
            contacts.classify(&ProbeHits::default(), 0.2, &config),
            ContactTransition::LeftGround
        );
        assert_eq!(
            contacts.classify(&ProbeHits::default(), 0.3, &config),
            ContactTransition::Unchanged
        );
        assert_eq!(contacts.last_grounded_time, Some(0.1));
    }

    #[test]
    fn wall_flag_survives_grace_window() {
        let config = ControllerConfig::default();
        let mut contacts = ContactState::default();

        contacts.classify(&left_wall_hits(), 1.0, &config);
        assert!(contacts.wall_left);

        // Probe loses contact briefly (corner).
        contacts.classify(&ProbeHits::default(), 1.0 + config.wall_detach_grace * 0.5, &config);
        assert!(contacts.wall_left);

        contacts.classify(&ProbeHits::default(), 1.0 + config.wall_detach_grace * 1.5, &config);
        assert!(!contacts.wall_left);
    }

    #[test]
    fn ground_clears_wall_flags_and_memory() {
        let config = ControllerConfig::default();
        let mut contacts = ContactState::default();
        contacts.classify(&left_wall_hits(), 0.0, &config);
        assert!(contacts.wall_left);

        let both = ProbeHits {
            ground: [hit(0.1), None, None],
            walls: [hit(0.05), None],
        };
        contacts.classify(&both, 0.01, &config);
        assert!(!contacts.touching_wall());
        assert_eq!(contacts.last_wall_contact_time, [None, None]);

        // Leaving the ground right away must not resurrect the wall flag.
        contacts.classify(&ProbeHits::default(), 0.02, &config);
        assert!(!contacts.wall_left);
    }

    #[test]
    fn zero_grace_still_reports_current_hit() {
        let config = ControllerConfig {
            wall_detach_grace: 0.0,
            ..default()
        };
        let mut contacts = ContactState::default();
        contacts.classify(&left_wall_hits(), 0.5, &config);
        assert!(contacts.wall_left);
        contacts.classify(&ProbeHits::default(), 0.51, &config);
        assert!(!contacts.wall_left);
    }

    #[test]
    fn time_since_grounded_is_infinite_before_first_contact() {
        let contacts = ContactState::default();
        assert!(contacts.time_since_grounded(3.0).is_infinite());
    }

    #[test]
    fn wall_helpers() {
        let axes = AxisFrame::default();
        let contacts = ContactState {
            wall_right: true,
            ..default()
        };
        assert_eq!(contacts.away_from_wall(&axes), Vec2::NEG_X);
        assert!(contacts.pushing_into_wall(1.0));
        assert!(!contacts.pushing_into_wall(-1.0));
        assert_eq!(ContactState::default().away_from_wall(&axes), Vec2::ZERO);
    }

    #[test]
    fn closest_ground_hit() {
        let hits = ProbeHits {
            ground: [hit(0.3), hit(0.1), None],
            walls: [None, None],
        };
        assert_eq!(hits.closest_ground().map(|h| h.distance), Some(0.1));
    }
}
