//! Gravity-relative axis frame.
//!
//! All movement math works in the `(right, up)` basis derived from the current
//! gravity direction instead of world X/Y. The frame is a pure function of the
//! gravity direction and is recomputed whenever it is needed, so it can never
//! lag behind a gravity change.

use std::f32::consts;

use bevy::prelude::*;

/// Orthonormal `(right, up)` basis for a gravity direction.
///
/// `up` is the opposite of gravity and `right` is `up` rotated clockwise by a
/// quarter turn, i.e. `right = (-gravity.y, gravity.x)`.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct AxisFrame {
    right: Vec2,
    up: Vec2,
}

impl Default for AxisFrame {
    fn default() -> Self {
        Self::from_gravity(Vec2::NEG_Y)
    }
}

impl AxisFrame {
    /// Build the frame for a gravity direction.
    ///
    /// The direction is normalized. A zero-length direction falls back to
    /// world-down gravity.
    pub fn from_gravity(gravity_dir: Vec2) -> Self {
        let down = gravity_dir.try_normalize().unwrap_or(Vec2::NEG_Y);
        Self {
            right: Vec2::new(-down.y, down.x).normalize(),
            up: -down,
        }
    }

    /// The "right" axis (perpendicular to gravity).
    #[inline]
    pub fn right(&self) -> Vec2 {
        self.right
    }

    /// The "up" axis (opposite of gravity).
    #[inline]
    pub fn up(&self) -> Vec2 {
        self.up
    }

    /// The gravity direction this frame was built from.
    #[inline]
    pub fn down(&self) -> Vec2 {
        -self.up
    }

    /// Project a world-space vector into `(right, up)` components.
    pub fn to_local(&self, world_vec: Vec2) -> Vec2 {
        Vec2::new(world_vec.dot(self.right), world_vec.dot(self.up))
    }

    /// Convert `(right, up)` components back to world space.
    pub fn to_world(&self, local_vec: Vec2) -> Vec2 {
        self.right * local_vec.x + self.up * local_vec.y
    }

    /// Re-express a velocity on this frame's axes.
    ///
    /// `v' = dot(v, right) * right + dot(v, up) * up`. The speed is preserved
    /// while its axis-relative meaning follows the new frame.
    pub fn reproject(&self, velocity: Vec2) -> Vec2 {
        self.to_world(self.to_local(velocity))
    }

    /// Rotation (radians, counter-clockwise, in `[-PI, PI]`) that maps world +Y
    /// onto `up`.
    pub fn up_angle(&self) -> f32 {
        shortest_arc(0.0, self.up.to_angle() - consts::FRAC_PI_2)
    }

    /// Remap a raw horizontal input so that "right" on screen stays "right".
    ///
    /// When the frame is upside down relative to the screen the right axis
    /// points toward world -X, so the raw scalar is inverted.
    pub fn screen_relative_scalar(&self, raw: f32) -> f32 {
        if self.right.dot(Vec2::X) < -0.5 {
            -raw
        } else {
            raw
        }
    }
}

/// Shortest signed angular distance from `from` to `to`, in `[-PI, PI]`.
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    let mut delta = to - from;
    while delta > consts::PI {
        delta -= consts::TAU;
    }
    while delta < -consts::PI {
        delta += consts::TAU;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDINALS: [Vec2; 4] = [Vec2::NEG_Y, Vec2::Y, Vec2::NEG_X, Vec2::X];

    #[test]
    fn default_frame_is_world_aligned() {
        let frame = AxisFrame::default();
        assert_eq!(frame.up(), Vec2::Y);
        assert_eq!(frame.right(), Vec2::X);
        assert_eq!(frame.down(), Vec2::NEG_Y);
    }

    #[test]
    fn frames_are_orthonormal_for_cardinal_directions() {
        for gravity in CARDINALS {
            let frame = AxisFrame::from_gravity(gravity);
            assert!(frame.right().dot(gravity).abs() < 1e-6);
            assert_eq!(frame.up(), -gravity);
            assert!((frame.right().length() - 1.0).abs() < 1e-6);
            assert!((frame.up().length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn frames_are_orthonormal_for_arbitrary_directions() {
        for i in 0..32 {
            let angle = i as f32 * consts::TAU / 32.0;
            let gravity = Vec2::from_angle(angle);
            let frame = AxisFrame::from_gravity(gravity);
            assert!(frame.right().dot(frame.up()).abs() < 1e-5);
            assert!((frame.up() + gravity).length() < 1e-5);
            assert!((frame.right().length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn unnormalized_gravity_is_normalized() {
        let frame = AxisFrame::from_gravity(Vec2::new(0.0, -20.0));
        assert_eq!(frame.up(), Vec2::Y);
    }

    #[test]
    fn zero_gravity_falls_back_to_down() {
        assert_eq!(AxisFrame::from_gravity(Vec2::ZERO), AxisFrame::default());
    }

    #[test]
    fn gravity_right_rotates_right_axis() {
        // Gravity pointing +X: up is -X, right is +Y.
        let frame = AxisFrame::from_gravity(Vec2::X);
        assert!((frame.up() - Vec2::NEG_X).length() < 1e-6);
        assert!((frame.right() - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn local_world_roundtrip_preserves_vector() {
        let frame = AxisFrame::from_gravity(Vec2::new(0.3, -0.7));
        let v = Vec2::new(3.0, -4.5);
        assert!((frame.to_world(frame.to_local(v)) - v).length() < 1e-4);
        assert!((frame.reproject(v).length() - v.length()).abs() < 1e-4);
    }

    #[test]
    fn up_angle_matches_rotation() {
        let frame = AxisFrame::from_gravity(Vec2::X);
        let rotated = Vec2::from_angle(frame.up_angle()).rotate(Vec2::Y);
        assert!((rotated - frame.up()).length() < 1e-5);
        assert!((frame.up_angle() - consts::FRAC_PI_2).abs() < 1e-5);
        assert!(AxisFrame::default().up_angle().abs() < 1e-6);
    }

    #[test]
    fn screen_relative_input_inverts_only_when_upside_down() {
        assert_eq!(AxisFrame::from_gravity(Vec2::NEG_Y).screen_relative_scalar(1.0), 1.0);
        assert_eq!(AxisFrame::from_gravity(Vec2::Y).screen_relative_scalar(1.0), -1.0);
        assert_eq!(AxisFrame::from_gravity(Vec2::X).screen_relative_scalar(1.0), 1.0);
        assert_eq!(AxisFrame::from_gravity(Vec2::NEG_X).screen_relative_scalar(-1.0), -1.0);
    }

    #[test]
    fn shortest_arc_wraps() {
        assert!((shortest_arc(0.0, consts::FRAC_PI_2) - consts::FRAC_PI_2).abs() < 1e-6);
        assert!((shortest_arc(consts::PI * 0.9, -consts::PI * 0.9) - consts::PI * 0.2).abs() < 1e-5);
        assert!((shortest_arc(0.0, consts::TAU) - 0.0).abs() < 1e-5);
    }
}
