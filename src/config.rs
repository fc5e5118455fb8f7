//! Controller configuration.
//!
//! Every tunable of the movement model lives in [`ControllerConfig`]. Values
//! are in world units and seconds; the defaults are tuned for a character
//! roughly one unit tall.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration parameters for the gravity controller.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[serde(default)]
pub struct ControllerConfig {
    // === Contact probes ===
    /// Collision layer bits the probes test against.
    pub ground_layers: u32,

    /// Inset of the probe origins from the collider boundary.
    pub probe_inset: f32,

    /// Length of the three ground probes (cast along gravity).
    pub ground_check_distance: f32,

    /// Length of the two wall probes (cast along the right axis).
    pub wall_check_distance: f32,

    /// Fraction of the collider half width at which the side ground probes sit.
    pub ground_probe_spread: f32,

    /// How long a wall flag survives after its probe stops hitting (seconds).
    pub wall_detach_grace: f32,

    // === Movement ===
    /// Target horizontal speed at full input.
    pub move_speed: f32,

    /// Horizontal acceleration toward the target speed.
    pub acceleration: f32,

    /// Horizontal deceleration when there is no input.
    pub deceleration: f32,

    /// Fraction of acceleration/deceleration available while airborne (0.0-1.0).
    pub air_control: f32,

    /// Maximum horizontal speed while airborne.
    pub max_air_speed: f32,

    /// Invert horizontal input when gravity points toward the top of the screen.
    pub screen_relative_input: bool,

    // === Jump ===
    /// Upward speed set by a jump.
    pub jump_speed: f32,

    /// Grace window after leaving ground during which a ground jump is accepted.
    pub coyote_time: f32,

    /// How long an early jump press stays buffered.
    pub jump_buffer_time: f32,

    /// Gravity multiplier while rising with the jump button released.
    pub low_jump_gravity: f32,

    /// Gravity multiplier while falling.
    pub fall_gravity: f32,

    /// Rising speed is capped to `jump_speed * jump_cut_multiplier` on early release.
    pub jump_cut_multiplier: f32,

    /// Releases this soon after takeoff are ignored by the jump cut.
    pub jump_release_grace: f32,

    /// Threshold above which up-velocity counts as rising.
    pub rising_epsilon: f32,

    // === Walls ===
    /// Maximum speed along gravity while wall sliding.
    pub wall_slide_max_speed: f32,

    /// Only slide when the input pushes into the wall.
    pub require_input_into_wall: bool,

    /// Lateral speed of a wall jump (away from the wall).
    pub wall_jump_lateral: f32,

    /// Upward speed of a wall jump.
    pub wall_jump_vertical: f32,

    /// Horizontal input is ignored this long after a wall jump.
    pub wall_jump_lock_time: f32,

    /// A jump press must be at most this old to trigger a wall jump.
    pub wall_jump_input_window: f32,

    // === Dash ===
    /// Dash speed along the right axis.
    pub dash_speed: f32,

    /// Dash duration.
    pub dash_time: f32,

    /// Minimum time between dash starts.
    pub dash_cooldown: f32,

    // === Gravity ===
    /// Magnitude of the gravity acceleration.
    pub gravity_magnitude: f32,

    /// Minimum time between player-triggered gravity flips.
    pub flip_cooldown: f32,

    /// Duration of the visual reorientation after a gravity change.
    pub rotation_duration: f32,

    /// Rotate visuals (and cameras) smoothly toward the new "up".
    pub rotate_visuals_with_gravity: bool,

    // === Audio cue rate limits ===
    /// Minimum time between landing cues.
    pub land_sfx_cooldown: f32,

    /// Minimum time between wall-slide cues.
    pub slide_sfx_cooldown: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Contact probes
            ground_layers: u32::MAX,
            probe_inset: 0.03,
            ground_check_distance: 0.5,
            wall_check_distance: 0.22,
            ground_probe_spread: 0.7,
            wall_detach_grace: 0.06,

            // Movement
            move_speed: 8.0,
            acceleration: 60.0,
            deceleration: 70.0,
            air_control: 0.6,
            max_air_speed: 8.5,
            screen_relative_input: true,

            // Jump
            jump_speed: 12.0,
            coyote_time: 0.12,
            jump_buffer_time: 0.12,
            low_jump_gravity: 2.0,
            fall_gravity: 2.5,
            jump_cut_multiplier: 0.5,
            jump_release_grace: 0.02,
            rising_epsilon: 0.01,

            // Walls
            wall_slide_max_speed: 2.5,
            require_input_into_wall: true,
            wall_jump_lateral: 8.0,
            wall_jump_vertical: 12.0,
            wall_jump_lock_time: 0.12,
            wall_jump_input_window: 0.05,

            // Dash
            dash_speed: 18.0,
            dash_time: 0.18,
            dash_cooldown: 0.35,

            // Gravity
            gravity_magnitude: 7.2,
            flip_cooldown: 1.0,
            rotation_duration: 0.2,
            rotate_visuals_with_gravity: true,

            // Audio cues
            land_sfx_cooldown: 0.2,
            slide_sfx_cooldown: 0.25,
        }
    }
}

impl ControllerConfig {
    /// Create a config with snappier jumps and stronger gravity shaping.
    pub fn floaty_free() -> Self {
        Self {
            jump_speed: 13.5,
            coyote_time: 0.15,
            jump_buffer_time: 0.15,
            low_jump_gravity: 3.0,
            fall_gravity: 3.5,
            gravity_magnitude: 9.81,
            flip_cooldown: 0.8,
            ..default()
        }
    }

    /// Parse a config from RON. Missing fields take their default values.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to pretty RON.
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Check that every value is usable by the controller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("probe_inset", self.probe_inset),
            ("ground_check_distance", self.ground_check_distance),
            ("wall_check_distance", self.wall_check_distance),
            ("wall_detach_grace", self.wall_detach_grace),
            ("move_speed", self.move_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("max_air_speed", self.max_air_speed),
            ("jump_speed", self.jump_speed),
            ("coyote_time", self.coyote_time),
            ("jump_buffer_time", self.jump_buffer_time),
            ("jump_release_grace", self.jump_release_grace),
            ("wall_slide_max_speed", self.wall_slide_max_speed),
            ("wall_jump_lock_time", self.wall_jump_lock_time),
            ("wall_jump_input_window", self.wall_jump_input_window),
            ("dash_speed", self.dash_speed),
            ("dash_time", self.dash_time),
            ("dash_cooldown", self.dash_cooldown),
            ("gravity_magnitude", self.gravity_magnitude),
            ("flip_cooldown", self.flip_cooldown),
            ("rotation_duration", self.rotation_duration),
            ("land_sfx_cooldown", self.land_sfx_cooldown),
            ("slide_sfx_cooldown", self.slide_sfx_cooldown),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        let unit = [
            ("air_control", self.air_control),
            ("jump_cut_multiplier", self.jump_cut_multiplier),
            ("ground_probe_spread", self.ground_probe_spread),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        let multipliers = [
            ("low_jump_gravity", self.low_jump_gravity),
            ("fall_gravity", self.fall_gravity),
        ];
        for (field, value) in multipliers {
            if !value.is_finite() || value < 1.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        Ok(())
    }

    /// Builder: set movement parameters.
    pub fn with_movement(mut self, move_speed: f32, acceleration: f32, deceleration: f32) -> Self {
        self.move_speed = move_speed;
        self.acceleration = acceleration;
        self.deceleration = deceleration;
        self
    }

    /// Builder: set air control fraction.
    pub fn with_air_control(mut self, air_control: f32) -> Self {
        self.air_control = air_control;
        self
    }

    /// Builder: set jump speed.
    pub fn with_jump_speed(mut self, speed: f32) -> Self {
        self.jump_speed = speed;
        self
    }

    /// Builder: set coyote time.
    pub fn with_coyote_time(mut self, time: f32) -> Self {
        self.coyote_time = time;
        self
    }

    /// Builder: set jump buffer time.
    pub fn with_jump_buffer_time(mut self, time: f32) -> Self {
        self.jump_buffer_time = time;
        self
    }

    /// Builder: set the jump cut multiplier and the release grace window.
    pub fn with_jump_cut(mut self, multiplier: f32, release_grace: f32) -> Self {
        self.jump_cut_multiplier = multiplier;
        self.jump_release_grace = release_grace;
        self
    }

    /// Builder: set low-jump and fall gravity multipliers.
    pub fn with_gravity_shaping(mut self, low_jump: f32, fall: f32) -> Self {
        self.low_jump_gravity = low_jump;
        self.fall_gravity = fall;
        self
    }

    /// Builder: set wall slide speed cap.
    pub fn with_wall_slide_max_speed(mut self, speed: f32) -> Self {
        self.wall_slide_max_speed = speed;
        self
    }

    /// Builder: set dash parameters.
    pub fn with_dash(mut self, speed: f32, time: f32, cooldown: f32) -> Self {
        self.dash_speed = speed;
        self.dash_time = time;
        self.dash_cooldown = cooldown;
        self
    }

    /// Builder: set gravity magnitude.
    pub fn with_gravity_magnitude(mut self, magnitude: f32) -> Self {
        self.gravity_magnitude = magnitude;
        self
    }

    /// Builder: set gravity flip cooldown.
    pub fn with_flip_cooldown(mut self, cooldown: f32) -> Self {
        self.flip_cooldown = cooldown;
        self
    }

    /// Builder: set visual reorientation duration.
    pub fn with_rotation_duration(mut self, duration: f32) -> Self {
        self.rotation_duration = duration;
        self
    }

    /// Builder: set probe distances.
    pub fn with_probe_distances(mut self, ground: f32, wall: f32) -> Self {
        self.ground_check_distance = ground;
        self.wall_check_distance = wall;
        self
    }

    /// Builder: set the collision layers probes test against.
    pub fn with_ground_layers(mut self, layers: u32) -> Self {
        self.ground_layers = layers;
        self
    }

    /// Builder: require (or not) pushing into a wall to slide on it.
    pub fn with_require_input_into_wall(mut self, required: bool) -> Self {
        self.require_input_into_wall = required;
        self
    }

    /// Builder: enable or disable screen-relative horizontal input.
    pub fn with_screen_relative_input(mut self, enabled: bool) -> Self {
        self.screen_relative_input = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
        assert!(ControllerConfig::floaty_free().validate().is_ok());
    }

    #[test]
    fn negative_values_are_rejected() {
        let config = ControllerConfig::default().with_coyote_time(-0.1);
        match config.validate() {
            Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "coyote_time"),
            other => panic!("expected out of range error, got {other:?}"),
        }
    }

    #[test]
    fn air_control_must_be_a_fraction() {
        let config = ControllerConfig::default().with_air_control(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn gravity_multipliers_below_one_are_rejected() {
        let config = ControllerConfig::default().with_gravity_shaping(0.5, 2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn ron_missing_fields_use_defaults() {
        let config = ControllerConfig::from_ron("(move_speed: 10.0, dash_speed: 20.0)").unwrap();
        assert_eq!(config.move_speed, 10.0);
        assert_eq!(config.dash_speed, 20.0);
        assert_eq!(config.jump_speed, ControllerConfig::default().jump_speed);
    }

    #[test]
    fn ron_roundtrip_preserves_values() {
        let config = ControllerConfig::default().with_dash(25.0, 0.2, 0.5);
        let text = config.to_ron().unwrap();
        assert_eq!(ControllerConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn ron_parse_errors_are_reported() {
        assert!(matches!(
            ControllerConfig::from_ron("(move_speed: \"fast\")"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn ron_invalid_values_are_rejected() {
        assert!(matches!(
            ControllerConfig::from_ron("(dash_time: -1.0)"),
            Err(ConfigError::OutOfRange { field: "dash_time", .. })
        ));
    }

    #[test]
    fn builders_set_fields() {
        let config = ControllerConfig::default()
            .with_movement(10.0, 80.0, 90.0)
            .with_jump_cut(0.4, 0.03)
            .with_flip_cooldown(0.5);
        assert_eq!(config.move_speed, 10.0);
        assert_eq!(config.deceleration, 90.0);
        assert_eq!(config.jump_cut_multiplier, 0.4);
        assert_eq!(config.jump_release_grace, 0.03);
        assert_eq!(config.flip_cooldown, 0.5);
    }
}
