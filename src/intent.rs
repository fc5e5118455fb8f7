//! Movement intent component.
//!
//! The intent is the only input surface of the controller. Your code samples
//! keyboard, gamepad or AI state and writes it here; the controller systems
//! read it. Button presses are edge-triggered: a press is latched when the
//! button goes from released to pressed and is consumed exactly once.

use bevy::prelude::*;

/// Desired movement of a controlled character.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use gravity_platformer_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_walk(1.0);
/// intent.set_jump_pressed(true);
/// assert!(intent.is_walking());
/// assert!(intent.has_jump_press());
///
/// // Holding the button does not create a second press.
/// intent.set_jump_pressed(true);
/// assert!(intent.take_jump_press());
/// assert!(!intent.take_jump_press());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Raw horizontal input (-1.0 = left, 1.0 = right), before any
    /// screen-relative remapping.
    pub walk: f32,
    /// Whether the jump button is currently held.
    pub jump_pressed: bool,
    /// Jump press latched on the false -> true edge of `jump_pressed`.
    pub(crate) jump_edge: bool,
    /// Dash press waiting to be consumed.
    pub(crate) dash_edge: bool,
    /// Gravity direction requested from a hotkey, waiting to be consumed.
    pub(crate) gravity_request: Option<Vec2>,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the horizontal input (-1.0 = left, 1.0 = right).
    pub fn set_walk(&mut self, direction: f32) {
        self.walk = direction.clamp(-1.0, 1.0);
    }

    /// Clear the horizontal input.
    pub fn clear_walk(&mut self) {
        self.walk = 0.0;
    }

    /// Check if there is active horizontal input.
    pub fn is_walking(&self) -> bool {
        self.walk.abs() > 0.001
    }

    /// Set the held state of the jump button.
    ///
    /// Call this every frame with the current button state. A new press is
    /// latched only when the state changes from released to pressed.
    ///
    /// ```rust,ignore
    /// intent.set_jump_pressed(keyboard.pressed(KeyCode::Space));
    /// ```
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if pressed && !self.jump_pressed {
            self.jump_edge = true;
        }
        self.jump_pressed = pressed;
    }

    /// Check if the jump button is held.
    pub fn is_jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Check if a jump press is waiting to be consumed.
    pub fn has_jump_press(&self) -> bool {
        self.jump_edge
    }

    /// Consume the latched jump press.
    pub fn take_jump_press(&mut self) -> bool {
        std::mem::take(&mut self.jump_edge)
    }

    /// Latch a dash press. Call this on the frame the dash button goes down.
    pub fn press_dash(&mut self) {
        self.dash_edge = true;
    }

    /// Consume the latched dash press.
    pub fn take_dash_press(&mut self) -> bool {
        std::mem::take(&mut self.dash_edge)
    }

    /// Latch a gravity flip toward `direction`.
    ///
    /// Call this on the frame a gravity hotkey goes down. Only the most
    /// recent request of a frame is kept.
    pub fn press_gravity(&mut self, direction: Vec2) {
        self.gravity_request = Some(direction);
    }

    /// Consume the latched gravity request.
    pub fn take_gravity_request(&mut self) -> Option<Vec2> {
        self.gravity_request.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_intent_new() {
        let intent = MovementIntent::new();
        assert_eq!(intent.walk, 0.0);
        assert!(!intent.jump_pressed);
        assert!(!intent.has_jump_press());
        assert!(intent.gravity_request.is_none());
    }

    #[test]
    fn movement_intent_set_walk_clamps() {
        let mut intent = MovementIntent::new();
        intent.set_walk(0.5);
        assert_eq!(intent.walk, 0.5);

        intent.set_walk(5.0);
        assert_eq!(intent.walk, 1.0);

        intent.set_walk(-5.0);
        assert_eq!(intent.walk, -1.0);

        intent.clear_walk();
        assert!(!intent.is_walking());
    }

    #[test]
    fn jump_press_latches_on_rising_edge_only() {
        let mut intent = MovementIntent::new();
        intent.set_jump_pressed(true);
        assert!(intent.take_jump_press());

        // Still held: no new press.
        intent.set_jump_pressed(true);
        assert!(!intent.take_jump_press());

        // Release and press again.
        intent.set_jump_pressed(false);
        assert!(!intent.has_jump_press());
        intent.set_jump_pressed(true);
        assert!(intent.take_jump_press());
    }

    #[test]
    fn jump_press_survives_release_until_consumed() {
        let mut intent = MovementIntent::new();
        intent.set_jump_pressed(true);
        intent.set_jump_pressed(false);
        assert!(!intent.is_jump_pressed());
        assert!(intent.take_jump_press());
    }

    #[test]
    fn dash_press_is_consumed_once() {
        let mut intent = MovementIntent::new();
        intent.press_dash();
        assert!(intent.take_dash_press());
        assert!(!intent.take_dash_press());
    }

    #[test]
    fn gravity_request_keeps_latest() {
        let mut intent = MovementIntent::new();
        intent.press_gravity(Vec2::X);
        intent.press_gravity(Vec2::Y);
        assert_eq!(intent.take_gravity_request(), Some(Vec2::Y));
        assert_eq!(intent.take_gravity_request(), None);
    }
}
