//! Ability unlocks and timed power-ups.
//!
//! [`AbilityFlags`] is the capability set read by the motion integrator.
//! Collectibles change it through [`Modifier`]s, either permanently
//! ([`Modifier::Unlock`]) or for a limited time ([`Modifier::Timed`]). Timed
//! effects are cooperative tasks ticked once per frame; applying an effect
//! that is already running replaces it.
//!
//! Unlocks that should survive a level change are carried by an
//! [`AbilitySession`], which the application owns and passes to
//! [`AbilityFlags::from_session`] when spawning the next controller.

use std::collections::BTreeSet;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tasks::TimedTask;

/// Smallest multiplier a power-up may apply.
pub const MIN_MULTIPLIER: f32 = 0.01;

/// How many jumps are available while airborne.
///
/// Single and unlimited air jumps are mutually exclusive by construction.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AirJumpPolicy {
    #[default]
    Disabled,
    /// One air jump per airborne period, restored on landing.
    Single,
    /// One air jump per buffered press, without limit.
    Unlimited,
}

impl AirJumpPolicy {
    /// Whether an air jump may fire given the single-use flag.
    pub fn allows(self, has_used_air_jump: bool) -> bool {
        match self {
            AirJumpPolicy::Disabled => false,
            AirJumpPolicy::Single => !has_used_air_jump,
            AirJumpPolicy::Unlimited => true,
        }
    }

    /// Whether firing an air jump consumes the single-use flag.
    pub fn consumes(self) -> bool {
        self == AirJumpPolicy::Single
    }
}

/// A multiplier that decays back to 1.0 when its task completes.
#[derive(Reflect, Debug, Clone)]
pub struct TimedMultiplier {
    value: f32,
    task: TimedTask,
}

impl Default for TimedMultiplier {
    fn default() -> Self {
        Self {
            value: 1.0,
            task: TimedTask::idle(),
        }
    }
}

impl TimedMultiplier {
    /// Current multiplier.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Whether a boost is running.
    pub fn is_active(&self) -> bool {
        self.task.is_running()
    }

    /// Remaining boost time in seconds.
    pub fn remaining_secs(&self) -> f32 {
        self.task.remaining_secs()
    }

    /// Apply `factor` for `duration` seconds, replacing any running boost.
    pub fn apply(&mut self, factor: f32, duration: f32) {
        self.value = factor.max(MIN_MULTIPLIER);
        self.task.start(duration);
    }

    /// Cancel the running boost and reset to 1.0.
    pub fn cancel(&mut self) {
        self.task.cancel();
        self.value = 1.0;
    }

    /// Advance the boost. Returns `true` on the tick it expires.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let expired = self.task.tick(delta);
        if expired {
            self.value = 1.0;
        }
        expired
    }
}

/// Permanent capabilities.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ability {
    Dash,
    WallJump,
    DoubleJump,
    UnlimitedAirJumps,
    GravityFlip,
}

/// Effects that wear off.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum TimedEffect {
    SpeedBoost { factor: f32 },
    JumpBoost { factor: f32 },
    /// Gravity flips ignore their cooldown.
    UnlimitedGravity,
}

/// A capability change applied by a collectible.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Modifier {
    Unlock(Ability),
    Timed { effect: TimedEffect, duration: f32 },
}

impl Modifier {
    /// Apply the modifier.
    pub fn activate(&self, flags: &mut AbilityFlags) {
        match *self {
            Modifier::Unlock(ability) => flags.unlock(ability),
            Modifier::Timed { effect, duration } => match effect {
                TimedEffect::SpeedBoost { factor } => flags.apply_speed_multiplier(factor, duration),
                TimedEffect::JumpBoost { factor } => flags.apply_jump_multiplier(factor, duration),
                TimedEffect::UnlimitedGravity => flags.apply_unlimited_gravity(duration),
            },
        }
    }

    /// Undo the modifier: re-lock the ability or end the effect early.
    pub fn deactivate(&self, flags: &mut AbilityFlags) {
        match *self {
            Modifier::Unlock(ability) => flags.lock(ability),
            Modifier::Timed { effect, .. } => match effect {
                TimedEffect::SpeedBoost { .. } => flags.speed.cancel(),
                TimedEffect::JumpBoost { .. } => flags.jump.cancel(),
                TimedEffect::UnlimitedGravity => flags.unlimited_gravity.cancel(),
            },
        }
    }
}

/// Capabilities and power-up multipliers of a controller.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct AbilityFlags {
    pub can_dash: bool,
    pub can_wall_jump: bool,
    pub air_jumps: AirJumpPolicy,
    pub can_flip_gravity: bool,
    pub speed: TimedMultiplier,
    pub jump: TimedMultiplier,
    pub unlimited_gravity: TimedTask,
}

impl AbilityFlags {
    /// Every ability unlocked, no power-ups running.
    pub fn all() -> Self {
        Self {
            can_dash: true,
            can_wall_jump: true,
            air_jumps: AirJumpPolicy::Single,
            can_flip_gravity: true,
            ..default()
        }
    }

    /// Flags with the unlocks recorded in `session`.
    pub fn from_session(session: &AbilitySession) -> Self {
        let mut flags = Self::default();
        session.restore_into(&mut flags);
        flags
    }

    /// Current speed multiplier.
    pub fn speed_multiplier(&self) -> f32 {
        self.speed.value()
    }

    /// Current jump multiplier.
    pub fn jump_multiplier(&self) -> f32 {
        self.jump.value()
    }

    /// Whether gravity flips currently skip their cooldown.
    pub fn has_unlimited_gravity(&self) -> bool {
        self.unlimited_gravity.is_running()
    }

    pub fn apply_speed_multiplier(&mut self, factor: f32, duration: f32) {
        self.speed.apply(factor, duration);
    }

    pub fn apply_jump_multiplier(&mut self, factor: f32, duration: f32) {
        self.jump.apply(factor, duration);
    }

    pub fn apply_unlimited_gravity(&mut self, duration: f32) {
        self.unlimited_gravity.start(duration);
    }

    pub fn set_can_dash(&mut self, enabled: bool) {
        self.can_dash = enabled;
    }

    pub fn set_can_wall_jump(&mut self, enabled: bool) {
        self.can_wall_jump = enabled;
    }

    /// Enable the single air jump. Disabling also removes unlimited air jumps.
    pub fn set_can_double_jump(&mut self, enabled: bool) {
        self.air_jumps = if enabled {
            match self.air_jumps {
                AirJumpPolicy::Unlimited => AirJumpPolicy::Unlimited,
                _ => AirJumpPolicy::Single,
            }
        } else {
            AirJumpPolicy::Disabled
        };
    }

    pub fn set_can_flip_gravity(&mut self, enabled: bool) {
        self.can_flip_gravity = enabled;
    }

    /// Unlock a permanent ability.
    ///
    /// Unlimited air jumps supersede the single air jump; unlocking the
    /// single air jump afterwards keeps the unlimited policy.
    pub fn unlock(&mut self, ability: Ability) {
        match ability {
            Ability::Dash => self.can_dash = true,
            Ability::WallJump => self.can_wall_jump = true,
            Ability::DoubleJump => self.set_can_double_jump(true),
            Ability::UnlimitedAirJumps => self.air_jumps = AirJumpPolicy::Unlimited,
            Ability::GravityFlip => self.can_flip_gravity = true,
        }
    }

    /// Lock a permanent ability again.
    pub fn lock(&mut self, ability: Ability) {
        match ability {
            Ability::Dash => self.can_dash = false,
            Ability::WallJump => self.can_wall_jump = false,
            Ability::DoubleJump => self.air_jumps = AirJumpPolicy::Disabled,
            Ability::UnlimitedAirJumps => {
                if self.air_jumps == AirJumpPolicy::Unlimited {
                    self.air_jumps = AirJumpPolicy::Disabled;
                }
            }
            Ability::GravityFlip => self.can_flip_gravity = false,
        }
    }

    /// Whether a permanent ability is unlocked.
    pub fn is_unlocked(&self, ability: Ability) -> bool {
        match ability {
            Ability::Dash => self.can_dash,
            Ability::WallJump => self.can_wall_jump,
            Ability::DoubleJump => self.air_jumps != AirJumpPolicy::Disabled,
            Ability::UnlimitedAirJumps => self.air_jumps == AirJumpPolicy::Unlimited,
            Ability::GravityFlip => self.can_flip_gravity,
        }
    }

    /// Advance all timed effects by one frame and return those that expired.
    pub fn tick(&mut self, delta: Duration) -> Vec<TimedEffect> {
        let mut expired = Vec::new();
        if self.speed.tick(delta) {
            expired.push(TimedEffect::SpeedBoost { factor: 1.0 });
        }
        if self.jump.tick(delta) {
            expired.push(TimedEffect::JumpBoost { factor: 1.0 });
        }
        if self.unlimited_gravity.tick(delta) {
            expired.push(TimedEffect::UnlimitedGravity);
        }
        expired
    }

    /// Cancel every running effect.
    pub fn cancel_tasks(&mut self) {
        self.speed.cancel();
        self.jump.cancel();
        self.unlimited_gravity.cancel();
    }
}

/// Ability unlocks that persist across levels.
///
/// Owned by the application (typically as a resource). Call
/// [`record`](Self::record) before unloading a level and
/// [`AbilityFlags::from_session`] when spawning the player in the next one.
#[derive(Resource, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilitySession {
    unlocked: BTreeSet<Ability>,
}

impl AbilitySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unlock. Returns `true` if it was not unlocked before.
    pub fn unlock(&mut self, ability: Ability) -> bool {
        self.unlocked.insert(ability)
    }

    pub fn is_unlocked(&self, ability: Ability) -> bool {
        self.unlocked.contains(&ability)
    }

    /// Iterate over recorded unlocks.
    pub fn unlocked(&self) -> impl Iterator<Item = Ability> + '_ {
        self.unlocked.iter().copied()
    }

    /// Replace the recorded unlocks with those of `flags`.
    pub fn record(&mut self, flags: &AbilityFlags) {
        self.unlocked = [
            Ability::Dash,
            Ability::WallJump,
            Ability::DoubleJump,
            Ability::UnlimitedAirJumps,
            Ability::GravityFlip,
        ]
        .into_iter()
        .filter(|&ability| flags.is_unlocked(ability))
        .collect();
    }

    /// Unlock every recorded ability on `flags`.
    pub fn restore_into(&self, flags: &mut AbilityFlags) {
        for ability in self.unlocked() {
            flags.unlock(ability);
        }
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::to_string(self)?)
    }

    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }
}
