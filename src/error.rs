//! Error types.
//!
//! Runtime misuse (zero gravity requests, flips on cooldown, dashes while
//! dashing) is handled as a silent no-op by the controller. The errors here
//! cover structural problems that are detected once, when a controller is set
//! up, and configuration loading.

use bevy::prelude::*;
use thiserror::Error;

/// A controller entity that cannot be simulated.
#[derive(Debug, Error)]
pub enum ControllerSetupError {
    #[error("controller {entity} has no rigid body velocity component ({component})")]
    MissingVelocity {
        entity: Entity,
        component: &'static str,
    },
    #[error("controller {entity} has no GravityState component")]
    MissingGravityState { entity: Entity },
    #[error("controller {entity} has no ControllerConfig component")]
    MissingConfig { entity: Entity },
    #[error("controller {entity} has an invalid config: {source}")]
    InvalidConfig {
        entity: Entity,
        #[source]
        source: ConfigError,
    },
}

/// Errors produced while loading or validating a [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize: {0}")]
    Serialize(#[from] ron::Error),
}
