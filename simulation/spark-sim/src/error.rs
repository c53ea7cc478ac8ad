use thiserror::Error;

use crate::particles::EmitterId;

/// Error types for emitter configuration and preset loading
///
/// Nothing on the per-frame simulation path returns these. They surface from
/// validation and from the preset loader only.
#[derive(Error, Debug)]
pub enum SimError {
    /// I/O error while reading a preset document
    #[cfg(feature = "presets")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON preset document
    #[cfg(feature = "presets")]
    #[error("JSON preset error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed YAML preset document
    #[cfg(feature = "presets")]
    #[error("YAML preset error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Preset file extension is neither JSON nor YAML
    #[error("Unsupported preset format: {0}")]
    UnsupportedFormat(String),

    /// A preset references an emitter name that is not defined
    #[error("Unknown preset emitter '{0}'")]
    UnknownPreset(String),

    /// Two emitters in one preset document share a name
    #[error("Duplicate preset emitter '{0}'")]
    DuplicatePreset(String),

    /// The emitter id does not resolve to a live emitter
    #[error("Emitter {0} not found")]
    EmitterNotFound(EmitterId),

    /// Constant emission rate is negative or not finite
    #[error("Emitter {id}: invalid emission rate {rate} (must be finite and >= 0)")]
    InvalidEmissionRate { id: EmitterId, rate: f32 },

    /// Duration is negative or not finite, or zero on a looping emitter
    #[error("Emitter {id}: invalid duration {duration}")]
    InvalidDuration { id: EmitterId, duration: f32 },

    /// Burst scheduled outside of the emitter cycle
    #[error("Emitter {id}: burst at {time}s lies outside the cycle [0, {duration}]")]
    InvalidBurst { id: EmitterId, time: f32, duration: f32 },

    /// Sub-emitter list points at an emitter that does not exist
    #[error("Emitter {id}: sub-emitter {target} does not exist")]
    DanglingSubEmitter { id: EmitterId, target: EmitterId },
}

/// Result type using SimError
pub type Result<T> = std::result::Result<T, SimError>;
