//! CPU particle simulation.
//!
//! Emitters spawn particles continuously and in scheduled bursts, integrate
//! them under gravity, and can fire other emitters whenever one of their
//! particles is born or dies. All emitters live in an [`EmitterRegistry`]
//! and are addressed through stable [`EmitterId`] handles.
//!
//! Emitter configurations can also be loaded from YAML or JSON documents
//! through the [`preset`] module (enabled by the default `presets` feature).

pub mod error;
pub mod particles;
#[cfg(feature = "presets")]
pub mod preset;
pub mod registry;

// Re-export common types
pub use error::{Result, SimError};
pub use particles::{
    AnimatableValue, BlendMode, Burst, EmitterId, EmitterLookup, Particle, ParticleEmitter,
};
#[cfg(feature = "presets")]
pub use preset::PresetDocument;
pub use registry::{EmitterRegistry, RegistryStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
