//! Particle emission and simulation
//!
//! Every emitter owns its particles, its emission clock and its burst
//! schedule. Emitters reference each other only by [`EmitterId`]; the
//! registry resolves those ids while it ticks.
//!
//! # Architecture
//!
//! - `AnimatableValue`: constant or computed attribute, evaluated per spawn
//! - `AttributeCurve`: optional lifetime/speed override for color, size, opacity
//! - `Particle`: position history, velocity, appearance and remaining life
//! - `ParticleEmitter`: runtime state and the fixed-order frame routine
//!
//! # Usage
//!
//! ```rust
//! use glam::Vec3;
//! use spark_sim::EmitterRegistry;
//!
//! let mut registry = EmitterRegistry::new();
//! let id = registry.create();
//! if let Some(emitter) = registry.resolve_mut(id) {
//!     emitter
//!         .set_emit_per_second(100.0)
//!         .set_start_life(2.0)
//!         .set_start_velocity(Vec3::new(0.0, 5.0, 0.0));
//! }
//!
//! for _ in 0..60 {
//!     registry.tick(1.0 / 60.0);
//! }
//!
//! let live = registry.resolve(id).map_or(0, |emitter| emitter.particle_count());
//! assert!(live >= 99);
//! ```

mod emission;
mod emitter;
mod particle;
mod value;

pub use emission::{Burst, EmissionClock};
pub use emitter::{
    BlendMode, Detached, EmitterId, EmitterLookup, PREWARM_LIMIT, PREWARM_STEP, ParticleEmitter,
};
pub use particle::{GRAVITY, Particle};
pub use value::{AnimatableValue, AttributeCurve, CurveDriver, Evaluator};
