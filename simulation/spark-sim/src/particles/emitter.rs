//! Particle emitter runtime state

use std::fmt;

use glam::Vec3;
use log::{debug, trace, warn};

use super::emission::{Burst, EmissionClock};
use super::particle::Particle;
use super::value::{AnimatableValue, AttributeCurve};
use crate::error::{Result, SimError};

/// Fixed step used to prewarm a looping emitter (60 Hz)
pub const PREWARM_STEP: f32 = 1.0 / 60.0;

/// Longest span of simulated time a prewarm covers, in seconds
pub const PREWARM_LIMIT: f32 = 600.0;

/// Stable handle to an emitter owned by an [`EmitterRegistry`](crate::EmitterRegistry)
///
/// Ids are issued in increasing order and never reused, so a stale id simply
/// stops resolving once its emitter is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmitterId(u64);

impl EmitterId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Blending mode hint for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Alpha blending (src * alpha + dst * (1-alpha))
    #[default]
    AlphaBlend,
    /// Additive blending (src * alpha + dst)
    Additive,
}

/// Resolves sub-emitter ids to live emitters during an update
///
/// The registry hands each emitter a view over every *other* emitter; an
/// emitter that lists itself as a sub-emitter is served directly.
pub trait EmitterLookup {
    fn resolve_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter>;
}

/// Lookup for an emitter updated outside of any registry
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl EmitterLookup for Detached {
    fn resolve_mut(&mut self, _id: EmitterId) -> Option<&mut ParticleEmitter> {
        None
    }
}

/// Where a triggered burst originates: the dying particle's state
#[derive(Debug, Clone, Copy, PartialEq)]
struct TriggerOrigin {
    position: Vec3,
    velocity: Vec3,
}

/// Runtime particle emitter
///
/// Created through [`EmitterRegistry::create`](crate::EmitterRegistry::create)
/// and configured with the chainable `set_*` methods.
#[derive(Debug)]
pub struct ParticleEmitter {
    /// Registry-issued handle
    id: EmitterId,
    /// Human-readable label (preset name, diagnostics)
    label: String,
    /// Whether the first-update setup has run
    initialized: bool,
    /// World-space origin
    position: Vec3,
    /// Emission direction
    direction: Vec3,
    /// Spawn position, evaluated against position/direction
    start_position: AnimatableValue<Vec3>,
    /// Spawn velocity
    start_velocity: AnimatableValue<Vec3>,
    /// Spawn color (RGB)
    start_color: AnimatableValue<Vec3>,
    /// Spawn size
    start_size: AnimatableValue<f32>,
    /// Spawn opacity
    start_opacity: AnimatableValue<f32>,
    /// Continuous emission rate (particles per second)
    emit_per_second: AnimatableValue<f32>,
    /// Particle lifetime in seconds
    start_life: AnimatableValue<f32>,
    color_curve: AttributeCurve<Vec3>,
    size_curve: AttributeCurve<f32>,
    opacity_curve: AttributeCurve<f32>,
    /// Scheduled bursts, in configuration order
    bursts: Vec<Burst>,
    /// Fired (forced bursts) before every continuous spawn
    birth_sub_emitters: Vec<EmitterId>,
    /// Fired at the position of every particle that dies
    death_sub_emitters: Vec<EmitterId>,
    /// Cycle length in seconds
    duration: f32,
    /// Seconds left in the current cycle
    remaining_life: f32,
    looping: bool,
    prewarm: bool,
    /// Copied into each particle's gravity scale at spawn
    gravity_multiplier: f32,
    /// Hard cap on live particles
    max_particles: usize,
    /// Only fires when triggered by another emitter
    child: bool,
    blend_mode: BlendMode,
    /// Draw particles as quads stretched along their velocity
    stretched: bool,
    /// Tail length in steps travelled, used when `stretched` is set
    stretch_factor: f32,
    /// Share of the dying particle's velocity added to triggered spawns
    inherit_velocity: f32,
    /// Continuous emission accumulator
    clock: EmissionClock,
    /// Particles spawned since creation
    emitted_total: u64,
    particles: Vec<Particle>,
    /// Scratch buffer for particles retired this frame
    fallen: Vec<TriggerOrigin>,
}

impl ParticleEmitter {
    pub(crate) fn new(id: EmitterId) -> Self {
        let duration = 5.0;
        Self {
            id,
            label: String::new(),
            initialized: false,
            position: Vec3::ZERO,
            direction: Vec3::Y,
            start_position: AnimatableValue::computed(|_, origin, _| origin),
            start_velocity: AnimatableValue::computed(|_, _, direction| direction),
            start_color: AnimatableValue::Constant(Vec3::ONE),
            start_size: AnimatableValue::Constant(1.0),
            start_opacity: AnimatableValue::Constant(1.0),
            emit_per_second: AnimatableValue::Constant(10.0),
            start_life: AnimatableValue::Constant(1.0),
            color_curve: AttributeCurve::new(),
            size_curve: AttributeCurve::new(),
            opacity_curve: AttributeCurve::new(),
            bursts: Vec::new(),
            birth_sub_emitters: Vec::new(),
            death_sub_emitters: Vec::new(),
            duration,
            remaining_life: duration,
            looping: true,
            prewarm: false,
            gravity_multiplier: 1.0,
            max_particles: 1000,
            child: false,
            blend_mode: BlendMode::AlphaBlend,
            stretched: false,
            stretch_factor: 1.0,
            inherit_velocity: 0.0,
            clock: EmissionClock::new(),
            emitted_total: 0,
            particles: Vec::new(),
            fallen: Vec::new(),
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds left in the current cycle (negative once a one-shot emitter expired)
    pub fn remaining_life(&self) -> f32 {
        self.remaining_life
    }

    /// Time elapsed in the current cycle
    #[inline]
    pub fn cycle_time(&self) -> f32 {
        self.duration - self.remaining_life
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn prewarm(&self) -> bool {
        self.prewarm
    }

    pub fn is_child(&self) -> bool {
        self.child
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn gravity_multiplier(&self) -> f32 {
        self.gravity_multiplier
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn is_stretched(&self) -> bool {
        self.stretched
    }

    pub fn stretch_factor(&self) -> f32 {
        self.stretch_factor
    }

    /// Tail point of the billboard drawn for `particle`
    ///
    /// Unstretched emitters draw a point sprite, so the tail is the particle
    /// position itself.
    pub fn billboard_tail(&self, particle: &Particle) -> Vec3 {
        if self.stretched {
            particle.stretched_tail(self.stretch_factor)
        } else {
            particle.position
        }
    }

    pub fn inherit_velocity(&self) -> f32 {
        self.inherit_velocity
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn birth_sub_emitters(&self) -> &[EmitterId] {
        &self.birth_sub_emitters
    }

    pub fn death_sub_emitters(&self) -> &[EmitterId] {
        &self.death_sub_emitters
    }

    /// Get the current number of particles
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Total number of particles spawned since creation
    pub fn emitted_total(&self) -> u64 {
        self.emitted_total
    }

    /// Forward-only view over the live particles
    ///
    /// Clone the iterator to walk the collection again. The borrow ends
    /// before the next registry tick can run.
    pub fn particles(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    /// Whether the registry may reclaim this emitter
    pub fn is_spent(&self) -> bool {
        !self.looping && self.remaining_life < 0.0 && self.particles.is_empty()
    }

    // Configuration

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self
    }

    pub fn set_direction(&mut self, direction: Vec3) -> &mut Self {
        self.direction = direction;
        self
    }

    pub fn set_start_position(&mut self, value: impl Into<AnimatableValue<Vec3>>) -> &mut Self {
        self.start_position = value.into();
        self
    }

    pub fn set_start_velocity(&mut self, value: impl Into<AnimatableValue<Vec3>>) -> &mut Self {
        self.start_velocity = value.into();
        self
    }

    pub fn set_start_color(&mut self, value: impl Into<AnimatableValue<Vec3>>) -> &mut Self {
        self.start_color = value.into();
        self
    }

    pub fn set_start_size(&mut self, value: impl Into<AnimatableValue<f32>>) -> &mut Self {
        self.start_size = value.into();
        self
    }

    pub fn set_start_opacity(&mut self, value: impl Into<AnimatableValue<f32>>) -> &mut Self {
        self.start_opacity = value.into();
        self
    }

    pub fn set_emit_per_second(&mut self, value: impl Into<AnimatableValue<f32>>) -> &mut Self {
        self.emit_per_second = value.into();
        self
    }

    pub fn set_start_life(&mut self, value: impl Into<AnimatableValue<f32>>) -> &mut Self {
        self.start_life = value.into();
        self
    }

    pub fn set_color_over_lifetime<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> Vec3 + 'static,
    {
        self.color_curve.set_over_lifetime(evaluator);
        self
    }

    pub fn set_color_over_speed<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> Vec3 + 'static,
    {
        self.color_curve.set_over_speed(evaluator);
        self
    }

    pub fn set_size_over_lifetime<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> f32 + 'static,
    {
        self.size_curve.set_over_lifetime(evaluator);
        self
    }

    pub fn set_size_over_speed<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> f32 + 'static,
    {
        self.size_curve.set_over_speed(evaluator);
        self
    }

    pub fn set_opacity_over_lifetime<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> f32 + 'static,
    {
        self.opacity_curve.set_over_lifetime(evaluator);
        self
    }

    pub fn set_opacity_over_speed<F>(&mut self, evaluator: F) -> &mut Self
    where
        F: Fn(f32, Vec3, Vec3) -> f32 + 'static,
    {
        self.opacity_curve.set_over_speed(evaluator);
        self
    }

    /// Remove every color, size and opacity override
    pub fn clear_curves(&mut self) -> &mut Self {
        self.color_curve.clear();
        self.size_curve.clear();
        self.opacity_curve.clear();
        self
    }

    pub fn add_burst(&mut self, time: f32, count: u32) -> &mut Self {
        self.bursts.push(Burst::new(time, count));
        self
    }

    pub fn set_bursts<I, B>(&mut self, bursts: I) -> &mut Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Burst>,
    {
        self.bursts = bursts.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_birth_sub_emitter(&mut self, id: EmitterId) -> &mut Self {
        if !self.birth_sub_emitters.contains(&id) {
            self.birth_sub_emitters.push(id);
        }
        self
    }

    pub fn add_death_sub_emitter(&mut self, id: EmitterId) -> &mut Self {
        if !self.death_sub_emitters.contains(&id) {
            self.death_sub_emitters.push(id);
        }
        self
    }

    pub fn remove_sub_emitter(&mut self, id: EmitterId) -> &mut Self {
        self.birth_sub_emitters.retain(|&other| other != id);
        self.death_sub_emitters.retain(|&other| other != id);
        self
    }

    /// Set the cycle length; before the first update this also resets the cycle
    pub fn set_duration(&mut self, seconds: f32) -> &mut Self {
        self.duration = seconds;
        if !self.initialized {
            self.remaining_life = seconds;
        }
        self
    }

    pub fn set_looping(&mut self, looping: bool) -> &mut Self {
        self.looping = looping;
        self
    }

    pub fn set_prewarm(&mut self, prewarm: bool) -> &mut Self {
        self.prewarm = prewarm;
        self
    }

    pub fn set_gravity_multiplier(&mut self, multiplier: f32) -> &mut Self {
        self.gravity_multiplier = multiplier;
        self
    }

    pub fn set_max_particles(&mut self, max_particles: usize) -> &mut Self {
        self.max_particles = max_particles;
        self
    }

    pub fn set_child(&mut self, child: bool) -> &mut Self {
        self.child = child;
        self
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) -> &mut Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn set_stretched(&mut self, stretched: bool) -> &mut Self {
        self.stretched = stretched;
        self
    }

    pub fn set_stretch_factor(&mut self, factor: f32) -> &mut Self {
        self.stretch_factor = factor;
        self
    }

    /// Set how much of a dying parent's velocity triggered spawns inherit (0.0 - 1.0)
    pub fn set_inherit_velocity(&mut self, factor: f32) -> &mut Self {
        self.inherit_velocity = factor.clamp(0.0, 1.0);
        self
    }

    /// Check the configuration for values the update loop cannot honor
    ///
    /// Only constant values are inspected; computed evaluators are the
    /// caller's responsibility.
    pub fn validate(&self) -> Result<()> {
        let duration = self.duration;
        if !duration.is_finite() || duration < 0.0 || (self.looping && duration == 0.0) {
            return Err(SimError::InvalidDuration {
                id: self.id,
                duration,
            });
        }

        if let Some(rate) = self.emit_per_second.as_constant() {
            if !rate.is_finite() || rate < 0.0 {
                return Err(SimError::InvalidEmissionRate { id: self.id, rate });
            }
            if rate == 0.0 && !self.child && self.bursts.is_empty() {
                warn!("Emitter {} has no emission rate and no bursts", self.id);
            }
        }

        if let Some(burst) = self
            .bursts
            .iter()
            .find(|burst| !(0.0..=duration).contains(&burst.time))
        {
            return Err(SimError::InvalidBurst {
                id: self.id,
                time: burst.time,
                duration,
            });
        }

        Ok(())
    }

    // Simulation

    /// Advance the emitter by `dt` seconds
    ///
    /// `siblings` resolves the sub-emitter ids this emitter triggers; ids it
    /// cannot resolve are skipped.
    pub fn update(&mut self, dt: f32, siblings: &mut dyn EmitterLookup) {
        if !self.initialized {
            self.initialize(siblings);
        }
        self.step(dt, siblings);
    }

    /// Force-fire every burst at the emitter's current position
    ///
    /// Forced bursts ignore the schedule and the child flag, and never
    /// trigger birth sub-emitters.
    pub fn force_bursts(&mut self) {
        self.receive_trigger(None);
    }

    /// Order particles farthest-first from `eye` for alpha-blended drawing
    pub fn sort_back_to_front(&mut self, eye: Vec3) {
        self.particles.sort_by(|a, b| {
            b.position
                .distance_squared(eye)
                .total_cmp(&a.position.distance_squared(eye))
        });
    }

    fn initialize(&mut self, siblings: &mut dyn EmitterLookup) {
        self.initialized = true;
        let wanted = self.max_particles.saturating_sub(self.particles.len());
        if self.particles.try_reserve(wanted).is_err() {
            debug!(
                "Emitter {}: could not reserve {} particles up front",
                self.id, wanted
            );
        }
        self.remaining_life = self.duration;
        self.clock.reset();

        if self.looping && self.prewarm && self.duration.is_finite() {
            let span = self.duration.min(PREWARM_LIMIT);
            if span < self.duration {
                debug!(
                    "Emitter {}: prewarm of {}s capped at {}s",
                    self.id, self.duration, span
                );
            }

            // Whole steps; `countdown - PREWARM_STEP` is a no-op for long cycles
            let steps = (span / PREWARM_STEP).ceil() as u32;
            for _ in 0..steps {
                self.step(PREWARM_STEP, siblings);
            }
            debug!(
                "Emitter {}: prewarmed {}s in {} steps, {} particles live",
                self.id,
                span,
                steps,
                self.particles.len()
            );
        }
    }

    fn step(&mut self, dt: f32, siblings: &mut dyn EmitterLookup) {
        for particle in &mut self.particles {
            particle.integrate(dt);
        }

        self.apply_curves();
        self.retire_dead(siblings);

        if !self.child {
            self.fire_scheduled_bursts(dt);
        }

        self.advance_life(dt);

        if !self.child {
            let rate = self
                .emit_per_second
                .evaluate(dt, self.position, self.direction);
            let due = self.clock.advance(dt, rate);
            for _ in 0..due {
                if !self.emit_continuous(siblings) {
                    break;
                }
            }
        }
    }

    fn apply_curves(&mut self) {
        if !(self.color_curve.is_active()
            || self.size_curve.is_active()
            || self.opacity_curve.is_active())
        {
            return;
        }

        let (duration, origin, direction) = (self.duration, self.position, self.direction);
        for particle in &mut self.particles {
            let elapsed = duration - particle.remaining_life;
            let speed = particle.speed();

            if let Some(color) = self.color_curve.sample(elapsed, speed, origin, direction) {
                particle.color = color;
            }
            if let Some(size) = self.size_curve.sample(elapsed, speed, origin, direction) {
                particle.size = size;
            }
            if let Some(opacity) = self.opacity_curve.sample(elapsed, speed, origin, direction) {
                particle.opacity = opacity;
            }
        }
    }

    fn retire_dead(&mut self, siblings: &mut dyn EmitterLookup) {
        if self.death_sub_emitters.is_empty() {
            self.particles.retain(Particle::is_alive);
            return;
        }

        let mut fallen = std::mem::take(&mut self.fallen);
        self.particles.retain(|particle| {
            if particle.is_alive() {
                true
            } else {
                fallen.push(TriggerOrigin {
                    position: particle.position,
                    velocity: particle.velocity,
                });
                false
            }
        });

        for origin in fallen.drain(..) {
            for index in 0..self.death_sub_emitters.len() {
                let target = self.death_sub_emitters[index];
                self.trigger(target, Some(origin), siblings);
            }
        }
        self.fallen = fallen;
    }

    /// Fire the bursts whose time falls in this frame
    ///
    /// Scheduled bursts do not trigger birth sub-emitters; only continuous
    /// emission does.
    fn fire_scheduled_bursts(&mut self, dt: f32) {
        let cycle_time = self.cycle_time();
        for index in 0..self.bursts.len() {
            let burst = self.bursts[index];
            let Some(t) = burst.due_at(cycle_time, dt, self.duration, self.looping) else {
                continue;
            };
            for _ in 0..burst.count {
                if !self.spawn_at(t, Vec3::ZERO) {
                    trace!("Emitter {}: at capacity, burst truncated", self.id);
                    break;
                }
            }
        }
    }

    fn advance_life(&mut self, dt: f32) {
        self.remaining_life -= dt;
        if self.looping && self.remaining_life < 0.0 {
            self.remaining_life = wrap_cycle(self.remaining_life, self.duration);
        }
    }

    /// Resolve `target` and force-fire its bursts
    fn trigger(
        &mut self,
        target: EmitterId,
        origin: Option<TriggerOrigin>,
        siblings: &mut dyn EmitterLookup,
    ) {
        if target == self.id {
            self.receive_trigger(origin);
            return;
        }

        match siblings.resolve_mut(target) {
            Some(emitter) => emitter.receive_trigger(origin),
            None => trace!(
                "Emitter {}: sub-emitter {} not found, trigger skipped",
                self.id, target
            ),
        }
    }

    fn receive_trigger(&mut self, origin: Option<TriggerOrigin>) {
        let inherited = match origin {
            Some(origin) => {
                self.position = origin.position;
                self.direction = origin.velocity.normalize_or_zero();
                origin.velocity * self.inherit_velocity
            }
            None => Vec3::ZERO,
        };

        for index in 0..self.bursts.len() {
            for _ in 0..self.bursts[index].count {
                if !self.spawn(inherited) {
                    return;
                }
            }
        }
    }

    /// Continuous emission of one particle, firing birth sub-emitters first
    fn emit_continuous(&mut self, siblings: &mut dyn EmitterLookup) -> bool {
        if self.particles.len() >= self.max_particles {
            trace!("Emitter {}: at capacity, emission dropped", self.id);
            return false;
        }

        for index in 0..self.birth_sub_emitters.len() {
            let target = self.birth_sub_emitters[index];
            self.trigger(target, None, siblings);
        }
        self.spawn(Vec3::ZERO)
    }

    fn spawn(&mut self, inherited_velocity: Vec3) -> bool {
        self.spawn_at(self.cycle_time(), inherited_velocity)
    }

    /// Append one particle with start attributes evaluated at cycle time `t`
    fn spawn_at(&mut self, t: f32, inherited_velocity: Vec3) -> bool {
        if self.particles.len() >= self.max_particles {
            return false;
        }

        let (origin, direction) = (self.position, self.direction);

        let mut particle = Particle::new(
            self.start_position.evaluate(t, origin, direction),
            self.start_velocity.evaluate(t, origin, direction) + inherited_velocity,
            self.start_life.evaluate(t, origin, direction),
        );
        particle.color = self.start_color.evaluate(t, origin, direction);
        particle.size = self.start_size.evaluate(t, origin, direction);
        particle.opacity = self.start_opacity.evaluate(t, origin, direction);
        particle.gravity_scale = self.gravity_multiplier;

        self.particles.push(particle);
        self.emitted_total += 1;
        true
    }
}

/// Bring a negative remaining life back into `[0, duration)`
///
/// Equivalent to adding `duration` until non-negative, done in one step so
/// a frame that skips many cycles costs the same as one that skips none.
fn wrap_cycle(remaining: f32, duration: f32) -> f32 {
    if remaining >= 0.0 {
        return remaining;
    }
    if !(duration.is_finite() && duration > 0.0) {
        return 0.0;
    }

    let wrapped = remaining.rem_euclid(duration);
    if wrapped < duration { wrapped } else { 0.0 }
}
