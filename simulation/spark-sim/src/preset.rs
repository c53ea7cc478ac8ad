//! Emitter presets loaded from YAML or JSON documents
//!
//! A preset document lists named emitters. Attribute values are either plain
//! constants, seeded uniform jitter around a value, or a linear ramp over the
//! evaluation parameter. Sub-emitters are referenced by name and resolved to
//! [`EmitterId`]s when the document is instantiated into a registry.
//!
//! ```yaml
//! seed: 7
//! emitters:
//!   - name: sparks
//!     emit_per_second: 0
//!     life: { value: 1.0, spread: 0.25 }
//!     bursts: [{ time: 0.0, count: 20 }]
//!     child: true
//!   - name: rocket
//!     direction: [0, 1, 0]
//!     velocity: { speed: 12, spread: 0.1 }
//!     death: [sparks]
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::particles::{AnimatableValue, BlendMode, EmitterId, ParticleEmitter};
use crate::registry::EmitterRegistry;

/// Random source shared by every evaluator built from one document
type SharedRng = Rc<RefCell<StdRng>>;

/// Top-level preset document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDocument {
    /// Seed for every jittered value in the document
    #[serde(default)]
    pub seed: u64,
    /// Emitters, created in this order
    pub emitters: Vec<EmitterPreset>,
}

/// Configuration of a single named emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterPreset {
    pub name: String,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub duration: f32,
    pub looping: bool,
    pub prewarm: bool,
    pub child: bool,
    /// Gravity multiplier copied into every particle
    pub gravity: f32,
    pub max_particles: usize,
    pub blend: BlendPreset,
    /// Draw particles stretched along their velocity
    pub stretched: bool,
    pub stretch_factor: f32,
    pub inherit_velocity: f32,
    pub emit_per_second: ScalarSpec,
    pub life: ScalarSpec,
    pub size: ScalarSpec,
    pub opacity: ScalarSpec,
    pub color: VectorSpec,
    pub spawn: SpawnSpec,
    pub velocity: VelocitySpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bursts: Vec<BurstPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_over_life: Option<Ramp<[f32; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_over_life: Option<Ramp<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity_over_life: Option<Ramp<f32>>,
    /// Emitters fired before each of this one's continuous spawns
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub birth: Vec<String>,
    /// Emitters fired where this one's particles die
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub death: Vec<String>,
}

impl Default for EmitterPreset {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: [0.0; 3],
            direction: [0.0, 1.0, 0.0],
            duration: 5.0,
            looping: true,
            prewarm: false,
            child: false,
            gravity: 1.0,
            max_particles: 1000,
            blend: BlendPreset::Alpha,
            stretched: false,
            stretch_factor: 1.0,
            inherit_velocity: 0.0,
            emit_per_second: ValueSpec::Constant(10.0),
            life: ValueSpec::Constant(1.0),
            size: ValueSpec::Constant(1.0),
            opacity: ValueSpec::Constant(1.0),
            color: ValueSpec::Constant([1.0; 3]),
            spawn: SpawnSpec::default(),
            velocity: VelocitySpec::default(),
            bursts: Vec::new(),
            color_over_life: None,
            size_over_life: None,
            opacity_over_life: None,
            birth: Vec::new(),
            death: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendPreset {
    #[default]
    Alpha,
    Additive,
}

impl From<BlendPreset> for BlendMode {
    fn from(blend: BlendPreset) -> Self {
        match blend {
            BlendPreset::Alpha => Self::AlphaBlend,
            BlendPreset::Additive => Self::Additive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstPreset {
    pub time: f32,
    pub count: u32,
}

/// Uniform noise: `value + U(-1, 1) * spread`, per component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter<T> {
    pub value: T,
    pub spread: T,
}

/// Linear interpolation from `from` to `to` as the parameter goes `0..over`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp<T> {
    pub from: T,
    pub to: T,
    pub over: f32,
}

/// A preset attribute value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec<T> {
    Constant(T),
    Jitter(Jitter<T>),
    Ramp(Ramp<T>),
}

pub type ScalarSpec = ValueSpec<f32>;
pub type VectorSpec = ValueSpec<[f32; 3]>;

/// Spawn position relative to the emitter origin
///
/// `origin + offset + U(0, 1) * jitter`, per component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSpec {
    pub offset: [f32; 3],
    pub jitter: [f32; 3],
}

/// Spawn velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VelocitySpec {
    /// `(direction + r * spread) * speed` with `r` uniform in `[-1, 1]^3`
    Directed(DirectedVelocity),
    /// Independent of the emitter direction
    Value(VectorSpec),
}

impl Default for VelocitySpec {
    fn default() -> Self {
        Self::Directed(DirectedVelocity {
            speed: 1.0,
            spread: 0.0,
            upward: false,
            follow_direction: true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectedVelocity {
    pub speed: f32,
    #[serde(default)]
    pub spread: f32,
    /// Flip the random offset into the upper hemisphere
    #[serde(default)]
    pub upward: bool,
    /// Drop the emitter direction and keep only the random offset
    #[serde(default = "default_true")]
    pub follow_direction: bool,
}

const fn default_true() -> bool {
    true
}

/// Component type of a preset value: `f32` or `[f32; 3]`
pub trait SpecValue: Copy + 'static {
    type Output: Copy + 'static;

    fn resolve(self) -> Self::Output;
    fn jitter(self, spread: Self, rng: &mut StdRng) -> Self::Output;
    fn lerp(from: Self, to: Self, t: f32) -> Self::Output;
}

impl SpecValue for f32 {
    type Output = Self;

    fn resolve(self) -> Self {
        self
    }

    fn jitter(self, spread: Self, rng: &mut StdRng) -> Self {
        self + rng.random_range(-1.0_f32..1.0) * spread
    }

    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl SpecValue for [f32; 3] {
    type Output = Vec3;

    fn resolve(self) -> Vec3 {
        Vec3::from_array(self)
    }

    fn jitter(self, spread: Self, rng: &mut StdRng) -> Vec3 {
        Vec3::from_array(self) + signed_unit_vec(rng) * Vec3::from_array(spread)
    }

    fn lerp(from: Self, to: Self, t: f32) -> Vec3 {
        Vec3::from_array(from).lerp(Vec3::from_array(to), t)
    }
}

impl<T: SpecValue> Ramp<T> {
    /// Value at parameter `t`, clamped to the ramp ends
    pub fn sample(&self, t: f32) -> T::Output {
        let progress = if self.over > 0.0 {
            (t / self.over).clamp(0.0, 1.0)
        } else {
            1.0
        };
        T::lerp(self.from, self.to, progress)
    }
}

impl<T: SpecValue> ValueSpec<T> {
    fn build(&self, rng: &SharedRng) -> AnimatableValue<T::Output> {
        match *self {
            Self::Constant(value) => AnimatableValue::Constant(value.resolve()),
            Self::Jitter(Jitter { value, spread }) => {
                let rng = Rc::clone(rng);
                AnimatableValue::computed(move |_, _, _| value.jitter(spread, &mut rng.borrow_mut()))
            }
            Self::Ramp(ramp) => AnimatableValue::computed(move |t, _, _| ramp.sample(t)),
        }
    }
}

impl SpawnSpec {
    fn build(&self, rng: &SharedRng) -> AnimatableValue<Vec3> {
        let offset = Vec3::from_array(self.offset);
        let jitter = Vec3::from_array(self.jitter);
        if jitter == Vec3::ZERO {
            return AnimatableValue::computed(move |_, origin, _| origin + offset);
        }

        let rng = Rc::clone(rng);
        AnimatableValue::computed(move |_, origin, _| {
            let mut rng = rng.borrow_mut();
            let noise = Vec3::new(
                rng.random_range(0.0_f32..1.0),
                rng.random_range(0.0_f32..1.0),
                rng.random_range(0.0_f32..1.0),
            );
            origin + offset + noise * jitter
        })
    }
}

impl VelocitySpec {
    fn build(&self, rng: &SharedRng) -> AnimatableValue<Vec3> {
        match *self {
            Self::Value(spec) => spec.build(rng),
            Self::Directed(directed) => {
                let rng = Rc::clone(rng);
                AnimatableValue::computed(move |_, _, direction| {
                    let mut offset = signed_unit_vec(&mut rng.borrow_mut());
                    if directed.upward && offset.y < 0.0 {
                        offset = -offset;
                    }
                    let base = if directed.follow_direction {
                        direction
                    } else {
                        Vec3::ZERO
                    };
                    (base + offset * directed.spread) * directed.speed
                })
            }
        }
    }
}

fn signed_unit_vec(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.random_range(-1.0_f32..1.0),
        rng.random_range(-1.0_f32..1.0),
        rng.random_range(-1.0_f32..1.0),
    )
}

impl PresetDocument {
    /// Load a preset from a `.json`, `.yaml` or `.yml` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let document = match extension.as_str() {
            "json" => Self::from_json_str(&fs::read_to_string(path)?)?,
            "yaml" | "yml" => Self::from_yaml_str(&fs::read_to_string(path)?)?,
            _ => return Err(SimError::UnsupportedFormat(path.display().to_string())),
        };

        debug!(
            "Loaded preset {} with {} emitter(s)",
            path.display(),
            document.emitters.len()
        );
        Ok(document)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the jitter seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Look up an emitter preset by name
    pub fn emitter(&self, name: &str) -> Option<&EmitterPreset> {
        self.emitters.iter().find(|preset| preset.name == name)
    }

    /// Create every emitter in `registry` and wire up sub-emitters by name
    ///
    /// Returns `(name, id)` pairs in document order. On error, emitters
    /// created so far are removed again and the registry is left as it was.
    pub fn instantiate(&self, registry: &mut EmitterRegistry) -> Result<Vec<(String, EmitterId)>> {
        let mut ids: HashMap<&str, EmitterId> = HashMap::with_capacity(self.emitters.len());
        let mut created = Vec::with_capacity(self.emitters.len());

        for preset in &self.emitters {
            if ids.contains_key(preset.name.as_str()) {
                rollback(registry, &created);
                return Err(SimError::DuplicatePreset(preset.name.clone()));
            }
            let id = registry.create();
            ids.insert(preset.name.as_str(), id);
            created.push((preset.name.clone(), id));
        }

        let rng: SharedRng = Rc::new(RefCell::new(StdRng::seed_from_u64(self.seed)));
        for (preset, (_, id)) in self.emitters.iter().zip(&created) {
            let configured = registry
                .get_mut(*id)
                .and_then(|emitter| preset.apply(emitter, &ids, &rng));
            if let Err(err) = configured {
                rollback(registry, &created);
                return Err(err);
            }
        }

        info!("Instantiated {} preset emitter(s)", created.len());
        Ok(created)
    }

    /// A looping fountain that sprays sparks where its particles die
    ///
    /// Fires continuously and in two bursts per cycle; every particle that
    /// dies fires an additive spark emitter at its death position.
    pub fn fountain() -> Self {
        let fountain = EmitterPreset {
            name: "fountain".to_string(),
            direction: [1.0, 1.0, 0.0],
            duration: 5.0,
            gravity: 5.0,
            max_particles: 50_000,
            stretched: true,
            stretch_factor: 5.0,
            emit_per_second: ValueSpec::Constant(100.0),
            life: ValueSpec::Constant(2.0),
            spawn: SpawnSpec {
                offset: [0.0; 3],
                jitter: [0.5, 0.0, 0.5],
            },
            velocity: VelocitySpec::Directed(DirectedVelocity {
                speed: 30.0,
                spread: 0.25,
                upward: true,
                follow_direction: true,
            }),
            bursts: vec![
                BurstPreset {
                    time: 0.0,
                    count: 30,
                },
                BurstPreset {
                    time: 2.5,
                    count: 30,
                },
            ],
            death: vec!["sparks".to_string()],
            ..EmitterPreset::default()
        };

        let sparks = EmitterPreset {
            name: "sparks".to_string(),
            duration: 0.5,
            child: true,
            gravity: 5.0,
            max_particles: 50_000,
            blend: BlendPreset::Additive,
            inherit_velocity: 1.0,
            emit_per_second: ValueSpec::Constant(0.0),
            life: ValueSpec::Constant(1.5),
            spawn: SpawnSpec {
                offset: [0.0; 3],
                jitter: [0.5, 0.0, 0.5],
            },
            velocity: VelocitySpec::Directed(DirectedVelocity {
                speed: 30.0,
                spread: 1.0,
                upward: false,
                follow_direction: false,
            }),
            bursts: vec![BurstPreset {
                time: 0.0,
                count: 1,
            }],
            ..EmitterPreset::default()
        };

        Self {
            seed: 0,
            emitters: vec![fountain, sparks],
        }
    }
}

impl EmitterPreset {
    fn apply(
        &self,
        emitter: &mut ParticleEmitter,
        ids: &HashMap<&str, EmitterId>,
        rng: &SharedRng,
    ) -> Result<()> {
        emitter
            .set_label(self.name.as_str())
            .set_position(Vec3::from_array(self.position))
            .set_direction(Vec3::from_array(self.direction))
            .set_duration(self.duration)
            .set_looping(self.looping)
            .set_prewarm(self.prewarm)
            .set_child(self.child)
            .set_gravity_multiplier(self.gravity)
            .set_max_particles(self.max_particles)
            .set_blend_mode(self.blend.into())
            .set_stretched(self.stretched)
            .set_stretch_factor(self.stretch_factor)
            .set_inherit_velocity(self.inherit_velocity)
            .set_emit_per_second(self.emit_per_second.build(rng))
            .set_start_life(self.life.build(rng))
            .set_start_size(self.size.build(rng))
            .set_start_opacity(self.opacity.build(rng))
            .set_start_color(self.color.build(rng))
            .set_start_position(self.spawn.build(rng))
            .set_start_velocity(self.velocity.build(rng))
            .set_bursts(self.bursts.iter().map(|burst| (burst.time, burst.count)));

        if let Some(ramp) = self.color_over_life {
            emitter.set_color_over_lifetime(move |t, _, _| ramp.sample(t));
        }
        if let Some(ramp) = self.size_over_life {
            emitter.set_size_over_lifetime(move |t, _, _| ramp.sample(t));
        }
        if let Some(ramp) = self.opacity_over_life {
            emitter.set_opacity_over_lifetime(move |t, _, _| ramp.sample(t));
        }

        for name in &self.birth {
            emitter.add_birth_sub_emitter(lookup(ids, name)?);
        }
        for name in &self.death {
            emitter.add_death_sub_emitter(lookup(ids, name)?);
        }

        emitter.validate()
    }
}

fn lookup(ids: &HashMap<&str, EmitterId>, name: &str) -> Result<EmitterId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| SimError::UnknownPreset(name.to_string()))
}

fn rollback(registry: &mut EmitterRegistry, created: &[(String, EmitterId)]) {
    for (_, id) in created {
        registry.remove(*id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r"
seed: 3
emitters:
  - name: trail
    child: true
    emit_per_second: 0
    bursts: [{ time: 0.0, count: 4 }]
  - name: rocket
    direction: [0, 1, 0]
    emit_per_second: 100
    life: { value: 0.5, spread: 0.1 }
    size: { from: 1.0, to: 3.0, over: 5.0 }
    velocity: { speed: 12 }
    birth: [trail]
";

    #[test]
    fn test_parse_value_spec_shapes() {
        let doc = PresetDocument::from_yaml_str(DOC).unwrap();
        let rocket = doc.emitter("rocket").unwrap();

        assert_eq!(rocket.emit_per_second, ValueSpec::Constant(100.0));
        assert_eq!(
            rocket.life,
            ValueSpec::Jitter(Jitter {
                value: 0.5,
                spread: 0.1
            })
        );
        assert_eq!(
            rocket.size,
            ValueSpec::Ramp(Ramp {
                from: 1.0,
                to: 3.0,
                over: 5.0
            })
        );
        assert_eq!(
            rocket.velocity,
            VelocitySpec::Directed(DirectedVelocity {
                speed: 12.0,
                spread: 0.0,
                upward: false,
                follow_direction: true,
            })
        );
        // Unspecified fields fall back to the emitter defaults
        assert_eq!(rocket.duration, 5.0);
        assert!(rocket.looping);
    }

    #[test]
    fn test_velocity_value_spec() {
        let yaml = "name: drift\nvelocity: [1, 0, 0]\n";
        let preset: EmitterPreset = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(
            preset.velocity,
            VelocitySpec::Value(ValueSpec::Constant([1.0, 0.0, 0.0]))
        );
    }

    #[test]
    fn test_ramp_sample_clamps() {
        let ramp = Ramp {
            from: 0.0_f32,
            to: 10.0,
            over: 2.0,
        };
        assert_eq!(ramp.sample(-1.0), 0.0);
        assert_eq!(ramp.sample(1.0), 5.0);
        assert_eq!(ramp.sample(4.0), 10.0);

        let instant = Ramp {
            from: 0.0_f32,
            to: 1.0,
            over: 0.0,
        };
        assert_eq!(instant.sample(0.0), 1.0);
    }

    #[test]
    fn test_jitter_stays_in_spread() {
        let rng: SharedRng = Rc::new(RefCell::new(StdRng::seed_from_u64(1)));
        let value = ValueSpec::Jitter(Jitter {
            value: 2.0_f32,
            spread: 0.5,
        })
        .build(&rng);

        for _ in 0..100 {
            let sample = value.evaluate(0.0, Vec3::ZERO, Vec3::Y);
            assert!((1.5..=2.5).contains(&sample), "{sample}");
        }
    }

    #[test]
    fn test_instantiate_wires_sub_emitters() {
        let doc = PresetDocument::from_yaml_str(DOC).unwrap();
        let mut registry = EmitterRegistry::new();
        let created = doc.instantiate(&mut registry).unwrap();

        let names: Vec<&str> = created.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["trail", "rocket"]);

        let (trail, rocket) = (created[0].1, created[1].1);
        let emitter = registry.resolve(rocket).unwrap();
        assert_eq!(emitter.label(), "rocket");
        assert_eq!(emitter.birth_sub_emitters(), &[trail]);

        registry.tick(1.0 / 60.0);
        // One continuous rocket spawn, firing the trail's burst of four
        assert_eq!(registry.resolve(rocket).unwrap().particle_count(), 1);
        assert_eq!(registry.resolve(trail).unwrap().particle_count(), 4);
    }

    #[test]
    fn test_instantiate_unknown_reference_rolls_back() {
        let yaml = "emitters:\n  - name: a\n    death: [missing]\n";
        let doc = PresetDocument::from_yaml_str(yaml).unwrap();
        let mut registry = EmitterRegistry::new();

        let err = doc.instantiate(&mut registry).unwrap_err();
        assert!(matches!(err, SimError::UnknownPreset(name) if name == "missing"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_instantiate_duplicate_name() {
        let yaml = "emitters:\n  - name: a\n  - name: a\n";
        let doc = PresetDocument::from_yaml_str(yaml).unwrap();
        let mut registry = EmitterRegistry::new();

        assert!(matches!(
            doc.instantiate(&mut registry),
            Err(SimError::DuplicatePreset(name)) if name == "a"
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_instantiate_invalid_burst() {
        let yaml = "emitters:\n  - name: a\n    duration: 1.0\n    bursts: [{ time: 2.0, count: 1 }]\n";
        let doc = PresetDocument::from_yaml_str(yaml).unwrap();
        let mut registry = EmitterRegistry::new();

        assert!(matches!(
            doc.instantiate(&mut registry),
            Err(SimError::InvalidBurst { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fountain_survives_yaml() {
        let fountain = PresetDocument::fountain();
        let yaml = fountain.to_yaml().unwrap();
        assert_eq!(PresetDocument::from_yaml_str(&yaml).unwrap(), fountain);
    }

    #[test]
    fn test_fountain_configuration() {
        let mut registry = EmitterRegistry::new();
        let created = PresetDocument::fountain()
            .instantiate(&mut registry)
            .unwrap();
        let (fountain, sparks) = (created[0].1, created[1].1);

        let sparks_emitter = registry.resolve(sparks).unwrap();
        assert!(sparks_emitter.is_child());
        assert_eq!(sparks_emitter.blend_mode(), BlendMode::Additive);
        assert_eq!(sparks_emitter.inherit_velocity(), 1.0);
        assert!(!sparks_emitter.is_stretched());

        let fountain_emitter = registry.resolve(fountain).unwrap();
        assert_eq!(fountain_emitter.death_sub_emitters(), &[sparks]);
        assert_eq!(fountain_emitter.max_particles(), 50_000);
        assert!(fountain_emitter.is_stretched());
        assert_eq!(fountain_emitter.stretch_factor(), 5.0);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.toml");
        fs::write(&path, "seed = 1").unwrap();

        assert!(matches!(
            PresetDocument::from_path(&path),
            Err(SimError::UnsupportedFormat(_))
        ));

        // The extension is checked before the file is opened
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            PresetDocument::from_path(&missing),
            Err(SimError::UnsupportedFormat(_))
        ));
    }
}
