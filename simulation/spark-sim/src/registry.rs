//! Emitter ownership, stable handles and the global tick

use log::{debug, warn};

use crate::error::{Result, SimError};
use crate::particles::{EmitterId, EmitterLookup, ParticleEmitter};

/// Emitters allocated up front by [`EmitterRegistry::new`]
const INITIAL_CAPACITY: usize = 100;

/// Snapshot of registry-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Live emitters
    pub emitters: usize,
    /// Live particles across all emitters
    pub live_particles: usize,
    /// Particles spawned by the live emitters since their creation
    pub emitted_total: u64,
}

/// Owns every emitter and hands out stable [`EmitterId`] handles
///
/// Storage is kept in creation order, which is also id order, so handles
/// resolve by binary search and the tick visits emitters deterministically.
/// References returned by [`resolve`](Self::resolve) and
/// [`resolve_mut`](Self::resolve_mut) borrow the registry and therefore
/// cannot outlive the next `create`, `remove` or `tick`.
#[derive(Debug)]
pub struct EmitterRegistry {
    emitters: Vec<ParticleEmitter>,
    next_id: u64,
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self {
            emitters: Vec::with_capacity(INITIAL_CAPACITY),
            next_id: 0,
        }
    }

    /// Allocate a new emitter with default settings and return its handle
    pub fn create(&mut self) -> EmitterId {
        let id = EmitterId::new(self.next_id);
        self.next_id += 1;
        self.emitters.push(ParticleEmitter::new(id));

        debug!("Created emitter {}", id);
        id
    }

    pub fn resolve(&self, id: EmitterId) -> Option<&ParticleEmitter> {
        find(&self.emitters, id).map(|index| &self.emitters[index])
    }

    pub fn resolve_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter> {
        find(&self.emitters, id).map(|index| &mut self.emitters[index])
    }

    /// Like [`resolve_mut`](Self::resolve_mut), for callers that propagate errors
    pub fn get_mut(&mut self, id: EmitterId) -> Result<&mut ParticleEmitter> {
        self.resolve_mut(id).ok_or(SimError::EmitterNotFound(id))
    }

    /// Remove an emitter; returns whether it existed
    pub fn remove(&mut self, id: EmitterId) -> bool {
        match find(&self.emitters, id) {
            Some(index) => {
                self.emitters.remove(index);
                debug!("Removed emitter {}", id);
                true
            }
            None => false,
        }
    }

    /// Advance every emitter by `dt` seconds, then reclaim spent emitters
    ///
    /// Emitters update in creation order. Each one sees the rest of the
    /// registry through [`EmitterLookup`] so its birth and death triggers
    /// reach sibling emitters within the same frame.
    pub fn tick(&mut self, dt: f32) {
        for index in 0..self.emitters.len() {
            let (before, rest) = self.emitters.split_at_mut(index);
            let Some((current, after)) = rest.split_first_mut() else {
                break;
            };

            let mut siblings = Siblings { before, after };
            current.update(dt, &mut siblings);
        }

        let count = self.emitters.len();
        self.emitters.retain(|emitter| !emitter.is_spent());
        let swept = count - self.emitters.len();
        if swept > 0 {
            debug!("Swept {} spent emitter(s), {} remain", swept, self.emitters.len());
        }
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// Handles of every live emitter, in creation order
    pub fn ids(&self) -> impl Iterator<Item = EmitterId> + '_ {
        self.emitters.iter().map(ParticleEmitter::id)
    }

    /// Every live emitter, in creation order
    pub fn iter(&self) -> std::slice::Iter<'_, ParticleEmitter> {
        self.emitters.iter()
    }

    pub fn stats(&self) -> RegistryStats {
        self.emitters
            .iter()
            .fold(RegistryStats::default(), |mut stats, emitter| {
                stats.emitters += 1;
                stats.live_particles += emitter.particle_count();
                stats.emitted_total += emitter.emitted_total();
                stats
            })
    }

    /// Validate every emitter and every sub-emitter reference
    pub fn validate(&self) -> Result<()> {
        for emitter in &self.emitters {
            emitter.validate()?;

            let targets = emitter
                .birth_sub_emitters()
                .iter()
                .chain(emitter.death_sub_emitters());
            for &target in targets {
                if find(&self.emitters, target).is_none() {
                    warn!(
                        "Emitter {} references missing sub-emitter {}",
                        emitter.id(),
                        target
                    );
                    return Err(SimError::DanglingSubEmitter {
                        id: emitter.id(),
                        target,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterLookup for EmitterRegistry {
    fn resolve_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter> {
        Self::resolve_mut(self, id)
    }
}

impl<'a> IntoIterator for &'a EmitterRegistry {
    type Item = &'a ParticleEmitter;
    type IntoIter = std::slice::Iter<'a, ParticleEmitter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The emitters around the one being updated
struct Siblings<'a> {
    before: &'a mut [ParticleEmitter],
    after: &'a mut [ParticleEmitter],
}

impl EmitterLookup for Siblings<'_> {
    fn resolve_mut(&mut self, id: EmitterId) -> Option<&mut ParticleEmitter> {
        if let Some(index) = find(self.before, id) {
            return Some(&mut self.before[index]);
        }
        find(self.after, id).map(|index| &mut self.after[index])
    }
}

/// Position of `id` in id-ordered storage
#[inline]
fn find(emitters: &[ParticleEmitter], id: EmitterId) -> Option<usize> {
    emitters
        .binary_search_by_key(&id, ParticleEmitter::id)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_create_issues_increasing_ids() {
        let mut registry = EmitterRegistry::new();
        let a = registry.create();
        let b = registry.create();
        assert!(a < b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = EmitterRegistry::new();
        let a = registry.create();
        assert!(registry.remove(a));
        let b = registry.create();
        assert_ne!(a, b);
        assert!(registry.resolve(a).is_none());
        assert!(registry.resolve(b).is_some());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut registry = EmitterRegistry::new();
        let a = registry.create();
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolution_survives_removals() {
        let mut registry = EmitterRegistry::new();
        let ids: Vec<_> = (0..10).map(|_| registry.create()).collect();
        for id in ids.iter().step_by(2) {
            registry.remove(*id);
        }

        for id in ids.iter().skip(1).step_by(2) {
            assert_eq!(registry.resolve(*id).map(ParticleEmitter::id), Some(*id));
        }
    }

    #[test]
    fn test_get_mut_reports_missing() {
        let mut registry = EmitterRegistry::new();
        let id = registry.create();
        registry.remove(id);
        assert!(matches!(
            registry.get_mut(id),
            Err(SimError::EmitterNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_sweep_consecutive_spent_emitters() {
        let mut registry = EmitterRegistry::new();
        let keeper = registry.create();
        for _ in 0..4 {
            let id = registry.create();
            if let Some(emitter) = registry.resolve_mut(id) {
                emitter
                    .set_looping(false)
                    .set_duration(0.01)
                    .set_emit_per_second(0.0);
            }
        }

        registry.tick(DT);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![keeper]);
    }

    #[test]
    fn test_sibling_lookup_in_both_directions() {
        let mut registry = EmitterRegistry::new();
        let early = registry.create();
        let parent = registry.create();
        let late = registry.create();

        for id in [early, late] {
            if let Some(emitter) = registry.resolve_mut(id) {
                emitter.set_child(true).add_burst(0.0, 2);
            }
        }
        if let Some(emitter) = registry.resolve_mut(parent) {
            // One continuous spawn in the first frame
            emitter
                .set_emit_per_second(100.0)
                .add_birth_sub_emitter(early)
                .add_birth_sub_emitter(late);
        }

        registry.tick(DT);

        let count = |id| registry.resolve(id).map_or(0, ParticleEmitter::particle_count);
        assert_eq!(count(parent), 1);
        assert_eq!(count(early), 2);
        assert_eq!(count(late), 2);
    }

    #[test]
    fn test_stale_sub_emitter_is_skipped() {
        let mut registry = EmitterRegistry::new();
        let parent = registry.create();
        let child = registry.create();
        if let Some(emitter) = registry.resolve_mut(parent) {
            emitter
                .set_emit_per_second(100.0)
                .add_birth_sub_emitter(child);
        }
        registry.remove(child);

        registry.tick(DT);
        assert_eq!(
            registry.resolve(parent).map(ParticleEmitter::particle_count),
            Some(1)
        );
        assert!(matches!(
            registry.validate(),
            Err(SimError::DanglingSubEmitter { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let mut registry = EmitterRegistry::new();
        for _ in 0..3 {
            let id = registry.create();
            if let Some(emitter) = registry.resolve_mut(id) {
                emitter
                    .set_emit_per_second(0.0)
                    .set_start_velocity(Vec3::ZERO)
                    .add_burst(0.0, 4);
            }
        }
        registry.tick(DT);

        let stats = registry.stats();
        assert_eq!(stats.emitters, 3);
        assert_eq!(stats.live_particles, 12);
        assert_eq!(stats.emitted_total, 12);
    }
}
