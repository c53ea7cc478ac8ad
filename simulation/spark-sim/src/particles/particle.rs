//! Individual particle representation

use glam::Vec3;

/// Downward acceleration applied to every particle, scaled by its gravity scale
pub const GRAVITY: Vec3 = Vec3::new(0.0, -10.0, 0.0);

/// A single simulated particle
///
/// Owned by exactly one emitter. Dead once `remaining_life` drops to zero or
/// below; the owning emitter removes it during the same update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position before the most recent integration step
    pub previous_position: Vec3,
    /// World-space position
    pub position: Vec3,
    /// Velocity vector (units per second)
    pub velocity: Vec3,
    /// Current color (RGB, 0.0-1.0)
    pub color: Vec3,
    /// Billboard size
    pub size: f32,
    /// Opacity (0.0-1.0)
    pub opacity: f32,
    /// Multiplier applied to [`GRAVITY`]
    pub gravity_scale: f32,
    /// Seconds left before the particle dies
    pub remaining_life: f32,
}

impl Particle {
    /// Create a new particle at rest position `position` with the given velocity and life
    pub fn new(position: Vec3, velocity: Vec3, remaining_life: f32) -> Self {
        Self {
            previous_position: position,
            position,
            velocity,
            color: Vec3::ONE,
            size: 1.0,
            opacity: 1.0,
            gravity_scale: 1.0,
            remaining_life,
        }
    }

    /// Check if the particle is still alive
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.remaining_life > 0.0
    }

    /// Current speed (velocity magnitude)
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Advance one integration step
    ///
    /// Stores the current position as the previous one, applies gravity,
    /// integrates the position and decrements the remaining life.
    #[inline]
    pub fn integrate(&mut self, dt: f32) {
        self.previous_position = self.position;
        self.velocity += GRAVITY * dt * self.gravity_scale;
        self.position += self.velocity * dt;
        self.remaining_life -= dt;
    }

    /// Tail point for a velocity-stretched billboard
    ///
    /// The quad spans from the tail to `position`; a factor of 1 covers the
    /// distance travelled in the last step.
    pub fn stretched_tail(&self, factor: f32) -> Vec3 {
        self.position - (self.position - self.previous_position) * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_new() {
        let p = Particle::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.1, 0.2, 0.3), 5.0);
        assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.previous_position, p.position);
        assert_eq!(p.velocity, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(p.remaining_life, 5.0);
        assert!(p.is_alive());
    }

    #[test]
    fn test_particle_is_alive() {
        let mut p = Particle::new(Vec3::ZERO, Vec3::ZERO, 5.0);
        assert!(p.is_alive());

        p.remaining_life = 0.1;
        assert!(p.is_alive());

        p.remaining_life = 0.0;
        assert!(!p.is_alive());

        p.remaining_life = -1.0;
        assert!(!p.is_alive());
    }

    #[test]
    fn test_particle_integrate() {
        let mut p = Particle::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 10.0);
        p.integrate(1.0);

        // Gravity pulls the velocity down before the position step
        assert!((p.velocity.y - (-10.0)).abs() < 0.001);
        assert!((p.position.x - 1.0).abs() < 0.001);
        assert!((p.position.y - (-10.0)).abs() < 0.001);
        assert_eq!(p.previous_position, Vec3::ZERO);
        assert_eq!(p.remaining_life, 9.0);
    }

    #[test]
    fn test_particle_gravity_scale() {
        let mut p = Particle::new(Vec3::ZERO, Vec3::ZERO, 10.0);
        p.gravity_scale = 0.0;
        p.integrate(0.5);
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(p.position, Vec3::ZERO);

        p.gravity_scale = 2.0;
        p.integrate(0.5);
        assert!((p.velocity.y - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_stretched_tail() {
        let mut p = Particle::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 10.0);
        p.gravity_scale = 0.0;
        p.integrate(0.5);

        assert_eq!(p.stretched_tail(1.0), Vec3::ZERO);
        assert_eq!(p.stretched_tail(3.0), Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(p.stretched_tail(0.0), p.position);
    }
}
