//! Constant-or-computed attribute values and per-particle override curves

use std::fmt;

use glam::Vec3;

/// Procedural evaluator: `(parameter, origin position, origin direction) -> T`
///
/// The parameter is emitter cycle time for spawn attributes and lifetime
/// curves, and particle speed for speed curves.
pub type Evaluator<T> = Box<dyn Fn(f32, Vec3, Vec3) -> T>;

/// An emitter attribute that is either fixed or computed on demand
pub enum AnimatableValue<T> {
    /// Always yields the stored value
    Constant(T),
    /// Forwards every evaluation to the stored function
    Computed(Evaluator<T>),
}

impl<T: Copy> AnimatableValue<T> {
    /// Wrap a closure as a computed value
    pub fn computed<F>(evaluator: F) -> Self
    where
        F: Fn(f32, Vec3, Vec3) -> T + 'static,
    {
        Self::Computed(Box::new(evaluator))
    }

    /// Evaluate the value for the given parameter and spatial frame
    #[inline]
    pub fn evaluate(&self, parameter: f32, origin: Vec3, direction: Vec3) -> T {
        match self {
            Self::Constant(value) => *value,
            Self::Computed(evaluator) => evaluator(parameter, origin, direction),
        }
    }

    /// The stored value, if this is a constant
    pub fn as_constant(&self) -> Option<T> {
        match self {
            Self::Constant(value) => Some(*value),
            Self::Computed(_) => None,
        }
    }
}

impl<T: Default> Default for AnimatableValue<T> {
    fn default() -> Self {
        Self::Constant(T::default())
    }
}

impl<T> From<T> for AnimatableValue<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for AnimatableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Which input drives an attribute curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveDriver {
    /// Cycle time elapsed since the particle's reference point
    Lifetime,
    /// Current particle speed
    Speed,
}

/// Optional per-particle override for color, size or opacity
///
/// Both drivers may be configured; the lifetime evaluator always wins and the
/// speed evaluator is then never called.
pub struct AttributeCurve<T> {
    over_lifetime: Option<Evaluator<T>>,
    over_speed: Option<Evaluator<T>>,
}

impl<T> AttributeCurve<T> {
    /// A curve with no overrides
    pub const fn new() -> Self {
        Self {
            over_lifetime: None,
            over_speed: None,
        }
    }

    pub fn set_over_lifetime<F>(&mut self, evaluator: F)
    where
        F: Fn(f32, Vec3, Vec3) -> T + 'static,
    {
        self.over_lifetime = Some(Box::new(evaluator));
    }

    pub fn set_over_speed<F>(&mut self, evaluator: F)
    where
        F: Fn(f32, Vec3, Vec3) -> T + 'static,
    {
        self.over_speed = Some(Box::new(evaluator));
    }

    /// Drop both overrides
    pub fn clear(&mut self) {
        self.over_lifetime = None;
        self.over_speed = None;
    }

    /// The driver that will be evaluated, if any
    pub fn driver(&self) -> Option<CurveDriver> {
        if self.over_lifetime.is_some() {
            Some(CurveDriver::Lifetime)
        } else if self.over_speed.is_some() {
            Some(CurveDriver::Speed)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.over_lifetime.is_some() || self.over_speed.is_some()
    }

    /// Sample the active override
    ///
    /// Returns `None` when neither driver is configured, leaving the
    /// particle's spawn-time value in place.
    #[inline]
    pub fn sample(&self, elapsed: f32, speed: f32, origin: Vec3, direction: Vec3) -> Option<T> {
        if let Some(evaluator) = &self.over_lifetime {
            Some(evaluator(elapsed, origin, direction))
        } else {
            self.over_speed
                .as_ref()
                .map(|evaluator| evaluator(speed, origin, direction))
        }
    }
}

impl<T> Default for AttributeCurve<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AttributeCurve<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeCurve")
            .field("driver", &self.driver())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_constant_ignores_inputs() {
        let value = AnimatableValue::Constant(4.5f32);
        assert_eq!(value.evaluate(0.0, Vec3::ZERO, Vec3::Y), 4.5);
        assert_eq!(value.evaluate(100.0, Vec3::ONE, Vec3::X), 4.5);
        assert_eq!(value.as_constant(), Some(4.5));
    }

    #[test]
    fn test_computed_forwards_inputs() {
        let value = AnimatableValue::computed(|t, origin: Vec3, dir: Vec3| origin + dir * t);
        let result = value.evaluate(2.0, Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        assert_eq!(result, Vec3::new(1.0, 2.0, 0.0));
        assert!(value.as_constant().is_none());
    }

    #[test]
    fn test_from_and_default() {
        let value: AnimatableValue<f32> = 3.0.into();
        assert_eq!(value.as_constant(), Some(3.0));

        let value: AnimatableValue<Vec3> = AnimatableValue::default();
        assert_eq!(value.as_constant(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_debug_output() {
        let constant = AnimatableValue::Constant(1.0f32);
        let computed = AnimatableValue::<f32>::computed(|t, _, _| t);
        assert_eq!(format!("{constant:?}"), "Constant(1.0)");
        assert_eq!(format!("{computed:?}"), "Computed(..)");
    }

    #[test]
    fn test_curve_empty() {
        let curve = AttributeCurve::<f32>::new();
        assert!(!curve.is_active());
        assert_eq!(curve.driver(), None);
        assert_eq!(curve.sample(1.0, 2.0, Vec3::ZERO, Vec3::Y), None);
    }

    #[test]
    fn test_curve_lifetime_wins_over_speed() {
        let speed_calls = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&speed_calls);

        let mut curve = AttributeCurve::new();
        curve.set_over_speed(move |speed, _, _| {
            counter.set(counter.get() + 1);
            speed
        });
        curve.set_over_lifetime(|elapsed, _, _| elapsed * 10.0);

        assert_eq!(curve.driver(), Some(CurveDriver::Lifetime));
        assert_eq!(curve.sample(0.5, 99.0, Vec3::ZERO, Vec3::Y), Some(5.0));
        assert_eq!(speed_calls.get(), 0);
    }

    #[test]
    fn test_curve_speed_driver() {
        let mut curve = AttributeCurve::new();
        curve.set_over_speed(|speed, _, _| speed * 0.5);

        assert_eq!(curve.driver(), Some(CurveDriver::Speed));
        assert_eq!(curve.sample(0.5, 8.0, Vec3::ZERO, Vec3::Y), Some(4.0));

        curve.clear();
        assert!(!curve.is_active());
    }
}
