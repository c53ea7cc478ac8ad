//! Emission timing: scheduled bursts and the continuous-rate accumulator

/// A scheduled one-shot emission inside the emitter cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    /// Cycle time at which the burst fires, in seconds `[0, duration]`
    pub time: f32,
    /// Number of particles to emit
    pub count: u32,
}

impl Burst {
    pub const fn new(time: f32, count: u32) -> Self {
        Self { time, count }
    }

    /// Whether the frame window `[cycle_time, cycle_time + dt)` reaches the burst
    ///
    /// For looping emitters the window may run past the end of the cycle, in
    /// which case the burst time of the next cycle (`time + duration`) is
    /// checked as well. Adjacent frames share window edges, so a burst fires
    /// once per cycle regardless of frame rate.
    #[inline]
    pub fn is_due(&self, cycle_time: f32, dt: f32, duration: f32, looping: bool) -> bool {
        self.due_at(cycle_time, dt, duration, looping).is_some()
    }

    /// Cycle time to evaluate the burst's particles at, if the burst is due
    ///
    /// A burst reached through the next cycle reports its own `time`, so its
    /// particles start as if the cycle had already wrapped.
    pub fn due_at(&self, cycle_time: f32, dt: f32, duration: f32, looping: bool) -> Option<f32> {
        let window_end = cycle_time + dt;
        let in_window = |t: f32| t >= cycle_time && t < window_end;

        if in_window(self.time) {
            Some(cycle_time)
        } else if looping && in_window(self.time + duration) {
            Some(self.time)
        } else {
            None
        }
    }
}

impl From<(f32, u32)> for Burst {
    fn from((time, count): (f32, u32)) -> Self {
        Self::new(time, count)
    }
}

/// Fixed-period emission accumulator
///
/// Elapsed time piles up between frames; every whole period in the pile is
/// one particle owed. A long frame therefore pays out several particles at
/// once and the average rate holds under any frame pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmissionClock {
    elapsed: f32,
}

impl EmissionClock {
    pub const fn new() -> Self {
        Self { elapsed: 0.0 }
    }

    /// Forget all accumulated time
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Time accumulated towards the next emission
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance by `dt` at `rate` particles per second, returning how many are due
    ///
    /// A rate that is not a positive finite number emits nothing and does not
    /// accumulate time, so the infinite period of a zero rate never enters
    /// the arithmetic and a paused emitter does not catch up on resume.
    pub fn advance(&mut self, dt: f32, rate: f32) -> u32 {
        if !(rate.is_finite() && rate > 0.0) {
            return 0;
        }

        self.elapsed += dt;
        let period = 1.0 / rate;
        if self.elapsed <= period {
            return 0;
        }

        // Whole periods in one division; `elapsed - period` is a no-op for large `elapsed`
        let due = (self.elapsed / period).floor();
        let rest = self.elapsed.rem_euclid(period);
        self.elapsed = if rest < period { rest } else { 0.0 };

        // Float to int casts saturate
        due as u32
    }
}
