use std::time::Duration;

pub fn ease_cubic_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Animated transition of a zoom window.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeAnimation {
    from: (f64, f64),
    to: (f64, f64),
    duration: Duration,
    elapsed: Duration,
}

impl RangeAnimation {
    pub fn new(from: (f64, f64), to: (f64, f64), duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    pub fn target(&self) -> (f64, f64) {
        self.to
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Moves the animation forward by `dt` and returns the interpolated window.
    pub fn advance(&mut self, dt: Duration) -> (f64, f64) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.current()
    }

    pub fn current(&self) -> (f64, f64) {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = ease_cubic_out(self.elapsed.as_secs_f64() / self.duration.as_secs_f64());
        (
            self.from.0 + (self.to.0 - self.from.0) * t,
            self.from.1 + (self.to.1 - self.from.1) * t,
        )
    }
}
