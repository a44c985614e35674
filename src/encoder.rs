//! Quadrature encoder reading with 16-bit rollover correction
//!
//! The hardware exposes a free-running 16-bit counter. `Encoder::update`
//! samples it, corrects the signed delta for rollover, and tracks cumulative
//! position, elapsed microseconds, and speed in counts per microsecond.
//! All public getters report in the CCW-positive rotational convention.

/// Raw 16-bit counter source (one hardware timer channel pair).
pub trait EncoderCounter: Send {
    /// Sample the free-running counter.
    fn count(&mut self) -> u16;
}

/// Correct a raw 16-bit counter delta for rollover.
///
/// Any delta beyond +/-32768 is corrected by -/+65536, so the result always
/// lies in [-32768, 32768]. A raw half-range delta is ambiguous and is
/// passed through with its sign intact.
pub fn wrap_delta(new: u16, old: u16) -> i32 {
    let mut delta = new as i32 - old as i32;
    if delta > 32768 {
        delta -= 65536;
    } else if delta < -32768 {
        delta += 65536;
    }
    delta
}

/// Incremental encoder state built on a raw counter source.
pub struct Encoder {
    counter: Box<dyn EncoderCounter>,
    counter_old: u16,
    time_old_us: u64,
    position: i64,
    delta: i32,
    dt_us: u64,
    speed: f32,
}

impl Encoder {
    /// Create an encoder, sampling the counter to establish the baseline.
    pub fn new(mut counter: Box<dyn EncoderCounter>, now_us: u64) -> Self {
        let counter_old = counter.count();
        Self {
            counter,
            counter_old,
            time_old_us: now_us,
            position: 0,
            delta: 0,
            dt_us: 0,
            speed: 0.0,
        }
    }

    /// Sample the counter and update position, delta, dt, and speed.
    ///
    /// Must be called every task step, including while the owning controller
    /// is off, so the delta/time baseline stays current and re-entry does not
    /// observe one huge stale delta.
    pub fn update(&mut self, now_us: u64) {
        let counter_new = self.counter.count();
        self.delta = wrap_delta(counter_new, self.counter_old);
        self.counter_old = counter_new;

        self.dt_us = now_us.saturating_sub(self.time_old_us);
        self.time_old_us = now_us;

        self.speed = if self.dt_us > 0 {
            self.delta as f32 / self.dt_us as f32
        } else {
            0.0
        };

        self.position += self.delta as i64;
    }

    /// Cumulative position in counts, CCW-positive.
    pub fn position(&self) -> i64 {
        -self.position
    }

    /// Delta from the last update in counts, CCW-positive.
    pub fn delta(&self) -> i32 {
        -self.delta
    }

    /// Speed in counts per microsecond, CCW-positive.
    pub fn speed(&self) -> f32 {
        -self.speed
    }

    /// Elapsed microseconds between the last two updates.
    pub fn dt_us(&self) -> u64 {
        self.dt_us
    }

    /// Reset the accumulated position and re-baseline the counter.
    pub fn zero(&mut self) {
        self.counter_old = self.counter.count();
        self.position = 0;
    }
}
