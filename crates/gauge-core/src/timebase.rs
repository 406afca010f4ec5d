use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    start: Instant,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Monotonic microseconds since start.
    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking wait used between line transitions.
pub trait Delay {
    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1_000));
    }

    fn delay(&mut self, duration: Duration) {
        let us = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.delay_us(us);
    }
}

/// Busy-waits on the monotonic clock, like the firmware's calibrated delay loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn delay_us(&mut self, us: u32) {
        let deadline = Instant::now() + Duration::from_micros(us as u64);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Accounts for requested waits without sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualClock {
    elapsed_us: u64,
    waits: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }

    pub fn waits(&self) -> u64 {
        self.waits
    }
}

impl Delay for VirtualClock {
    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
        self.waits += 1;
    }
}
