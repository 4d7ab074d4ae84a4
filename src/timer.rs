//! Clock source — millisecond time for every scheduling decision
//!
//! The scheduler only ever asks two things of time: "what is now?" and
//! "let a quantum pass". `SysTimer` answers both in software so dispatch is
//! reproducible under test; `StdClock` answers them from the host OS.

/// Time source driving the dispatch loop
///
/// `now_ms` must be monotonic for the lifetime of the kernel.
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u64;

    /// Let one scheduling quantum elapse between passes
    fn idle(&mut self, quantum_us: u32);
}

/// Virtual system timer
///
/// Counts microseconds so sub-millisecond quanta still accumulate;
/// reports milliseconds. Size: 16 bytes
pub struct SysTimer {
    /// Current tick count (microseconds)
    ticks_us: u64,
    /// Overflow count
    overflows: u32,
}

impl SysTimer {
    /// Software timer starting at t = 0
    pub const fn software() -> Self {
        Self::starting_at_ms(0)
    }

    /// Software timer starting at an arbitrary millisecond
    pub const fn starting_at_ms(ms: u64) -> Self {
        Self {
            ticks_us: ms * 1000,
            overflows: 0,
        }
    }

    /// Advance time by microseconds
    pub fn advance(&mut self, us: u64) {
        let new = self.ticks_us.wrapping_add(us);
        if new < self.ticks_us {
            self.overflows += 1;
        }
        self.ticks_us = new;
    }

    /// Advance time by milliseconds
    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(ms.saturating_mul(1000));
    }

    /// Current time in microseconds
    pub fn now_us(&self) -> u64 {
        self.ticks_us
    }

    /// Number of overflows
    pub fn overflows(&self) -> u32 {
        self.overflows
    }
}

impl Default for SysTimer {
    fn default() -> Self {
        Self::software()
    }
}

impl Clock for SysTimer {
    fn now_ms(&self) -> u64 {
        self.ticks_us / 1000
    }

    fn idle(&mut self, quantum_us: u32) {
        self.advance(quantum_us as u64);
    }
}

/// Host wall clock: milliseconds since construction
#[cfg(feature = "std")]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn idle(&mut self, quantum_us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(quantum_us as u64));
    }
}
