use std::time::Instant;

/// The tick frequency of [`Timebase`], in ticks per second.
///
/// Ticks are nanoseconds, so this is 10^9.
pub const TICKS_PER_SECOND: u64 = 1_000_000_000;

/// A monotonic tick source for probe timing.
///
/// All durations recorded by probes are expressed in raw ticks. Converting
/// them to wall-clock units is a presentation-time concern: divide by
/// [`Timebase::ticks_per_second`]. The frequency is never zero.
#[derive(Debug, Clone, Copy)]
pub struct Timebase {
    origin: Instant,
}

impl Timebase {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// The current tick count. Monotonically increasing.
    pub fn now(&self) -> u64 {
        // Assuming that this runs for less than 500 years.
        self.origin.elapsed().as_nanos() as u64
    }

    pub fn ticks_per_second(&self) -> u64 {
        TICKS_PER_SECOND
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::new()
    }
}
