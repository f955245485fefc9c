//! Delays.

/// Blocking millisecond sleep.
pub trait Delay {
    fn sleep_ms(&mut self, ms: u32);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn sleep_ms(&mut self, ms: u32) {
        (**self).sleep_ms(ms)
    }
}

/// Busy-wait delay calibrated in loop iterations per millisecond.
///
/// Good enough for key debouncing; nothing here needs a real clock.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay {
    loops_per_ms: u32,
}

impl SpinDelay {
    pub const fn new(loops_per_ms: u32) -> Self {
        Self { loops_per_ms }
    }
}

impl Delay for SpinDelay {
    fn sleep_ms(&mut self, ms: u32) {
        let loops = ms as u64 * self.loops_per_ms as u64;
        for _ in 0..loops {
            core::hint::spin_loop();
        }
    }
}
