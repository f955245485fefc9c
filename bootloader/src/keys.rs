//! Front-panel keys
//!
//! The keys pull their GPIO line low while held. [`GpioKeys::poll`] is a
//! plain sample; [`GpioKeys::wait_select`] blocks until SELECT has been
//! pressed and released.

use bitflags::bitflags;
use moboot_hwinit::{Delay, GpioInput};

use crate::config::BoardConfig;

bitflags! {
    /// Logical key bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Keys: u32 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const SELECT = 1 << 2;
        const ALL = Self::UP.bits() | Self::DOWN.bits() | Self::SELECT.bits();
    }
}

/// GPIO line of each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLines {
    pub up: u32,
    pub down: u32,
    pub select: u32,
}

/// Key poller over a GPIO controller and a delay source.
pub struct GpioKeys<G: GpioInput, D: Delay> {
    gpio: G,
    delay: D,
    lines: KeyLines,
    interval_ms: u32,
}

impl<G: GpioInput, D: Delay> GpioKeys<G, D> {
    pub fn new(gpio: G, delay: D, lines: KeyLines, interval_ms: u32) -> Self {
        Self {
            gpio,
            delay,
            lines,
            interval_ms,
        }
    }

    /// Poller wired and paced as `board` says.
    pub fn for_board(gpio: G, delay: D, board: &BoardConfig) -> Self {
        Self::new(gpio, delay, board.keys, board.poll_interval_ms)
    }

    /// Keys out of `mask` that are held right now.
    pub fn poll(&self, mask: Keys) -> Keys {
        let mut held = Keys::empty();
        for (key, line) in [
            (Keys::UP, self.lines.up),
            (Keys::DOWN, self.lines.down),
            (Keys::SELECT, self.lines.select),
        ] {
            if mask.contains(key) && !self.gpio.read_line(line) {
                held |= key;
            }
        }
        held
    }

    fn sleep(&mut self) {
        self.delay.sleep_ms(self.interval_ms);
    }

    /// Block until a press that includes SELECT is fully released.
    ///
    /// Keys already held on entry are waited out first. After that every
    /// transition from "something held" to "nothing held" is a release;
    /// only a release whose last held sample had SELECT in it returns.
    /// There is no timeout.
    pub fn wait_select(&mut self) {
        while !self.poll(Keys::ALL).is_empty() {
            self.sleep();
        }

        let mut prev = self.poll(Keys::ALL);
        while prev.is_empty() {
            self.sleep();
            prev = self.poll(Keys::ALL);
        }
        log::trace!("key press {:?}", prev);

        loop {
            self.sleep();
            let keys = self.poll(Keys::ALL);
            if !prev.is_empty() && keys.is_empty() && prev.contains(Keys::SELECT) {
                log::debug!("select released");
                return;
            }
            prev = keys;
        }
    }

    pub fn into_parts(self) -> (G, D) {
        (self.gpio, self.delay)
    }
}
