//! Hardware layer for the moboot loader
//!
//! Thin wrappers over the few pieces of the SoC the last boot stage
//! touches:
//!
//! - CPU state: interrupt masking, L1 caches and MMU (CP15)
//! - Critical sections for the kernel handoff
//! - GPIO input lines for the front-panel keys
//! - Busy-wait delays
//!
//! Every hardware access has a host stand-in so the crates above can be
//! tested with `cargo test`.

#![cfg_attr(not(test), no_std)]

pub mod cpu;
pub mod gpio;
pub mod sync;
pub mod timer;

// ═══════════════════════════════════════════════════════════════════════════
// CPU
// ═══════════════════════════════════════════════════════════════════════════

pub use cpu::cache::{disable_cache, disable_mmu, CacheSet};
pub use cpu::irq::{disable_interrupts, enable_interrupts, interrupts_enabled};

// ═══════════════════════════════════════════════════════════════════════════
// SYNC
// ═══════════════════════════════════════════════════════════════════════════

pub use sync::{enter_critical_section, without_interrupts, CriticalSection, InterruptGuard};

// ═══════════════════════════════════════════════════════════════════════════
// DEVICES
// ═══════════════════════════════════════════════════════════════════════════

pub use gpio::{GpioInput, MmioGpio};
pub use timer::{Delay, SpinDelay};
