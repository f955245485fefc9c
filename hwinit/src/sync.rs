//! Synchronization primitives
//!
//! The loader is single-core, so mutual exclusion is just interrupt
//! masking. Two flavours:
//!
//! - `InterruptGuard` - scoped, restores the previous mask state on drop
//! - `CriticalSection` - nesting, interrupts come back only when the
//!   outermost section is left. The kernel handoff enters one and never
//!   leaves it.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cpu::irq::{disable_interrupts, enable_interrupts, interrupts_enabled};

// ═══════════════════════════════════════════════════════════════════════════
// INTERRUPT GUARD
// ═══════════════════════════════════════════════════════════════════════════

/// RAII guard that disables interrupts.
///
/// Restores the previous interrupt state on drop.
pub struct InterruptGuard {
    was_enabled: bool,
}

impl InterruptGuard {
    /// Disable interrupts and return a guard that restores on drop.
    #[inline]
    pub fn new() -> Self {
        let was_enabled = interrupts_enabled();
        disable_interrupts();
        Self { was_enabled }
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    #[inline]
    fn drop(&mut self) {
        if self.was_enabled {
            enable_interrupts();
        }
    }
}

/// Execute a closure with interrupts disabled.
#[inline]
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = InterruptGuard::new();
    f()
}

// ═══════════════════════════════════════════════════════════════════════════
// CRITICAL SECTION
// ═══════════════════════════════════════════════════════════════════════════

static DEPTH: AtomicUsize = AtomicUsize::new(0);
static RESTORE: AtomicBool = AtomicBool::new(false);

/// Token for being inside a critical section.
///
/// Dropping it leaves the section. `mem::forget` it to stay inside for
/// good, which is what a jump that never returns wants.
#[must_use = "dropping the token leaves the critical section immediately"]
pub struct CriticalSection {
    _private: (),
}

/// Enter a (possibly nested) critical section.
pub fn enter_critical_section() -> CriticalSection {
    let was_enabled = interrupts_enabled();
    disable_interrupts();
    if DEPTH.fetch_add(1, Ordering::SeqCst) == 0 {
        RESTORE.store(was_enabled, Ordering::SeqCst);
    }
    CriticalSection { _private: () }
}

/// Current nesting depth.
pub fn critical_section_depth() -> usize {
    DEPTH.load(Ordering::SeqCst)
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if DEPTH.fetch_sub(1, Ordering::SeqCst) == 1 && RESTORE.load(Ordering::SeqCst) {
            enable_interrupts();
        }
    }
}
