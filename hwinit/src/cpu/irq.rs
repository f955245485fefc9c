//! Interrupt masking.
//!
//! On ARM the I and F bits of CPSR are driven directly. Host builds keep
//! the mask in an atomic so code above this layer behaves the same under
//! `cargo test`.

#[cfg(target_arch = "arm")]
const CPSR_I: u32 = 1 << 7;

/// Mask IRQ and FIQ.
#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn disable_interrupts() {
    unsafe { core::arch::asm!("cpsid if", options(nostack, preserves_flags)) }
}

/// Unmask IRQ. FIQ stays masked, nothing at this stage routes it.
#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn enable_interrupts() {
    unsafe { core::arch::asm!("cpsie i", options(nostack, preserves_flags)) }
}

/// Check if IRQs are enabled.
#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    let cpsr: u32;
    unsafe { core::arch::asm!("mrs {}, cpsr", out(reg) cpsr, options(nomem, nostack, preserves_flags)) }
    cpsr & CPSR_I == 0
}

#[cfg(not(target_arch = "arm"))]
static HOST_IRQ_ENABLED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(true);

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn disable_interrupts() {
    HOST_IRQ_ENABLED.store(false, core::sync::atomic::Ordering::SeqCst);
}

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn enable_interrupts() {
    HOST_IRQ_ENABLED.store(true, core::sync::atomic::Ordering::SeqCst);
}

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn interrupts_enabled() -> bool {
    HOST_IRQ_ENABLED.load(core::sync::atomic::Ordering::SeqCst)
}
