//! Memory barriers.
//!
//! ARMv7 barrier instructions. Other targets get a SeqCst fence so host
//! builds keep the same ordering guarantees.

/// Data synchronization barrier: all prior memory accesses and cache or
/// TLB maintenance complete before the next instruction.
#[inline(always)]
pub fn dsb() {
    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!("dsb", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "arm"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Instruction synchronization barrier: flush the pipeline so later
/// instructions see the effect of prior system register writes.
#[inline(always)]
pub fn isb() {
    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!("isb", options(nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "arm"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
