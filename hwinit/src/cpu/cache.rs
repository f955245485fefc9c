//! Cache and MMU control (ARMv7-A, CP15).
//!
//! The kernel expects to be entered with the MMU off and the data cache
//! off, with everything it was loaded into already written back to RAM.
//! `disable_cache` and `disable_mmu` get the CPU into that state.
//!
//! Host builds model SCTLR in an atomic; maintenance operations become
//! fences.

use bitflags::bitflags;

use super::barriers::{dsb, isb};

bitflags! {
    /// Which L1 caches an operation applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CacheSet: u32 {
        const DCACHE = 1 << 0;
        const ICACHE = 1 << 1;
        const UCACHE = Self::DCACHE.bits() | Self::ICACHE.bits();
    }
}

/// SCTLR.M, MMU enable
pub const SCTLR_M: u32 = 1 << 0;
/// SCTLR.C, data and unified cache enable
pub const SCTLR_C: u32 = 1 << 2;
/// SCTLR.I, instruction cache enable
pub const SCTLR_I: u32 = 1 << 12;

// ═══════════════════════════════════════════════════════════════════════════
// SCTLR ACCESS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_arch = "arm")]
#[inline(always)]
pub fn read_sctlr() -> u32 {
    let v: u32;
    unsafe { core::arch::asm!("mrc p15, 0, {}, c1, c0, 0", out(reg) v, options(nostack, preserves_flags)) }
    v
}

#[cfg(target_arch = "arm")]
#[inline(always)]
fn write_sctlr(v: u32) {
    unsafe { core::arch::asm!("mcr p15, 0, {}, c1, c0, 0", in(reg) v, options(nostack, preserves_flags)) }
    isb();
}

#[cfg(not(target_arch = "arm"))]
static HOST_SCTLR: core::sync::atomic::AtomicU32 =
    core::sync::atomic::AtomicU32::new(SCTLR_M | SCTLR_C | SCTLR_I);

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn read_sctlr() -> u32 {
    HOST_SCTLR.load(core::sync::atomic::Ordering::SeqCst)
}

#[cfg(not(target_arch = "arm"))]
fn write_sctlr(v: u32) {
    HOST_SCTLR.store(v, core::sync::atomic::Ordering::SeqCst);
}

// ═══════════════════════════════════════════════════════════════════════════
// MAINTENANCE
// ═══════════════════════════════════════════════════════════════════════════

/// Clean and invalidate every data cache level up to the level of
/// coherency, by set/way.
#[cfg(target_arch = "arm")]
pub fn clean_invalidate_dcache_all() {
    let clidr: u32;
    unsafe { core::arch::asm!("mrc p15, 1, {}, c0, c0, 1", out(reg) clidr, options(nostack, preserves_flags)) }
    let loc = (clidr >> 24) & 0x7;

    dsb();
    for level in 0..loc {
        // Cache type 2 and up means a data or unified cache at this level.
        if (clidr >> (level * 3)) & 0x7 < 2 {
            continue;
        }

        let ccsidr: u32;
        unsafe {
            core::arch::asm!("mcr p15, 2, {}, c0, c0, 0", in(reg) level << 1, options(nostack, preserves_flags));
            core::arch::asm!("isb", options(nostack, preserves_flags));
            core::arch::asm!("mrc p15, 1, {}, c0, c0, 0", out(reg) ccsidr, options(nostack, preserves_flags));
        }

        let line_shift = (ccsidr & 0x7) + 4;
        let max_way = (ccsidr >> 3) & 0x3FF;
        let max_set = (ccsidr >> 13) & 0x7FFF;
        let way_shift = if max_way == 0 { 0 } else { max_way.leading_zeros() };

        for way in 0..=max_way {
            for set in 0..=max_set {
                let sw = (way << way_shift) | (set << line_shift) | (level << 1);
                unsafe {
                    core::arch::asm!("mcr p15, 0, {}, c7, c14, 2", in(reg) sw, options(nostack, preserves_flags));
                }
            }
        }
    }
    dsb();
    isb();
}

/// Invalidate the whole instruction cache and the branch predictor.
#[cfg(target_arch = "arm")]
pub fn invalidate_icache_all() {
    unsafe {
        core::arch::asm!(
            "mcr p15, 0, {z}, c7, c5, 0",
            "mcr p15, 0, {z}, c7, c5, 6",
            z = in(reg) 0u32,
            options(nostack, preserves_flags)
        );
    }
    dsb();
    isb();
}

#[cfg(target_arch = "arm")]
fn invalidate_tlb_all() {
    unsafe {
        core::arch::asm!("mcr p15, 0, {}, c8, c7, 0", in(reg) 0u32, options(nostack, preserves_flags));
    }
    dsb();
    isb();
}

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn clean_invalidate_dcache_all() {
    dsb();
}

/// Host stand-in.
#[cfg(not(target_arch = "arm"))]
pub fn invalidate_icache_all() {
    isb();
}

#[cfg(not(target_arch = "arm"))]
fn invalidate_tlb_all() {
    dsb();
}

// ═══════════════════════════════════════════════════════════════════════════
// SHUTDOWN
// ═══════════════════════════════════════════════════════════════════════════

/// Turn off the selected L1 caches.
///
/// The data cache is written back before SCTLR.C is cleared so no dirty
/// line is left behind once accesses go straight to RAM. Call with
/// interrupts masked.
pub fn disable_cache(which: CacheSet) {
    if which.contains(CacheSet::DCACHE) {
        clean_invalidate_dcache_all();
        write_sctlr(read_sctlr() & !SCTLR_C);
        dsb();
    }
    if which.contains(CacheSet::ICACHE) {
        write_sctlr(read_sctlr() & !SCTLR_I);
        invalidate_icache_all();
    }
    log::trace!("cache off: {:?}, sctlr={:#010x}", which, read_sctlr());
}

/// Turn off the MMU. The loader runs identity mapped, so execution
/// continues at the same addresses.
pub fn disable_mmu() {
    write_sctlr(read_sctlr() & !SCTLR_M);
    invalidate_tlb_all();
}
