// Kernel boot handoff

use moboot_hwinit::{disable_cache, disable_mmu, enter_critical_section, CacheSet};

use super::arch::jump_to_kernel;

/// Board hooks run right before the caches go off.
pub trait Platform {
    /// Quiesce devices: stop DMA, mask interrupt sources, flush display.
    fn uninit(&mut self);
}

/// A board with nothing to shut down.
pub struct NoPlatform;

impl Platform for NoPlatform {
    fn uninit(&mut self) {}
}

/// Jump to a relocated kernel.
///
/// Enters a critical section for good, runs the platform hooks, turns off
/// both L1 caches and the MMU, then branches to `entry` with r0=0,
/// r1=`machine_type`, r2=`tags`. This function does not return!
///
/// # Safety
/// `entry` must point at a kernel image in RAM and `tags` at a valid tag
/// list. The loader runs identity mapped.
pub unsafe fn boot_linux_direct(
    entry: u32,
    machine_type: u32,
    tags: u32,
    platform: &mut dyn Platform,
) -> ! {
    log::info!("tags: {:#010x}", tags);
    log::info!("entering critical section");
    core::mem::forget(enter_critical_section());

    platform.uninit();
    disable_cache(CacheSet::UCACHE);
    disable_mmu();

    jump_to_kernel(entry, machine_type, tags)
}
