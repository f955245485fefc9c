//! ARM kernel entry
//!
//! Register contract from Documentation/arch/arm/booting.rst:
//!
//! | Reg | Value                            |
//! |-----|----------------------------------|
//! | r0  | 0                                |
//! | r1  | machine type                     |
//! | r2  | physical address of the tag list |
//!
//! CPU in SVC mode, IRQ and FIQ masked, MMU off, D-cache off.

/// Branch to the kernel. Does NOT return.
///
/// # Safety
/// `entry` must be the entry point of a relocated kernel and `tags` a
/// valid tag list; caches and MMU must already be off.
#[inline(always)]
pub unsafe fn jump_to_kernel(entry: u32, machine_type: u32, tags: u32) -> ! {
    core::arch::asm!(
        "bx {entry}",
        entry = in(reg) entry,
        in("r0") 0u32,
        in("r1") machine_type,
        in("r2") tags,
        options(noreturn, nostack),
    )
}
