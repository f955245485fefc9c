//! Architecture-specific kernel entry

#[cfg(target_arch = "arm")]
pub mod arm;

#[cfg(target_arch = "arm")]
pub use arm::jump_to_kernel;

/// Other architectures cannot run an ARM zImage.
///
/// # Safety
/// Never returns; see the ARM version.
#[cfg(not(target_arch = "arm"))]
pub unsafe fn jump_to_kernel(_entry: u32, _machine_type: u32, _tags: u32) -> ! {
    panic!("Unsupported architecture for kernel boot");
}
