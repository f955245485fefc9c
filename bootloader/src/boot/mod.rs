// Boot module - uImage pipeline, ATAG list and kernel handoff

pub mod arch;
pub mod handoff;
pub mod loader;

pub use handoff::{boot_linux_direct, NoPlatform, Platform};
pub use loader::{
    boot_linux_atags, boot_uimage_mem, stage_uimage, BootContext, BootError, StagedKernel,
};
