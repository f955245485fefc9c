//! moboot - final boot stage for ARM Linux
//!
//! Takes a legacy uImage that an earlier stage already placed in memory,
//! moves kernel and ramdisk to where they run, builds the ATAG list and
//! the kernel command line, and jumps.
//!
//! ```ignore
//! use moboot::{boot, config::BoardConfig, logger};
//! use moboot_core::{PassedTags, RawPhysMemory, BootFlags};
//!
//! logger::init_logging(log::LevelFilter::Info, Some(console_puts))?;
//!
//! let board = BoardConfig::PRE3;
//! let mut memory = unsafe { RawPhysMemory::new() };
//! let banks = board.memory_tags();
//! let passed = unsafe { PassedTags::from_raw(passed_atags, 256) };
//! let mut ctx = boot::BootContext {
//!     config: &board,
//!     memory: &mut memory,
//!     memory_tags: &banks,
//!     fragments: &passed,
//!     tag_area: unsafe { board.tag_area() },
//! };
//!
//! // Only comes back if the image is unusable.
//! let err = unsafe {
//!     boot::boot_uimage_mem(&mut ctx, &mut platform, image, image_addr, BootFlags::default_for_build(), None)
//! };
//! ```
//!
//! Hold SELECT during power-on and the board can use [`keys::GpioKeys`]
//! to pick a verbose boot instead.

#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod config;
pub mod keys;
pub mod logger;

pub use boot::{BootContext, BootError, Platform, StagedKernel};
pub use config::BoardConfig;
pub use keys::{GpioKeys, KeyLines, Keys};
pub use logger::{init_logging, BootLogger, LogRing};
