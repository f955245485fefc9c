//! moboot core library
//!
//! Everything the final boot stage computes before it touches hardware:
//!
//! - `atags` - ARM boot tag (ATAG) stream writer, reader and validator
//! - `cmdline` - kernel command line synthesis from boot policy and
//!   fragments handed over by the previous boot stage
//! - `uimage` - legacy U-Boot uImage container check and parse
//! - `relocate` - overlap-safe payload moves between physical addresses
//!
//! Nothing in here performs I/O or touches CPU state, so the whole crate
//! builds and tests on the host.
//!
//! # Boot flow
//!
//! ```text
//! uimage::check ─> uimage::parse ─> relocate ─> cmdline ─> atags ─> handoff
//!                                                                   (bootloader crate)
//! ```

#![cfg_attr(not(test), no_std)]

pub mod atags;
pub mod cmdline;
pub mod crc32;
pub mod relocate;
pub mod uimage;

pub use atags::{
    build_boot_tags, check_atags, max_tag_words, BootTagParams, MemRegion, MemoryBanks,
    MemoryTags, Tag, TagError, TagIter, TagWriter,
};
pub use cmdline::{
    compose_cmdline, BootFlags, CmdlineBuf, CmdlineError, FragmentSource, PassedTags,
    RootDevice, CMDLINE_CAPACITY,
};
pub use relocate::{PhysMemory, RawPhysMemory, RelocateError, WindowMemory};
pub use uimage::{BootImage, UImageError};
