//! ARM boot tags (ATAGs)
//!
//! The tagged list the ARM Linux kernel reads from the address in r2.
//! Reference: Documentation/arch/arm/booting.rst, "Setup the kernel tagged list"
//!
//! Every record is `{ size, tag, payload... }` in 32-bit words, where
//! `size` counts the two header words. The list starts with `ATAG_CORE`
//! and ends with an `ATAG_NONE` record whose size field is zero. There is
//! no index, a consumer walks the list by size, so a wrong size corrupts
//! every record after it.

mod builder;
mod reader;
mod writer;

use core::fmt;

pub use builder::{build_boot_tags, max_tag_words, BootTagParams, MemRegion, MemoryBanks, MemoryTags};
pub use reader::{check_atags, Tag, TagIter};
pub use writer::TagWriter;

/// End of list
pub const ATAG_NONE: u32 = 0x0000_0000;
/// First tag, always present
pub const ATAG_CORE: u32 = 0x5441_0001;
/// Physical memory bank
pub const ATAG_MEM: u32 = 0x5441_0002;
/// Initial ramdisk by physical address
pub const ATAG_INITRD2: u32 = 0x5442_0005;
/// Board revision
pub const ATAG_REVISION: u32 = 0x5441_0007;
/// Kernel command line
pub const ATAG_CMDLINE: u32 = 0x5441_0009;

/// Header words (size + tag) in front of every payload.
pub const TAG_HEADER_WORDS: usize = 2;

/// Fixed record sizes in words, header included.
pub const CORE_WORDS: usize = 5;
pub const MEM_WORDS: usize = 4;
pub const INITRD2_WORDS: usize = 4;
pub const REVISION_WORDS: usize = 3;
pub const NONE_WORDS: usize = 2;

/// Result type for tag operations
pub type Result<T> = core::result::Result<T, TagError>;

/// Tag list errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    /// A record does not fit in what is left of the buffer
    Overflow { needed: usize, remaining: usize },
    /// List does not start with ATAG_CORE
    MissingCore,
    /// Record at word offset declares an impossible size
    BadSize { offset: usize },
    /// Ran off the end of the buffer before ATAG_NONE
    Unterminated,
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { needed, remaining } => write!(
                f,
                "tag buffer overflow: need {} words, {} left",
                needed, remaining
            ),
            Self::MissingCore => write!(f, "tag list does not start with ATAG_CORE"),
            Self::BadSize { offset } => write!(f, "bad tag size at word {}", offset),
            Self::Unterminated => write!(f, "tag list not terminated"),
        }
    }
}
