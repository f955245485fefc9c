//! Boot tag list assembly.

use super::{
    Result, TagWriter, CORE_WORDS, INITRD2_WORDS, MEM_WORDS, NONE_WORDS, REVISION_WORDS,
    TAG_HEADER_WORDS,
};

/// A physical memory range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    pub start: u32,
    pub size: u32,
}

impl MemRegion {
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }
}

/// Source of the memory description records.
///
/// Boards describe their RAM differently, so the memory section of the
/// list is delegated to this trait.
pub trait MemoryTags {
    /// Append zero or more records describing system memory.
    fn append(&self, tags: &mut TagWriter<'_>) -> Result<()>;

    /// Upper bound on the words `append` writes.
    fn max_words(&self) -> usize;
}

/// Memory description from a static bank table, one ATAG_MEM per bank.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBanks<'a> {
    banks: &'a [MemRegion],
}

impl<'a> MemoryBanks<'a> {
    pub const fn new(banks: &'a [MemRegion]) -> Self {
        Self { banks }
    }
}

impl MemoryTags for MemoryBanks<'_> {
    fn append(&self, tags: &mut TagWriter<'_>) -> Result<()> {
        for bank in self.banks.iter().filter(|b| b.size != 0) {
            tags.mem(bank.start, bank.size)?;
        }
        Ok(())
    }

    fn max_words(&self) -> usize {
        self.banks.len() * MEM_WORDS
    }
}

/// Everything that goes into the list apart from memory.
#[derive(Debug, Clone, Copy)]
pub struct BootTagParams<'a> {
    /// Physical address the ramdisk was copied to
    pub ramdisk_start: u32,
    /// Ramdisk size in bytes, 0 for none
    pub ramdisk_size: u32,
    /// Board revision for ATAG_REVISION
    pub revision: u32,
    /// Kernel command line, may be empty
    pub cmdline: &'a str,
}

/// Build the complete tag list into `buf`.
///
/// Record order is fixed: CORE, INITRD2 (only with a ramdisk), the memory
/// records, REVISION, CMDLINE (only when non-empty), NONE. Returns the
/// number of words written.
pub fn build_boot_tags(
    buf: &mut [u32],
    params: &BootTagParams<'_>,
    memory: &dyn MemoryTags,
) -> Result<usize> {
    let mut tags = TagWriter::new(buf);

    tags.core()?;

    if params.ramdisk_size != 0 {
        tags.initrd2(params.ramdisk_start, params.ramdisk_size)?;
    }

    memory.append(&mut tags)?;

    tags.revision(params.revision)?;
    tags.cmdline(params.cmdline)?;
    tags.none()?;

    Ok(tags.finish())
}

/// Worst-case list size for a given memory section and command line
/// capacity (in bytes, terminator included).
pub const fn max_tag_words(memory_words: usize, cmdline_capacity: usize) -> usize {
    CORE_WORDS
        + INITRD2_WORDS
        + memory_words
        + REVISION_WORDS
        + TAG_HEADER_WORDS
        + (cmdline_capacity + 3) / 4
        + NONE_WORDS
}
