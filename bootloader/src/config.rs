//! Board configuration
//!
//! Everything board-specific the loader needs is a field of
//! [`BoardConfig`]. Profiles are `const`s so they end up in `.rodata`
//! and cost nothing at runtime.

use moboot_core::atags::MEM_WORDS;
use moboot_core::{max_tag_words, MemRegion, MemoryBanks, CMDLINE_CAPACITY};

use crate::keys::KeyLines;

/// Fixed physical layout and wiring of one board.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    /// Where the ramdisk is copied before boot
    pub ramdisk_addr: u32,
    /// Physical address of the boot tag list handed to the kernel
    pub tags_addr: u32,
    /// Capacity of the tag area in words
    pub tags_words: usize,
    /// ARM Linux machine type, passed in r1
    pub machine_type: u32,
    /// Board revision for ATAG_REVISION
    pub revision: u32,
    /// RAM banks, one ATAG_MEM each
    pub memory: &'static [MemRegion],
    /// GPIO lines of the front-panel keys
    pub keys: KeyLines,
    /// Key sampling interval in milliseconds
    pub poll_interval_ms: u32,
}

const PRE3_MEMORY: [MemRegion; 2] = [
    MemRegion::new(0x0020_0000, 0x0FE0_0000),
    MemRegion::new(0x4000_0000, 0x1000_0000),
];

impl BoardConfig {
    /// HP Pre 3 (MSM8x55).
    pub const PRE3: BoardConfig = BoardConfig {
        ramdisk_addr: 0x0A00_0000,
        tags_addr: 0x0020_0100,
        tags_words: max_tag_words(PRE3_MEMORY.len() * MEM_WORDS, CMDLINE_CAPACITY),
        machine_type: 2679,
        revision: 0,
        memory: &PRE3_MEMORY,
        keys: KeyLines {
            up: 40,
            down: 41,
            select: 42,
        },
        poll_interval_ms: 20,
    };

    /// Memory records for the tag list.
    pub const fn memory_tags(&self) -> MemoryBanks<'static> {
        MemoryBanks::new(self.memory)
    }

    /// The tag area at `tags_addr`.
    ///
    /// # Safety
    /// `tags_addr` must be identity-mapped RAM of at least `tags_words`
    /// words that nothing else uses, and the returned slice must be the
    /// only reference to it.
    pub unsafe fn tag_area(&self) -> &'static mut [u32] {
        core::slice::from_raw_parts_mut(self.tags_addr as usize as *mut u32, self.tags_words)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::PRE3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre3_layout_is_consistent() {
        let cfg = BoardConfig::PRE3;
        let tags_end = cfg.tags_addr + (cfg.tags_words * 4) as u32;

        // Tag area and ramdisk destination live in the first bank and do
        // not overlap.
        let bank = cfg.memory[0];
        assert!(cfg.tags_addr >= bank.start && tags_end <= bank.start + bank.size);
        assert!(cfg.ramdisk_addr >= tags_end);
        assert!(cfg.ramdisk_addr < bank.start + bank.size);
        assert_eq!(cfg.poll_interval_ms, 20);
    }
}
