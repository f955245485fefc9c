//! Bounded ATAG writer.

use super::{
    Result, TagError, ATAG_CMDLINE, ATAG_CORE, ATAG_INITRD2, ATAG_MEM, ATAG_NONE, ATAG_REVISION,
    CORE_WORDS, INITRD2_WORDS, MEM_WORDS, NONE_WORDS, REVISION_WORDS, TAG_HEADER_WORDS,
};

/// Write cursor over a word buffer.
///
/// Each record is checked against the remaining capacity before the first
/// word is stored, so a failed push leaves the buffer exactly as it was.
pub struct TagWriter<'a> {
    buf: &'a mut [u32],
    pos: usize,
}

impl<'a> TagWriter<'a> {
    pub fn new(buf: &'a mut [u32]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Words written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Words still available.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The part of the buffer written so far.
    pub fn written(&self) -> &[u32] {
        &self.buf[..self.pos]
    }

    // Claim `words` words, or fail without side effects.
    fn reserve(&mut self, words: usize) -> Result<&mut [u32]> {
        let remaining = self.remaining();
        if words > remaining {
            return Err(TagError::Overflow {
                needed: words,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += words;
        Ok(&mut self.buf[start..start + words])
    }

    /// Append a record with an arbitrary word payload.
    pub fn push(&mut self, tag: u32, payload: &[u32]) -> Result<()> {
        let words = TAG_HEADER_WORDS + payload.len();
        let rec = self.reserve(words)?;
        rec[0] = words as u32;
        rec[1] = tag;
        rec[TAG_HEADER_WORDS..].copy_from_slice(payload);
        Ok(())
    }

    /// ATAG_CORE with the optional fields present but zeroed.
    pub fn core(&mut self) -> Result<()> {
        self.push(ATAG_CORE, &[0; CORE_WORDS - TAG_HEADER_WORDS])
    }

    /// ATAG_MEM for one bank. The payload is (size, start).
    pub fn mem(&mut self, start: u32, size: u32) -> Result<()> {
        debug_assert_eq!(MEM_WORDS, TAG_HEADER_WORDS + 2);
        self.push(ATAG_MEM, &[size, start])
    }

    /// ATAG_INITRD2: physical start of the ramdisk and its size in bytes.
    pub fn initrd2(&mut self, start: u32, size: u32) -> Result<()> {
        debug_assert_eq!(INITRD2_WORDS, TAG_HEADER_WORDS + 2);
        self.push(ATAG_INITRD2, &[start, size])
    }

    /// ATAG_REVISION
    pub fn revision(&mut self, rev: u32) -> Result<()> {
        debug_assert_eq!(REVISION_WORDS, TAG_HEADER_WORDS + 1);
        self.push(ATAG_REVISION, &[rev])
    }

    /// ATAG_CMDLINE. Nothing is written for an empty command line.
    ///
    /// The string is cut at its first NUL, then stored with a terminator in
    /// `(len + 4) & !3` bytes, i.e. `ceil((len + 1) / 4)` words. Bytes land
    /// in memory in string order whatever the CPU endianness. Padding after
    /// the terminator is zero.
    pub fn cmdline(&mut self, cmdline: &str) -> Result<()> {
        let bytes = cmdline.as_bytes();
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if len == 0 {
            return Ok(());
        }

        let n = (len + 4) & !3;
        let words = n / 4 + TAG_HEADER_WORDS;
        let rec = self.reserve(words)?;
        rec[0] = words as u32;
        rec[1] = ATAG_CMDLINE;

        let byte_at = |k: usize| if k < len { bytes[k] } else { 0 };
        for (i, word) in rec[TAG_HEADER_WORDS..].iter_mut().enumerate() {
            let k = i * 4;
            *word = u32::from_ne_bytes([byte_at(k), byte_at(k + 1), byte_at(k + 2), byte_at(k + 3)]);
        }
        Ok(())
    }

    /// ATAG_NONE, two zero words.
    pub fn none(&mut self) -> Result<()> {
        let rec = self.reserve(NONE_WORDS)?;
        rec[0] = 0;
        rec[1] = ATAG_NONE;
        Ok(())
    }

    /// Consume the writer, returning the number of words written.
    pub fn finish(self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_layout() {
        let mut buf = [0xFFFF_FFFFu32; 8];
        let mut w = TagWriter::new(&mut buf);
        w.core().unwrap();
        assert_eq!(w.position(), 5);
        assert_eq!(&buf[..5], &[5, ATAG_CORE, 0, 0, 0]);
        assert_eq!(buf[5], 0xFFFF_FFFF);
    }

    #[test]
    fn test_fixed_records() {
        let mut buf = [0u32; 16];
        let mut w = TagWriter::new(&mut buf);
        w.initrd2(0x0A00_0000, 0x1234).unwrap();
        w.mem(0x1000_0000, 0x0800_0000).unwrap();
        w.revision(7).unwrap();
        w.none().unwrap();
        assert_eq!(w.finish(), 4 + 4 + 3 + 2);
        assert_eq!(&buf[..4], &[4, ATAG_INITRD2, 0x0A00_0000, 0x1234]);
        assert_eq!(&buf[4..8], &[4, ATAG_MEM, 0x0800_0000, 0x1000_0000]);
        assert_eq!(&buf[8..11], &[3, ATAG_REVISION, 7]);
        assert_eq!(&buf[11..13], &[0, 0]);
    }

    #[test]
    fn test_cmdline_sizes() {
        // len -> payload words: ceil((len + 1) / 4)
        for (text, words) in [("a", 1), ("abc", 1), ("abcd", 2), ("abcdefg", 2), ("abcdefgh", 3)] {
            let mut buf = [0u32; 8];
            let mut w = TagWriter::new(&mut buf);
            w.cmdline(text).unwrap();
            assert_eq!(w.position(), 2 + words, "len {}", text.len());
            assert_eq!(buf[0] as usize, 2 + words);
            assert_eq!(buf[1], ATAG_CMDLINE);
        }
    }

    #[test]
    fn test_cmdline_bytes_and_padding() {
        let mut buf = [0xAAAA_AAAAu32; 6];
        let mut w = TagWriter::new(&mut buf);
        w.cmdline("rw quiet").unwrap();
        assert_eq!(w.position(), 5);

        let mut bytes = [0u8; 12];
        for (i, word) in buf[2..5].iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&word.to_ne_bytes());
        }
        assert_eq!(&bytes[..8], b"rw quiet");
        assert_eq!(&bytes[8..], &[0, 0, 0, 0]);
        assert_eq!(buf[5], 0xAAAA_AAAA);
    }

    #[test]
    fn test_empty_cmdline_writes_nothing() {
        let mut buf = [0u32; 4];
        let mut w = TagWriter::new(&mut buf);
        w.cmdline("").unwrap();
        w.cmdline("\0ignored").unwrap();
        assert_eq!(w.position(), 0);
    }

    #[test]
    fn test_overflow_is_atomic() {
        let mut buf = [0x5555_5555u32; 6];
        let mut w = TagWriter::new(&mut buf);
        w.core().unwrap();
        assert_eq!(
            w.mem(0, 0x100),
            Err(TagError::Overflow { needed: 4, remaining: 1 })
        );
        assert_eq!(w.position(), 5);
        assert_eq!(
            w.cmdline("console=ttyS2"),
            Err(TagError::Overflow { needed: 6, remaining: 1 })
        );
        assert_eq!(w.finish(), 5);
        assert_eq!(buf[5], 0x5555_5555);
    }

    #[test]
    fn test_exact_fit() {
        let mut buf = [0u32; 2];
        let mut w = TagWriter::new(&mut buf);
        w.none().unwrap();
        assert_eq!(w.remaining(), 0);
        assert!(w.none().is_err());
    }
}
