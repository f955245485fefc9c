//! ATAG list walking.

use super::{Result, TagError, ATAG_CMDLINE, ATAG_CORE, NONE_WORDS, TAG_HEADER_WORDS};

/// One decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Tag identifier
    pub id: u32,
    /// Payload words, header excluded
    pub payload: &'a [u32],
    /// Word offset of the record header in the list
    pub offset: usize,
}

impl<'a> Tag<'a> {
    /// Total size in words, header included.
    pub fn words(&self) -> usize {
        TAG_HEADER_WORDS + self.payload.len()
    }

    /// Decode an ATAG_CMDLINE payload up to its first NUL.
    ///
    /// Returns `None` for other tags or a payload that is not UTF-8.
    pub fn cmdline(&self) -> Option<&'a str> {
        if self.id != ATAG_CMDLINE {
            return None;
        }
        // SAFETY: a [u32] is always valid to view as 4x as many bytes.
        let bytes = unsafe {
            core::slice::from_raw_parts(self.payload.as_ptr() as *const u8, self.payload.len() * 4)
        };
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        core::str::from_utf8(&bytes[..len]).ok()
    }
}

/// Iterator over the records of a tag list.
///
/// Stops after ATAG_NONE. A malformed record yields one `Err` and ends the
/// walk, so callers can either stop on the error or ignore it.
pub struct TagIter<'a> {
    buf: &'a [u32],
    pos: usize,
    done: bool,
    terminated: bool,
}

impl<'a> TagIter<'a> {
    pub fn new(buf: &'a [u32]) -> Self {
        Self {
            buf,
            pos: 0,
            done: false,
            terminated: false,
        }
    }

    /// Word offset of the next record to read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True once ATAG_NONE has been read.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn fail(&mut self, err: TagError) -> Option<Result<Tag<'a>>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = Result<Tag<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = self.pos;
        let Some(&size) = self.buf.get(offset) else {
            return self.fail(TagError::Unterminated);
        };

        if size == 0 {
            if offset + NONE_WORDS > self.buf.len() {
                return self.fail(TagError::Unterminated);
            }
            self.done = true;
            self.terminated = true;
            return None;
        }

        let size = size as usize;
        if size < TAG_HEADER_WORDS || size > self.buf.len() - offset {
            return self.fail(TagError::BadSize { offset });
        }

        self.pos += size;
        Some(Ok(Tag {
            id: self.buf[offset + 1],
            payload: &self.buf[offset + TAG_HEADER_WORDS..offset + size],
            offset,
        }))
    }
}

/// Validate a complete tag list.
///
/// The list must open with ATAG_CORE, every record must have a sane size
/// that stays inside `buf`, and an ATAG_NONE terminator must follow.
/// Returns the list length in words, terminator included.
pub fn check_atags(buf: &[u32]) -> Result<usize> {
    let mut iter = TagIter::new(buf);

    match iter.next() {
        Some(Ok(tag)) if tag.id == ATAG_CORE => {}
        Some(Err(e)) => return Err(e),
        _ => return Err(TagError::MissingCore),
    }

    for tag in iter.by_ref() {
        let tag = tag?;
        log::trace!("atag {:#010x} at {} ({} words)", tag.id, tag.offset, tag.words());
    }

    if !iter.is_terminated() {
        return Err(TagError::Unterminated);
    }
    Ok(iter.position() + NONE_WORDS)
}
