//! Payload relocation
//!
//! Kernel and ramdisk are moved from where the container sits to where
//! they run. Source and destination may overlap (a kernel linked a little
//! below the image it came in is common), so every move has memmove
//! semantics.

use core::fmt;
use core::ops::Range;

/// Relocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocateError {
    /// `addr + len` wraps the 32-bit physical address space
    AddressOverflow { addr: u32, len: u32 },
    /// Range lies outside the memory this mover can reach
    OutOfRange { addr: u32, len: u32 },
}

impl fmt::Display for RelocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOverflow { addr, len } => {
                write!(f, "range {:#010x}+{:#x} wraps address space", addr, len)
            }
            Self::OutOfRange { addr, len } => {
                write!(f, "range {:#010x}+{:#x} outside memory window", addr, len)
            }
        }
    }
}

/// Physical memory as seen by the loader.
pub trait PhysMemory {
    /// Copy `len` bytes from `src` to `dst`. Overlapping ranges are allowed
    /// and behave as if the source were first copied to a temporary.
    fn move_bytes(&mut self, dst: u32, src: u32, len: u32) -> Result<(), RelocateError>;
}

fn check_wrap(addr: u32, len: u32) -> Result<(), RelocateError> {
    match addr.checked_add(len) {
        Some(_) => Ok(()),
        None => Err(RelocateError::AddressOverflow { addr, len }),
    }
}

/// Direct access to identity-mapped physical memory.
pub struct RawPhysMemory {
    _private: (),
}

impl RawPhysMemory {
    /// # Safety
    /// Physical addresses must be identity mapped, and every range later
    /// passed to `move_bytes` must be RAM the loader may overwrite.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PhysMemory for RawPhysMemory {
    fn move_bytes(&mut self, dst: u32, src: u32, len: u32) -> Result<(), RelocateError> {
        check_wrap(src, len)?;
        check_wrap(dst, len)?;
        if len == 0 || src == dst {
            return Ok(());
        }
        // SAFETY: the constructor contract makes both ranges valid; ptr::copy
        // is memmove and handles the overlap.
        unsafe {
            core::ptr::copy(src as usize as *const u8, dst as usize as *mut u8, len as usize);
        }
        Ok(())
    }
}

/// A window of physical memory backed by a byte slice.
///
/// Address `base` maps to `bytes[0]`. Anything outside the window is
/// rejected instead of touched, which makes this the mover of choice for
/// tests and for staging into a known buffer.
pub struct WindowMemory<'a> {
    base: u32,
    bytes: &'a mut [u8],
}

impl<'a> WindowMemory<'a> {
    pub fn new(base: u32, bytes: &'a mut [u8]) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    fn range(&self, addr: u32, len: u32) -> Result<Range<usize>, RelocateError> {
        check_wrap(addr, len)?;
        let out = RelocateError::OutOfRange { addr, len };
        let start = addr.checked_sub(self.base).ok_or(out)? as usize;
        let end = start + len as usize;
        if end > self.bytes.len() {
            return Err(out);
        }
        Ok(start..end)
    }

    /// Bytes at `addr..addr + len`.
    pub fn read(&self, addr: u32, len: u32) -> Result<&[u8], RelocateError> {
        let r = self.range(addr, len)?;
        Ok(&self.bytes[r])
    }

    /// Store `data` at `addr`.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), RelocateError> {
        let r = self.range(addr, data.len() as u32)?;
        self.bytes[r].copy_from_slice(data);
        Ok(())
    }
}

impl PhysMemory for WindowMemory<'_> {
    fn move_bytes(&mut self, dst: u32, src: u32, len: u32) -> Result<(), RelocateError> {
        let from = self.range(src, len)?;
        let to = self.range(dst, len)?;
        self.bytes.copy_within(from, to.start);
        Ok(())
    }
}
