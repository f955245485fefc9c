//! Kernel command line synthesis
//!
//! The command line is one of two fixed templates, picked by boot mode,
//! with the root device and a handful of `key=value` fragments from the
//! previous boot stage substituted in a fixed order. Fragments are passed
//! through untouched, the previous stage is trusted to hand over tokens
//! that are safe in a space separated argument string.

use core::fmt::{self, Write};

use bitflags::bitflags;

use crate::atags::TagIter;

/// Command line buffer size in bytes, terminator included.
pub const CMDLINE_CAPACITY: usize = 1024;

/// Fragments copied from the previous stage, in template order.
pub const FRAGMENT_KEYS: [&str; 6] = ["fb", "nduid", "klog", "klog_len", "boardtype", "lastboot"];

/// Command line errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdlineError {
    /// Assembled line does not fit in `CMDLINE_CAPACITY - 1` bytes
    Overflow,
}

impl fmt::Display for CmdlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "command line exceeds {} bytes", CMDLINE_CAPACITY - 1),
        }
    }
}

bitflags! {
    /// Boot mode policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BootFlags: u32 {
        /// Framebuffer console and boot logo instead of the serial console
        const VERBOSE = 1 << 0;
    }
}

impl BootFlags {
    /// Mode used when boot policy does not ask for one.
    pub const fn default_for_build() -> Self {
        if cfg!(feature = "verbose-default") {
            Self::VERBOSE
        } else {
            Self::empty()
        }
    }
}

/// Root filesystem device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootDevice {
    /// The initial ramdisk
    Ramdisk,
    /// Root partition on the eMMC
    Storage,
}

impl RootDevice {
    /// Root device for a boot with a ramdisk of `ramdisk_size` bytes.
    ///
    /// Depends on nothing else.
    pub const fn for_ramdisk(ramdisk_size: u32) -> Self {
        if ramdisk_size > 0 {
            Self::Ramdisk
        } else {
            Self::Storage
        }
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::Ramdisk => "/dev/ram0",
            Self::Storage => "/dev/mmcblk0p14",
        }
    }
}

impl fmt::Display for RootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Fixed-capacity command line.
///
/// Holds at most `CMDLINE_CAPACITY - 1` bytes so the terminator always
/// fits when the line is copied into ATAG_CMDLINE.
pub struct CmdlineBuf {
    buf: [u8; CMDLINE_CAPACITY],
    len: usize,
}

impl CmdlineBuf {
    pub const fn new() -> Self {
        Self {
            buf: [0; CMDLINE_CAPACITY],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only whole &str slices are ever appended.
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Visible bytes this buffer can hold.
    pub const fn capacity(&self) -> usize {
        CMDLINE_CAPACITY - 1
    }
}

impl Default for CmdlineBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for CmdlineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.capacity() {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

impl fmt::Debug for CmdlineBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// Lookup of named fragments handed over by an earlier boot stage.
pub trait FragmentSource {
    /// The `key=value` token for `key`, or `None` when the earlier stage
    /// did not provide one.
    fn fragment(&self, key: &str) -> Option<&str>;
}

/// Fragments taken from the ATAG_CMDLINE of the tag list the previous
/// stage booted us with.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassedTags<'a> {
    cmdline: Option<&'a str>,
}

impl<'a> PassedTags<'a> {
    /// Scan a tag list for its command line. A malformed list is read up
    /// to the first bad record.
    pub fn new(tags: &'a [u32]) -> Self {
        let cmdline = TagIter::new(tags)
            .map_while(Result::ok)
            .find_map(|tag| tag.cmdline());
        if cmdline.is_none() {
            log::debug!("no command line in passed tags");
        }
        Self { cmdline }
    }

    /// No previous stage information.
    pub const fn empty() -> Self {
        Self { cmdline: None }
    }

    /// Scan a tag list at a raw address.
    ///
    /// # Safety
    /// `ptr` must be null or point to `max_words` readable words that stay
    /// valid and unmodified for `'a`.
    pub unsafe fn from_raw(ptr: *const u32, max_words: usize) -> Self {
        if ptr.is_null() {
            return Self::empty();
        }
        Self::new(core::slice::from_raw_parts(ptr, max_words))
    }

    /// The previous stage's full command line.
    pub fn cmdline(&self) -> Option<&'a str> {
        self.cmdline
    }
}

impl FragmentSource for PassedTags<'_> {
    fn fragment(&self, key: &str) -> Option<&str> {
        self.cmdline?.split_ascii_whitespace().find(|tok| {
            *tok == key || tok.strip_prefix(key).is_some_and(|rest| rest.starts_with('='))
        })
    }
}

// A fragment renders as "token " when present and as nothing otherwise.
struct Fragment<'a>(Option<&'a str>);

impl fmt::Display for Fragment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(tok) => write!(f, "{} ", tok),
            None => Ok(()),
        }
    }
}

fn fragment<'a>(src: &'a dyn FragmentSource, key: &str) -> Fragment<'a> {
    Fragment(src.fragment(key))
}

/// Assemble the kernel command line into `out`.
///
/// On overflow `out` is left empty.
pub fn compose_cmdline(
    out: &mut CmdlineBuf,
    flags: BootFlags,
    root: RootDevice,
    fragments: &dyn FragmentSource,
) -> Result<(), CmdlineError> {
    let [fb, nduid, klog, klog_len, boardtype, lastboot] =
        FRAGMENT_KEYS.map(|key| fragment(fragments, key));

    out.clear();
    let written = if flags.contains(BootFlags::VERBOSE) {
        write!(
            out,
            "root={} rootwait rw logo.nologo console=tty1 {}{}{}{}{}{}",
            root, fb, nduid, klog, klog_len, boardtype, lastboot
        )
    } else {
        write!(
            out,
            "root={} rootwait ro fbcon=disable console=ttyS2,115200n8 {}{}{}{}{} lcd_enable_vsync {}",
            root, fb, nduid, klog, klog_len, boardtype, lastboot
        )
    };

    if written.is_err() {
        out.clear();
        return Err(CmdlineError::Overflow);
    }
    Ok(())
}
