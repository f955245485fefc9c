//! Legacy U-Boot image (uImage) container
//!
//! Reference: u-boot include/image.h, "Legacy format image header"
//!
//! ```text
//! 0x00  ih_magic   0x27051956
//! 0x04  ih_hcrc    CRC32 of the header with this field zeroed
//! 0x08  ih_time
//! 0x0c  ih_size    payload size
//! 0x10  ih_load    load address
//! 0x14  ih_ep      entry point
//! 0x18  ih_dcrc    CRC32 of the payload
//! 0x1c  ih_os, ih_arch, ih_type, ih_comp
//! 0x20  ih_name[32]
//! ```
//!
//! All words are big-endian. A multi-file image (`IH_TYPE_MULTI`) starts
//! its payload with a table of big-endian sizes ended by a zero word; the
//! images follow, each padded to 4 bytes. Image 0 is the kernel, image 1
//! (if any) the ramdisk.

use core::fmt;

use crate::crc32;

pub const IH_MAGIC: u32 = 0x2705_1956;
pub const HEADER_SIZE: usize = 64;
pub const NAME_LEN: usize = 32;

pub const IH_OS_LINUX: u8 = 5;
pub const IH_ARCH_ARM: u8 = 2;
pub const IH_TYPE_KERNEL: u8 = 2;
pub const IH_TYPE_RAMDISK: u8 = 3;
pub const IH_TYPE_MULTI: u8 = 4;
pub const IH_COMP_NONE: u8 = 0;

/// Result type for uImage operations
pub type Result<T> = core::result::Result<T, UImageError>;

/// uImage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UImageError {
    /// Blob shorter than a header
    TooShort,
    /// ih_magic mismatch
    BadMagic,
    /// Header CRC mismatch
    HeaderChecksum,
    /// Blob shorter than header + ih_size
    Truncated,
    /// Payload CRC mismatch
    DataChecksum,
    /// Built for another architecture
    WrongArch(u8),
    /// Payload compressed, we only boot raw images
    Compressed(u8),
    /// Not a kernel or multi-file image
    UnsupportedType(u8),
    /// Multi-file size table runs past the payload
    BadMultiTable,
    /// Component address wraps the 32-bit address space
    AddressOverflow,
}

impl fmt::Display for UImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "image shorter than uImage header"),
            Self::BadMagic => write!(f, "bad uImage magic"),
            Self::HeaderChecksum => write!(f, "uImage header checksum mismatch"),
            Self::Truncated => write!(f, "uImage payload truncated"),
            Self::DataChecksum => write!(f, "uImage data checksum mismatch"),
            Self::WrongArch(a) => write!(f, "uImage built for arch {}, not ARM", a),
            Self::Compressed(c) => write!(f, "compressed uImage (type {}) not supported", c),
            Self::UnsupportedType(t) => write!(f, "unsupported uImage type {}", t),
            Self::BadMultiTable => write!(f, "corrupt multi-file size table"),
            Self::AddressOverflow => write!(f, "image component address overflow"),
        }
    }
}

/// What the pipeline needs to know about a parsed image.
///
/// `kernel_addr` and `ramdisk_addr` are where the payloads sit inside the
/// container right now, `kernel_load` is where the kernel must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootImage {
    pub kernel_load: u32,
    pub kernel_entry: u32,
    pub kernel_size: u32,
    pub kernel_addr: u32,
    pub ramdisk_addr: u32,
    pub ramdisk_size: u32,
}

/// Decoded uImage header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub hcrc: u32,
    pub time: u32,
    pub size: u32,
    pub load: u32,
    pub ep: u32,
    pub dcrc: u32,
    pub os: u8,
    pub arch: u8,
    pub image_type: u8,
    pub comp: u8,
    pub name: [u8; NAME_LEN],
}

fn be32(data: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

impl ImageHeader {
    /// Decode the header at the start of `data`. Only the magic is checked.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(UImageError::TooShort);
        }
        if be32(data, 0x00) != IH_MAGIC {
            return Err(UImageError::BadMagic);
        }

        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&data[0x20..0x20 + NAME_LEN]);

        Ok(Self {
            hcrc: be32(data, 0x04),
            time: be32(data, 0x08),
            size: be32(data, 0x0c),
            load: be32(data, 0x10),
            ep: be32(data, 0x14),
            dcrc: be32(data, 0x18),
            os: data[0x1c],
            arch: data[0x1d],
            image_type: data[0x1e],
            comp: data[0x1f],
            name,
        })
    }

    /// Encode with `hcrc` as stored.
    fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        for (off, word) in [
            (0x00, IH_MAGIC),
            (0x04, self.hcrc),
            (0x08, self.time),
            (0x0c, self.size),
            (0x10, self.load),
            (0x14, self.ep),
            (0x18, self.dcrc),
        ] {
            out[off..off + 4].copy_from_slice(&word.to_be_bytes());
        }
        out[0x1c] = self.os;
        out[0x1d] = self.arch;
        out[0x1e] = self.image_type;
        out[0x1f] = self.comp;
        out[0x20..].copy_from_slice(&self.name);
        out
    }

    /// Header CRC as it should be stored.
    pub fn compute_hcrc(&self) -> u32 {
        let mut bare = *self;
        bare.hcrc = 0;
        crc32::checksum(&bare.encode())
    }

    /// Encode with a freshly computed `hcrc`, the way mkimage writes it.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut sealed = *self;
        sealed.hcrc = self.compute_hcrc();
        sealed.encode()
    }

    /// Image name up to the first NUL.
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }
}

/// Verify magic, header CRC, payload length and payload CRC.
pub fn check(data: &[u8]) -> Result<ImageHeader> {
    let hdr = ImageHeader::read(data)?;

    if hdr.compute_hcrc() != hdr.hcrc {
        return Err(UImageError::HeaderChecksum);
    }

    let payload = payload(data, &hdr)?;
    if crc32::checksum(payload) != hdr.dcrc {
        return Err(UImageError::DataChecksum);
    }

    log::debug!(
        "uImage '{}': {} bytes, type {}, load {:#010x}, ep {:#010x}",
        hdr.name(),
        hdr.size,
        hdr.image_type,
        hdr.load,
        hdr.ep
    );
    Ok(hdr)
}

fn payload<'a>(data: &'a [u8], hdr: &ImageHeader) -> Result<&'a [u8]> {
    let end = HEADER_SIZE
        .checked_add(hdr.size as usize)
        .ok_or(UImageError::Truncated)?;
    data.get(HEADER_SIZE..end).ok_or(UImageError::Truncated)
}

fn align4(n: usize) -> Option<usize> {
    Some(n.checked_add(3)? & !3)
}

// End offset of a multi-file part, which must lie inside the payload.
fn part_end(offset: usize, size: u32, payload_len: usize) -> Result<usize> {
    usize::try_from(size)
        .ok()
        .and_then(|size| offset.checked_add(size))
        .filter(|&end| end <= payload_len)
        .ok_or(UImageError::Truncated)
}

fn phys(base: u32, offset: usize) -> Result<u32> {
    u32::try_from(offset)
        .ok()
        .and_then(|off| base.checked_add(off))
        .ok_or(UImageError::AddressOverflow)
}

/// Locate kernel and ramdisk inside an image that sits at physical
/// address `base`.
///
/// Checksums are not re-verified here, run [`check`] first. A multi-file
/// image with an empty size table parses with `kernel_size == 0`; deciding
/// whether that is bootable is up to the caller.
pub fn parse(data: &[u8], base: u32) -> Result<BootImage> {
    let hdr = ImageHeader::read(data)?;

    if hdr.arch != IH_ARCH_ARM {
        return Err(UImageError::WrongArch(hdr.arch));
    }
    if hdr.comp != IH_COMP_NONE {
        return Err(UImageError::Compressed(hdr.comp));
    }
    if hdr.os != IH_OS_LINUX {
        log::warn!("uImage OS type {} is not Linux, booting anyway", hdr.os);
    }

    let payload = payload(data, &hdr)?;

    let mut image = BootImage {
        kernel_load: hdr.load,
        kernel_entry: hdr.ep,
        kernel_size: 0,
        kernel_addr: 0,
        ramdisk_addr: 0,
        ramdisk_size: 0,
    };

    match hdr.image_type {
        IH_TYPE_KERNEL => {
            image.kernel_size = hdr.size;
            image.kernel_addr = phys(base, HEADER_SIZE)?;
        }
        IH_TYPE_MULTI => {
            let mut sizes = [0u32; 2];
            let mut count = 0usize;
            let mut off = 0usize;
            loop {
                if off + 4 > payload.len() {
                    return Err(UImageError::BadMultiTable);
                }
                let size = be32(payload, off);
                off += 4;
                if size == 0 {
                    break;
                }
                if count < sizes.len() {
                    sizes[count] = size;
                }
                count += 1;
            }
            if count > sizes.len() {
                log::warn!("multi-file uImage has {} parts, using the first 2", count);
            }

            // Data starts right after the table, parts are 4-byte aligned.
            let kernel_off = off;
            let kernel_end = part_end(kernel_off, sizes[0], payload.len())?;
            let ramdisk_off = align4(kernel_end).ok_or(UImageError::Truncated)?;
            if sizes[1] != 0 {
                part_end(ramdisk_off, sizes[1], payload.len())?;
            }

            image.kernel_size = sizes[0];
            image.kernel_addr = phys(base, HEADER_SIZE + kernel_off)?;
            if sizes[1] != 0 {
                image.ramdisk_size = sizes[1];
                image.ramdisk_addr = phys(base, HEADER_SIZE + ramdisk_off)?;
            }
        }
        other => return Err(UImageError::UnsupportedType(other)),
    }

    Ok(image)
}
