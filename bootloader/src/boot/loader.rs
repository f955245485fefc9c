// Boot orchestrator - uImage in memory to running kernel

use core::convert::Infallible;
use core::fmt;

use moboot_core::uimage::{self, BootImage, UImageError};
use moboot_core::{
    build_boot_tags, check_atags, compose_cmdline, BootFlags, BootTagParams, CmdlineBuf,
    CmdlineError, FragmentSource, MemoryTags, PhysMemory, RelocateError, RootDevice, TagError,
};

use super::handoff::{boot_linux_direct, Platform};
use crate::config::BoardConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Image failed the container check
    InvalidImage(UImageError),
    /// Container is valid but not something we can boot
    ParseFailed(UImageError),
    /// Image carries no kernel
    NoKernel,
    Relocate(RelocateError),
    Cmdline(CmdlineError),
    Tags(TagError),
}

impl BootError {
    /// Status reported to the caller of the boot command.
    pub const fn status(&self) -> u32 {
        1
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidImage(e) => write!(f, "invalid uImage: {}", e),
            Self::ParseFailed(e) => write!(f, "cannot boot uImage: {}", e),
            Self::NoKernel => write!(f, "No kernel!"),
            Self::Relocate(e) => write!(f, "relocation failed: {}", e),
            Self::Cmdline(e) => write!(f, "{}", e),
            Self::Tags(e) => write!(f, "{}", e),
        }
    }
}

impl From<RelocateError> for BootError {
    fn from(e: RelocateError) -> Self {
        Self::Relocate(e)
    }
}

impl From<CmdlineError> for BootError {
    fn from(e: CmdlineError) -> Self {
        Self::Cmdline(e)
    }
}

impl From<TagError> for BootError {
    fn from(e: TagError) -> Self {
        Self::Tags(e)
    }
}

/// What the pipeline works with.
pub struct BootContext<'a> {
    pub config: &'a BoardConfig,
    /// Mover for kernel and ramdisk
    pub memory: &'a mut dyn PhysMemory,
    /// ATAG_MEM source
    pub memory_tags: &'a dyn MemoryTags,
    /// Values handed over by the previous boot stage
    pub fragments: &'a dyn FragmentSource,
    /// Tag list storage, lives at `config.tags_addr`
    pub tag_area: &'a mut [u32],
}

/// A kernel that is in place with its tag list built.
#[derive(Debug)]
pub struct StagedKernel {
    pub image: BootImage,
    pub root: RootDevice,
    pub cmdline: CmdlineBuf,
    /// Words of the tag list, terminator included
    pub tag_words: usize,
    pub entry: u32,
    pub machine_type: u32,
    pub tags_addr: u32,
}

// Move kernel and ramdisk to where they run. The root device follows
// from whether there is a ramdisk.
fn relocate(
    memory: &mut dyn PhysMemory,
    config: &BoardConfig,
    image: &BootImage,
) -> Result<RootDevice, BootError> {
    memory.move_bytes(image.kernel_load, image.kernel_addr, image.kernel_size)?;
    if image.ramdisk_size > 0 {
        memory.move_bytes(config.ramdisk_addr, image.ramdisk_addr, image.ramdisk_size)?;
    }

    log::info!("kernel @ {:#010x} ({} bytes)", image.kernel_load, image.kernel_size);
    if image.ramdisk_size > 0 {
        log::info!("ramdisk @ {:#010x} ({} bytes)", config.ramdisk_addr, image.ramdisk_size);
    }

    Ok(RootDevice::for_ramdisk(image.ramdisk_size))
}

fn write_tags(ctx: &mut BootContext<'_>, cmdline: &str, ramdisk_size: u32) -> Result<usize, BootError> {
    let params = BootTagParams {
        ramdisk_start: ctx.config.ramdisk_addr,
        ramdisk_size,
        revision: ctx.config.revision,
        cmdline,
    };
    let words = build_boot_tags(ctx.tag_area, &params, ctx.memory_tags)?;
    check_atags(&ctx.tag_area[..words])?;
    Ok(words)
}

/// Everything up to the jump: check and parse the image sitting at
/// physical address `image_addr`, relocate kernel and ramdisk, build the
/// command line, write the tag list, then run `callback` once.
///
/// Nothing is moved unless the image checks out and has a kernel. The
/// callback runs only once nothing else can fail, so a board may tear
/// down its UI in it.
pub fn stage_uimage(
    ctx: &mut BootContext<'_>,
    data: &[u8],
    image_addr: u32,
    flags: BootFlags,
    callback: Option<&mut dyn FnMut()>,
) -> Result<StagedKernel, BootError> {
    log::info!("Checking uImage...");
    uimage::check(data).map_err(BootError::InvalidImage)?;

    log::info!("Parsing uImage...");
    let image = uimage::parse(data, image_addr).map_err(BootError::ParseFailed)?;
    log::debug!(
        "kernel_load {:#010x} kernel_addr {:#010x} kernel_size {} kernel_ep {:#010x}",
        image.kernel_load,
        image.kernel_addr,
        image.kernel_size,
        image.kernel_entry
    );

    if image.kernel_size == 0 {
        log::error!("No kernel!");
        return Err(BootError::NoKernel);
    }

    let root = relocate(&mut *ctx.memory, ctx.config, &image)?;

    let mut cmdline = CmdlineBuf::new();
    compose_cmdline(&mut cmdline, flags, root, ctx.fragments)?;
    log::info!("cmdline='{}'", cmdline.as_str());

    let tag_words = write_tags(ctx, cmdline.as_str(), image.ramdisk_size)?;

    log::info!("Booting...");
    if let Some(callback) = callback {
        callback();
    }

    Ok(StagedKernel {
        image,
        root,
        cmdline,
        tag_words,
        entry: image.kernel_entry,
        machine_type: ctx.config.machine_type,
        tags_addr: ctx.config.tags_addr,
    })
}

/// Boot a uImage from memory. Only returns on failure.
///
/// # Safety
/// `ctx.memory` must move real physical memory, `ctx.tag_area` must be
/// the memory at `ctx.config.tags_addr`, and `image_addr` must be where
/// `data` sits.
pub unsafe fn boot_uimage_mem(
    ctx: &mut BootContext<'_>,
    platform: &mut dyn Platform,
    data: &[u8],
    image_addr: u32,
    flags: BootFlags,
    callback: Option<&mut dyn FnMut()>,
) -> Result<Infallible, BootError> {
    let staged = stage_uimage(ctx, data, image_addr, flags, callback)?;
    log::info!("calling boot_linux_direct...");
    boot_linux_direct(staged.entry, staged.machine_type, staged.tags_addr, platform)
}

/// Build the tag list for a kernel that is already in place at `entry`
/// (ramdisk, if any, already at the board's ramdisk address) and jump.
/// Only returns on failure.
///
/// # Safety
/// Same as [`boot_uimage_mem`].
pub unsafe fn boot_linux_atags(
    ctx: &mut BootContext<'_>,
    platform: &mut dyn Platform,
    entry: u32,
    cmdline: &str,
    ramdisk_size: u32,
) -> Result<Infallible, BootError> {
    write_tags(ctx, cmdline, ramdisk_size)?;
    log::info!("calling boot_linux_direct...");
    boot_linux_direct(entry, ctx.config.machine_type, ctx.config.tags_addr, platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::handoff::NoPlatform;
    use moboot_core::atags::{ATAG_INITRD2, ATAG_MEM};
    use moboot_core::uimage::{
        ImageHeader, IH_ARCH_ARM, IH_COMP_NONE, IH_OS_LINUX, IH_TYPE_KERNEL, IH_TYPE_MULTI, NAME_LEN,
    };
    use moboot_core::{crc32, MemRegion, MemoryBanks, PassedTags, TagIter, TagWriter, WindowMemory};
    use std::cell::Cell;

    const BASE: u32 = 0x1000_0000;
    const LOAD: u32 = BASE + 0x2000;
    const RAMDISK: u32 = BASE + 0x3000;
    const BANKS: [MemRegion; 1] = [MemRegion::new(BASE, 0x1000_0000)];

    const BOARD: BoardConfig = BoardConfig {
        ramdisk_addr: RAMDISK,
        memory: &BANKS,
        ..BoardConfig::PRE3
    };

    /// Records every move before forwarding it to a window.
    struct Recorder<'a> {
        inner: WindowMemory<'a>,
        moves: Vec<(u32, u32, u32)>,
    }

    impl PhysMemory for Recorder<'_> {
        fn move_bytes(&mut self, dst: u32, src: u32, len: u32) -> Result<(), RelocateError> {
            self.moves.push((dst, src, len));
            self.inner.move_bytes(dst, src, len)
        }
    }

    fn uimage(image_type: u8, arch: u8, payload: &[u8]) -> Vec<u8> {
        let mut name = [0u8; NAME_LEN];
        name[..5].copy_from_slice(b"Linux");
        let hdr = ImageHeader {
            hcrc: 0,
            time: 0,
            size: payload.len() as u32,
            load: LOAD,
            ep: LOAD,
            dcrc: crc32::checksum(payload),
            os: IH_OS_LINUX,
            arch,
            image_type,
            comp: IH_COMP_NONE,
            name,
        };
        let mut out = hdr.to_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn multi(parts: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in parts {
            out.extend_from_slice(&(p.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(&[0; 4]);
        for p in parts {
            out.extend_from_slice(p);
            out.resize((out.len() + 3) & !3, 0);
        }
        uimage(IH_TYPE_MULTI, IH_ARCH_ARM, &out)
    }

    struct Run {
        result: Result<StagedKernel, BootError>,
        window: Vec<u8>,
        moves: Vec<(u32, u32, u32)>,
        tags: Vec<u32>,
        callbacks: u32,
    }

    fn run(image: &[u8], flags: BootFlags, fragments: &dyn FragmentSource, tag_words: usize) -> Run {
        let mut window = vec![0u8; 0x4000];
        window[..image.len()].copy_from_slice(image);
        let mut tags = vec![0u32; tag_words];
        let calls = Cell::new(0);

        let mut memory = Recorder {
            inner: WindowMemory::new(BASE, &mut window),
            moves: Vec::new(),
        };
        let banks = MemoryBanks::new(&BANKS);
        let result = {
            let mut ctx = BootContext {
                config: &BOARD,
                memory: &mut memory,
                memory_tags: &banks,
                fragments,
                tag_area: &mut tags,
            };
            let mut callback = || calls.set(calls.get() + 1);
            stage_uimage(&mut ctx, image, BASE, flags, Some(&mut callback as &mut dyn FnMut()))
        };
        let moves = memory.moves;
        Run {
            result,
            window,
            moves,
            tags,
            callbacks: calls.get(),
        }
    }

    fn at(window: &[u8], addr: u32, len: usize) -> &[u8] {
        let off = (addr - BASE) as usize;
        &window[off..off + len]
    }

    #[test]
    fn test_kernel_only_boots_from_storage() {
        let kernel: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let image = uimage(IH_TYPE_KERNEL, IH_ARCH_ARM, &kernel);
        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), BOARD.tags_words);

        let staged = r.result.unwrap();
        assert_eq!(staged.root, RootDevice::Storage);
        assert_eq!(staged.entry, LOAD);
        assert_eq!(staged.machine_type, BOARD.machine_type);
        assert_eq!(staged.tags_addr, BOARD.tags_addr);
        assert_eq!(
            staged.cmdline.as_str(),
            "root=/dev/mmcblk0p14 rootwait ro fbcon=disable console=ttyS2,115200n8  lcd_enable_vsync "
        );
        assert_eq!(r.callbacks, 1);
        assert_eq!(r.moves, [(LOAD, BASE + 64, 300)]);
        assert_eq!(at(&r.window, LOAD, 300), &kernel[..]);

        assert_eq!(check_atags(&r.tags), Ok(staged.tag_words));
        assert!(TagIter::new(&r.tags).all(|t| t.unwrap().id != ATAG_INITRD2));
        let mem = TagIter::new(&r.tags).map(|t| t.unwrap()).find(|t| t.id == ATAG_MEM).unwrap();
        assert_eq!(mem.payload, &[0x1000_0000, BASE]);
        let cmdline = TagIter::new(&r.tags).find_map(|t| t.unwrap().cmdline());
        assert_eq!(cmdline, Some(staged.cmdline.as_str()));
    }

    #[test]
    fn test_ramdisk_boots_from_ram0() {
        let kernel = [0x11u8; 130];
        let ramdisk = [0x22u8; 77];
        let image = multi(&[&kernel, &ramdisk]);
        let r = run(&image, BootFlags::VERBOSE, &PassedTags::empty(), BOARD.tags_words);

        let staged = r.result.unwrap();
        assert_eq!(staged.root, RootDevice::Ramdisk);
        assert!(staged.cmdline.as_str().starts_with("root=/dev/ram0 rootwait rw "));
        assert_eq!(r.moves.len(), 2);
        assert_eq!(r.moves[1], (RAMDISK, staged.image.ramdisk_addr, 77));
        assert_eq!(at(&r.window, LOAD, 130), &kernel[..]);
        assert_eq!(at(&r.window, RAMDISK, 77), &ramdisk[..]);

        let initrd = TagIter::new(&r.tags)
            .map(|t| t.unwrap())
            .find(|t| t.id == ATAG_INITRD2)
            .unwrap();
        assert_eq!(initrd.payload, &[RAMDISK, 77]);
    }

    #[test]
    fn test_zero_kernel_moves_nothing() {
        let image = multi(&[]);
        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), BOARD.tags_words);

        let err = r.result.unwrap_err();
        assert_eq!(err, BootError::NoKernel);
        assert_eq!(err.status(), 1);
        assert!(r.moves.is_empty());
        assert_eq!(r.callbacks, 0);
        assert!(r.tags.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_bad_images_are_rejected_before_moving() {
        let mut image = uimage(IH_TYPE_KERNEL, IH_ARCH_ARM, &[1, 2, 3, 4]);
        *image.last_mut().unwrap() ^= 0xFF;
        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), BOARD.tags_words);
        assert_eq!(r.result.unwrap_err(), BootError::InvalidImage(UImageError::DataChecksum));
        assert!(r.moves.is_empty());

        let image = uimage(IH_TYPE_KERNEL, 22, &[1, 2, 3, 4]);
        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), BOARD.tags_words);
        assert_eq!(r.result.unwrap_err(), BootError::ParseFailed(UImageError::WrongArch(22)));
        assert!(r.moves.is_empty());
        assert_eq!(r.callbacks, 0);
    }

    #[test]
    fn test_fragments_from_previous_stage() {
        let mut prior = [0u32; 64];
        let mut w = TagWriter::new(&mut prior);
        w.core().unwrap();
        w.cmdline("nduid=0123abcd fb=0x3e000000 quiet klog=0x1fe00000 klog_len=0x200000")
            .unwrap();
        w.none().unwrap();
        let passed = PassedTags::new(&prior);

        let image = uimage(IH_TYPE_KERNEL, IH_ARCH_ARM, &[0u8; 16]);
        let r = run(&image, BootFlags::VERBOSE, &passed, BOARD.tags_words);
        assert_eq!(
            r.result.unwrap().cmdline.as_str(),
            "root=/dev/mmcblk0p14 rootwait rw logo.nologo console=tty1 \
             fb=0x3e000000 nduid=0123abcd klog=0x1fe00000 klog_len=0x200000 "
        );
    }

    #[test]
    fn test_small_tag_area() {
        let image = uimage(IH_TYPE_KERNEL, IH_ARCH_ARM, &[0u8; 16]);
        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), 16);
        assert!(matches!(r.result, Err(BootError::Tags(TagError::Overflow { .. }))));
        assert_eq!(r.callbacks, 0);
    }

    #[test]
    fn test_image_outside_memory() {
        let kernel = [0u8; 16];
        let mut name = [0u8; NAME_LEN];
        name[0] = b'x';
        let hdr = ImageHeader {
            hcrc: 0,
            time: 0,
            size: 16,
            load: 0x0800_0000,
            ep: 0x0800_0000,
            dcrc: crc32::checksum(&kernel),
            os: IH_OS_LINUX,
            arch: IH_ARCH_ARM,
            image_type: IH_TYPE_KERNEL,
            comp: IH_COMP_NONE,
            name,
        };
        let mut image = hdr.to_bytes().to_vec();
        image.extend_from_slice(&kernel);

        let r = run(&image, BootFlags::empty(), &PassedTags::empty(), BOARD.tags_words);
        assert!(matches!(
            r.result,
            Err(BootError::Relocate(RelocateError::OutOfRange { addr: 0x0800_0000, len: 16 }))
        ));
    }

    // Runs `f` against a context over a fresh window holding `image`.
    fn with_context<R>(image: &[u8], tag_words: usize, f: impl FnOnce(&mut BootContext<'_>) -> R) -> R {
        let mut window = vec![0u8; 0x4000];
        window[..image.len()].copy_from_slice(image);
        let mut tags = vec![0u32; tag_words];
        let mut memory = WindowMemory::new(BASE, &mut window);
        let banks = MemoryBanks::new(&BANKS);
        let fragments = PassedTags::empty();
        let mut ctx = BootContext {
            config: &BOARD,
            memory: &mut memory,
            memory_tags: &banks,
            fragments: &fragments,
            tag_area: &mut tags,
        };
        f(&mut ctx)
    }

    #[cfg(not(target_arch = "arm"))]
    #[test]
    #[should_panic(expected = "Unsupported architecture")]
    fn test_boot_uimage_mem_ends_in_handoff() {
        let image = uimage(IH_TYPE_KERNEL, IH_ARCH_ARM, &[0x5Au8; 64]);
        let err = with_context(&image, BOARD.tags_words, |ctx| unsafe {
            boot_uimage_mem(ctx, &mut NoPlatform, &image, BASE, BootFlags::empty(), None)
        });
        // Only reached if staging failed.
        panic!("boot_uimage_mem returned {:?}", err);
    }

    #[test]
    fn test_boot_uimage_mem_returns_staging_errors() {
        let image = multi(&[]);
        let err = with_context(&image, BOARD.tags_words, |ctx| unsafe {
            boot_uimage_mem(ctx, &mut NoPlatform, &image, BASE, BootFlags::empty(), None)
        });
        assert_eq!(err.unwrap_err(), BootError::NoKernel);
    }

    #[cfg(not(target_arch = "arm"))]
    #[test]
    #[should_panic(expected = "Unsupported architecture")]
    fn test_boot_linux_atags_ends_in_handoff() {
        let err = with_context(&[], BOARD.tags_words, |ctx| unsafe {
            boot_linux_atags(ctx, &mut NoPlatform, LOAD, "root=/dev/ram0", 0x1000)
        });
        panic!("boot_linux_atags returned {:?}", err);
    }

    #[test]
    fn test_boot_linux_atags_checks_tag_area() {
        let err = with_context(&[], 8, |ctx| unsafe {
            boot_linux_atags(ctx, &mut NoPlatform, LOAD, "root=/dev/ram0", 0)
        });
        assert!(matches!(err, Err(BootError::Tags(TagError::Overflow { .. }))));
    }
}
