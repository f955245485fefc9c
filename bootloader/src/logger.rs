//! Boot logger
//!
//! Backend for the `log` facade. Every record is formatted as
//! `[LEVEL] message` into a 4 KiB ring kept in RAM, so the last few
//! screens of boot output can be read back after the fact (for example by
//! a panic handler), and is optionally forwarded to a console sink.

use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::{Mutex, Once};

/// Size of the in-memory log in bytes
pub const LOG_RING_SIZE: usize = 4096;

/// Byte ring that keeps the newest `LOG_RING_SIZE` bytes written to it.
pub struct LogRing {
    buf: [u8; LOG_RING_SIZE],
    head: usize,
    len: usize,
}

impl LogRing {
    pub const fn new() -> Self {
        Self {
            buf: [0; LOG_RING_SIZE],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        let bytes = &bytes[bytes.len().saturating_sub(LOG_RING_SIZE)..];
        for &b in bytes {
            self.buf[self.head] = b;
            self.head = (self.head + 1) % LOG_RING_SIZE;
        }
        self.len = (self.len + bytes.len()).min(LOG_RING_SIZE);
    }

    /// Stored bytes, oldest first, as two slices.
    pub fn chunks(&self) -> (&[u8], &[u8]) {
        if self.len < LOG_RING_SIZE {
            (&self.buf[..self.len], &[])
        } else {
            (&self.buf[self.head..], &self.buf[..self.head])
        }
    }

    /// Copy the newest bytes that fit into `out`, oldest first.
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let (a, b) = self.chunks();
        let skip = self.len.saturating_sub(out.len());
        let mut n = 0;
        for &byte in a.iter().chain(b).skip(skip) {
            out[n] = byte;
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for LogRing {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GLOBAL LOGGER
// ═══════════════════════════════════════════════════════════════════════════

static RING: Mutex<LogRing> = Mutex::new(LogRing::new());
static CONSOLE: Once<fn(&str)> = Once::new();
static LOGGER: BootLogger = BootLogger;

struct Console(fn(&str));

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

/// `log::Log` implementation writing to the ring and the console sink.
pub struct BootLogger;

impl log::Log for BootLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        moboot_hwinit::without_interrupts(|| {
            let _ = writeln!(RING.lock(), "[{}] {}", record.level(), record.args());
        });

        if let Some(&sink) = CONSOLE.get() {
            let _ = writeln!(Console(sink), "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the boot logger.
///
/// `console` receives every formatted record in pieces; pass `None` to
/// log to the ring only. Fails if a logger is already installed.
pub fn init_logging(level: LevelFilter, console: Option<fn(&str)>) -> Result<(), SetLoggerError> {
    if let Some(sink) = console {
        CONSOLE.call_once(|| sink);
    }
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Run `f` on the log ring.
pub fn with_log_ring<R>(f: impl FnOnce(&LogRing) -> R) -> R {
    moboot_hwinit::without_interrupts(|| f(&RING.lock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};

    fn contents(ring: &LogRing) -> Vec<u8> {
        let (a, b) = ring.chunks();
        [a, b].concat()
    }

    #[test]
    fn test_ring_keeps_order_before_wrap() {
        let mut ring = LogRing::new();
        write!(ring, "Checking uImage... ").unwrap();
        write!(ring, "OK").unwrap();
        assert_eq!(contents(&ring), b"Checking uImage... OK");
        assert_eq!(ring.len(), 21);
    }

    #[test]
    fn test_ring_wraps_to_newest_bytes() {
        let mut ring = LogRing::new();
        let data: Vec<u8> = (0..LOG_RING_SIZE + 100).map(|i| (i % 251) as u8).collect();
        for chunk in data.chunks(7) {
            ring.push(chunk);
        }
        assert_eq!(ring.len(), LOG_RING_SIZE);
        assert_eq!(contents(&ring), &data[100..]);

        // Oversized single write keeps its tail.
        ring.push(&data);
        assert_eq!(contents(&ring), &data[100..]);

        let mut tail = [0u8; 10];
        assert_eq!(ring.copy_to(&mut tail), 10);
        assert_eq!(&tail, &data[data.len() - 10..]);

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(contents(&ring), b"");
    }

    #[test]
    fn test_records_land_in_ring() {
        log::set_max_level(LevelFilter::Info);
        LOGGER.log(
            &Record::builder()
                .args(format_args!("kernel @ {:#010x} ({} bytes)", 0x8000, 1234))
                .level(Level::Info)
                .build(),
        );
        LOGGER.log(
            &Record::builder()
                .args(format_args!("filtered"))
                .level(Level::Trace)
                .build(),
        );

        let mut out = [0u8; LOG_RING_SIZE];
        let n = with_log_ring(|ring| ring.copy_to(&mut out));
        let text = core::str::from_utf8(&out[..n]).unwrap();
        assert!(text.ends_with("[INFO] kernel @ 0x00008000 (1234 bytes)\n"));
        assert!(!text.contains("filtered"));
    }
}
