//! GPIO input lines.
//!
//! Lines are numbered globally; line `n` lives in bank `n / 32`, bit
//! `n % 32`. Each bank exposes an input data register at a fixed offset
//! from the bank base.

/// Something that can sample GPIO input lines.
pub trait GpioInput {
    /// Current level of `line`, true for high. Lines the controller does
    /// not have read high, the idle level of the pulled-up key inputs.
    fn read_line(&self, line: u32) -> bool;
}

impl<T: GpioInput + ?Sized> GpioInput for &T {
    fn read_line(&self, line: u32) -> bool {
        (**self).read_line(line)
    }
}

const LINES_PER_BANK: u32 = 32;

/// Memory-mapped GPIO controller with evenly spaced banks.
#[derive(Debug, Clone, Copy)]
pub struct MmioGpio {
    base: usize,
    bank_stride: usize,
    data_in: usize,
    banks: u32,
}

impl MmioGpio {
    /// # Safety
    /// `base + k * bank_stride + data_in` must be a readable 32-bit
    /// register for every bank `k < banks`.
    pub const unsafe fn new(base: usize, bank_stride: usize, data_in: usize, banks: u32) -> Self {
        Self {
            base,
            bank_stride,
            data_in,
            banks,
        }
    }

    /// Raw input register of one bank.
    pub fn read_bank(&self, bank: u32) -> Option<u32> {
        if bank >= self.banks {
            return None;
        }
        let addr = self.base + bank as usize * self.bank_stride + self.data_in;
        // SAFETY: in range per the constructor contract.
        Some(unsafe { core::ptr::read_volatile(addr as *const u32) })
    }
}

impl GpioInput for MmioGpio {
    fn read_line(&self, line: u32) -> bool {
        match self.read_bank(line / LINES_PER_BANK) {
            Some(bits) => bits & (1 << (line % LINES_PER_BANK)) != 0,
            None => {
                log::warn!("gpio line {} out of range", line);
                true
            }
        }
    }
}
