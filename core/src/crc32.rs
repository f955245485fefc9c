//! CRC32 as used by uImage headers and payloads.

/// IEEE 802.3 CRC32 of `data`, the checksum stored in `ih_hcrc` and
/// `ih_dcrc`.
pub fn checksum(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = crc32_table();

    data.iter().fold(0xFFFF_FFFF, |crc: u32, &byte| {
        CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
    }) ^ 0xFFFF_FFFF
}

/// Byte-at-a-time lookup table, built at compile time.
const fn crc32_table() -> [u32; 256] {
    const REFLECTED_POLY: u32 = 0xEDB8_8320;
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut bit = 0;
        while bit < 8 {
            c = if c & 1 == 1 { REFLECTED_POLY ^ (c >> 1) } else { c >> 1 };
            bit += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(
            checksum(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn test_single_bit_change_is_detected() {
        let mut data = *b"root=/dev/ram0 rootwait rw";
        let before = checksum(&data);
        data[5] ^= 0x01;
        assert_ne!(checksum(&data), before);
    }
}
