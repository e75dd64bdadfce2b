//! FIB (Fast Information Block) assembly: 30 data bytes plus a 16-bit CRC.

use dabmux_core::crc::crc16_ccitt;

/// Total size of one FIB, including its trailing CRC.
pub const FIB_SIZE: usize = 32;
/// Bytes of FIG payload available per FIB, before the CRC.
pub const FIB_DATA_SIZE: usize = 30;

/// Pads `data` to [`FIB_DATA_SIZE`] bytes with `0xFF` and appends the
/// CRC-16/CCITT of the first 30 bytes.
pub fn finish_fib(mut data: Vec<u8>) -> [u8; FIB_SIZE] {
    debug_assert!(data.len() <= FIB_DATA_SIZE);
    data.resize(FIB_DATA_SIZE, 0xFF);
    let crc = crc16_ccitt(&data);
    let mut fib = [0u8; FIB_SIZE];
    fib[..FIB_DATA_SIZE].copy_from_slice(&data);
    fib[FIB_DATA_SIZE..].copy_from_slice(&crc.to_be_bytes());
    fib
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_and_appends_crc() {
        let fib = finish_fib(vec![1, 2, 3]);
        assert_eq!(fib.len(), FIB_SIZE);
        assert_eq!(fib[3], 0xFF);
        let expected_crc = crc16_ccitt(&fib[..FIB_DATA_SIZE]);
        assert_eq!(u16::from_be_bytes([fib[30], fib[31]]), expected_crc);
    }
}
