//! Frame checksum.
//!
//! The checksum is a pure function over a byte slice. [`Crc16`] is the
//! algorithm the receivers expect: CRC-16 with the CCITT polynomial in
//! reflected form (0x8408), seeded with 0xFFFF and no final inversion
//! (catalogued as CRC-16/MCRF4XX).

/// A 16-bit checksum over a byte buffer.
pub trait Checksum {
    /// Computes the checksum of `data`.
    fn checksum(&self, data: &[u8]) -> u16;
}

/// Reflected CRC-CCITT, seed 0xFFFF, no final XOR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Crc16;

impl Crc16 {
    const SEED: u16 = 0xffff;
}

impl Checksum for Crc16 {
    fn checksum(&self, data: &[u8]) -> u16 {
        data.iter().fold(Self::SEED, crc_ccitt_update)
    }
}

impl<F> Checksum for F
where
    F: Fn(&[u8]) -> u16,
{
    fn checksum(&self, data: &[u8]) -> u16 {
        self(data)
    }
}

/// One byte of the reflected CCITT update (polynomial 0x8408), table-free.
///
/// Folded from 0xFFFF with no final XOR this is CRC-16/MCRF4XX, check value
/// 0x6F91.
pub(crate) fn crc_ccitt_update(crc: u16, data: &u8) -> u16 {
    let mut d = *data as u16;
    d ^= lo8(crc);
    d ^= d << 4;
    d = (d as u8) as u16; // keep only the low byte before the fold

    ((d << 8) | hi8(crc)) ^ (((d >> 4) as u8) as u16) ^ (d << 3)
}

pub(crate) fn lo8(x: u16) -> u16 {
    x & 0xff
}

pub(crate) fn hi8(x: u16) -> u16 {
    x >> 8
}
