//! Primitive wire field parsing utilities.
//!
//! All multi-byte protocol fields travel in little-endian order, the native
//! layout of the DOS clients.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{Error, Result};
use crate::dos::Fcb;

/// Parses a `u8` from the source.
pub fn u8(src: &mut impl Read) -> Result<u8> {
    src.read_u8().map_err(|_| Error::BadLength)
}

/// Parses a `u16` from the source, little-endian.
pub fn u16(src: &mut impl Read) -> Result<u16> {
    src.read_u16::<LittleEndian>().map_err(|_| Error::BadLength)
}

/// Parses a `u32` from the source, little-endian.
pub fn u32(src: &mut impl Read) -> Result<u32> {
    src.read_u32::<LittleEndian>().map_err(|_| Error::BadLength)
}

/// Parses an `i32` from the source, little-endian.
pub fn i32(src: &mut impl Read) -> Result<i32> {
    src.read_i32::<LittleEndian>().map_err(|_| Error::BadLength)
}

/// Parses an 11-byte FCB block from the source.
pub fn fcb(src: &mut impl Read) -> Result<Fcb> {
    let mut raw = [0u8; 11];
    src.read_exact(&mut raw).map_err(|_| Error::BadLength)?;
    Ok(Fcb::from_bytes(raw))
}

/// Consumes the rest of the source as a raw pathname.
pub fn remainder(src: &mut impl Read) -> Result<Vec<u8>> {
    let mut rest = Vec::new();
    src.read_to_end(&mut rest).map_err(|_| Error::BadLength)?;
    Ok(rest)
}
