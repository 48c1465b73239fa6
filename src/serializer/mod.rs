//! Reply body serialization for the DFS protocol.
//!
//! Replies reuse the request's 60-byte header (with swapped addresses and
//! the AX result at bytes 58..60); these helpers emit the opcode-specific
//! payload that follows. All multi-byte fields are little-endian.

#[cfg(test)]
mod tests;

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::fs::FileProps;

/// Serializes a `u16`, little-endian.
pub fn u16(dest: &mut dyn Write, n: u16) -> io::Result<()> {
    dest.write_u16::<LittleEndian>(n)
}

/// Serializes a `u32`, little-endian.
pub fn u32(dest: &mut dyn Write, n: u32) -> io::Result<()> {
    dest.write_u32::<LittleEndian>(n)
}

/// Serializes the common file description prefix: attribute byte, 11-byte
/// FCB name, packed timestamp and size.
fn props(dest: &mut dyn Write, file: &FileProps) -> io::Result<()> {
    dest.write_u8(file.attr.bits())?;
    dest.write_all(file.fcb.as_bytes())?;
    u32(dest, file.time)?;
    u32(dest, file.size)
}

/// FINDFIRST/FINDNEXT hit: file description plus the directory handle and
/// the 1-based position the walk can resume from.
pub fn found(dest: &mut dyn Write, file: &FileProps, dir: u16, position: u16) -> io::Result<()> {
    props(dest, file)?;
    u16(dest, dir)?;
    u16(dest, position)
}

/// OPEN/CREATE/SPOPENFILE success: file description, file handle, the
/// special-open result word and the granted open mode.
pub fn opened(
    dest: &mut dyn Write,
    file: &FileProps,
    handle: u16,
    result: u16,
    open_mode: u8,
) -> io::Result<()> {
    props(dest, file)?;
    u16(dest, handle)?;
    u16(dest, result)?;
    dest.write_u8(open_mode)
}

/// GETATTR success: packed timestamp, size, then the attribute byte.
pub fn attributes(dest: &mut dyn Write, file: &FileProps) -> io::Result<()> {
    u32(dest, file.time)?;
    u32(dest, file.size)?;
    dest.write_u8(file.attr.bits())
}

/// DISKSPACE reply registers: BX = total clusters, CX = bytes per sector,
/// DX = free clusters. (AX carries sectors-per-cluster and media id.)
pub fn disk_space(dest: &mut dyn Write, total_clusters: u16, free_clusters: u16) -> io::Result<()> {
    u16(dest, total_clusters)?;
    u16(dest, 32768)?;
    u16(dest, free_clusters)
}
