//! Request parsing for the DFS protocol.
//!
//! A request frame carries its subfunction opcode at byte 59 and the
//! opcode-specific payload from byte 60 onwards. [`Subfunction`] decodes the
//! opcode; [`args`] decodes each payload layout.

pub mod args;
pub mod primitive;

#[cfg(test)]
mod tests;

use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

/// Result of parsing operations with error type [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Payload shorter (or, for fixed layouts, longer) than the opcode
    /// requires.
    BadLength,
    /// Payload lengths are consistent but the content is contradictory
    /// (a RENAME source length pointing past the payload).
    BadPayload,
    /// Opcode outside the supported set.
    UnknownSubfunction(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadLength => write!(f, "payload length does not fit the subfunction"),
            Error::BadPayload => write!(f, "inconsistent payload"),
            Error::UnknownSubfunction(op) => write!(f, "unsupported subfunction {op:#04X}"),
        }
    }
}

/// The DOS redirector subfunctions served by this server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Subfunction {
    InstallCheck = 0x00,
    RemoveDir = 0x01,
    MakeDir = 0x03,
    ChangeDir = 0x05,
    CloseFile = 0x06,
    CommitFile = 0x07,
    ReadFile = 0x08,
    WriteFile = 0x09,
    LockFile = 0x0A,
    UnlockFile = 0x0B,
    DiskSpace = 0x0C,
    SetAttributes = 0x0E,
    GetAttributes = 0x0F,
    Rename = 0x11,
    Delete = 0x13,
    Open = 0x16,
    Create = 0x17,
    FindFirst = 0x1B,
    FindNext = 0x1C,
    SeekFromEnd = 0x21,
    ExtendedOpen = 0x2E,
}

impl Subfunction {
    pub fn from_opcode(opcode: u8) -> Result<Self> {
        Self::from_u8(opcode).ok_or(Error::UnknownSubfunction(opcode))
    }
}
