//! EtherDFS frame layout and link-level validation.
//!
//! Requests and replies travel as raw Ethernet frames with ethertype
//! [`ETHERTYPE`]. The first 60 bytes form the protocol header; everything
//! after is the subfunction-specific payload:
//!
//! | offset | size | meaning                                            |
//! |--------|------|----------------------------------------------------|
//! | 0      | 6    | destination MAC                                    |
//! | 6      | 6    | source MAC                                         |
//! | 12     | 2    | ethertype (big-endian)                             |
//! | 14     | 38   | padding, echoed back verbatim                      |
//! | 52     | 2    | frame length (little-endian, 0 = unspecified)      |
//! | 54     | 2    | optional BSD checksum (little-endian)              |
//! | 56     | 1    | protocol version (low 7 bits) + checksum flag      |
//! | 57     | 1    | client-chosen sequence byte                        |
//! | 58     | 1    | drive number (low 5 bits)                          |
//! | 59     | 1    | subfunction opcode                                 |
//! | 60..   |      | payload (AX result lands at 58..60 in replies)     |

use std::fmt;

/// Ethertype reserved for the DFS protocol.
pub const ETHERTYPE: u16 = 0xEDF5;

/// Protocol version carried in the low seven bits of byte 56.
pub const PROTO_VERSION: u8 = 2;

/// Bit 7 of the version byte: frame carries a BSD checksum.
pub const CHECKSUM_FLAG: u8 = 0x80;

/// Every valid frame is at least this long; replies reuse the first 60
/// request bytes as their own header.
pub const HEADER_LEN: usize = 60;

/// Capacity of a reply frame.
pub const FRAME_CAP: usize = 1520;

/// Receive buffer size for the raw socket.
pub const RECV_BUFFER: usize = 2048;

pub const SRC_OFFSET: usize = 6;
pub const ETHERTYPE_OFFSET: usize = 12;
pub const LENGTH_OFFSET: usize = 52;
pub const CHECKSUM_OFFSET: usize = 54;
pub const VERSION_OFFSET: usize = 56;
pub const SEQUENCE_OFFSET: usize = 57;
pub const DRIVE_OFFSET: usize = 58;
pub const QUERY_OFFSET: usize = 59;
pub const BODY_OFFSET: usize = 60;

/// AX result code location inside a reply frame (little-endian u16).
pub const AX_OFFSET: usize = 58;

/// A link-layer hardware address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    /// Reads an address from the first six bytes of a slice.
    pub fn from_slice(raw: &[u8]) -> Self {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&raw[..6]);
        Self(mac)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// BSD checksum: rotate the 16-bit accumulator right by one, then add the
/// next byte. Protocol frames checksum bytes 56 through end-of-frame.
pub fn bsd_checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, &b| sum.rotate_right(1).wrapping_add(u16::from(b)))
}

/// Reasons an incoming frame is dropped before dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Shorter than the fixed header.
    TooShort,
    /// Destination is neither our address nor broadcast.
    NotForUs,
    /// Ethertype other than [`ETHERTYPE`].
    WrongEthertype,
    /// Unsupported protocol version.
    WrongVersion(u8),
    /// Embedded length exceeds the received byte count.
    Truncated { claimed: u16, received: usize },
    /// Embedded length below the minimum header size.
    BadLength(u16),
    /// Checksum flag set but the sum does not match.
    ChecksumMismatch { computed: u16, received: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort => write!(f, "frame shorter than {HEADER_LEN} bytes"),
            FrameError::NotForUs => write!(f, "frame addressed to another station"),
            FrameError::WrongEthertype => write!(f, "received a non-DFS ethertype frame"),
            FrameError::WrongVersion(v) => write!(f, "unsupported protocol version {v}"),
            FrameError::Truncated { claimed, received } => {
                write!(f, "truncated frame (claims {claimed} bytes, got {received})")
            }
            FrameError::BadLength(l) => write!(f, "malformed frame length field ({l})"),
            FrameError::ChecksumMismatch { computed, received } => write!(
                f,
                "checksum mismatch (computed {computed:#06X}, received {received:#06X})"
            ),
        }
    }
}

/// Validates an incoming frame and returns its effective length.
///
/// The embedded length field at offset 52, when nonzero, supersedes the
/// Ethernet-reported length (Ethernet pads short frames). The checksum, when
/// flagged, covers bytes 56 up to the effective length.
pub fn validate(frame: &[u8], own: &MacAddr) -> Result<usize, FrameError> {
    if frame.len() < HEADER_LEN {
        return Err(FrameError::TooShort);
    }
    if frame[..6] != own.0 && frame[..6] != MacAddr::BROADCAST.0 {
        return Err(FrameError::NotForUs);
    }
    if frame[ETHERTYPE_OFFSET..ETHERTYPE_OFFSET + 2] != ETHERTYPE.to_be_bytes() {
        return Err(FrameError::WrongEthertype);
    }
    let version = frame[VERSION_OFFSET] & !CHECKSUM_FLAG;
    if version != PROTO_VERSION {
        return Err(FrameError::WrongVersion(version));
    }
    let mut len = frame.len();
    let claimed = u16::from_le_bytes([frame[LENGTH_OFFSET], frame[LENGTH_OFFSET + 1]]);
    if claimed != 0 {
        if usize::from(claimed) > len {
            return Err(FrameError::Truncated {
                claimed,
                received: len,
            });
        }
        if usize::from(claimed) < HEADER_LEN {
            return Err(FrameError::BadLength(claimed));
        }
        len = usize::from(claimed);
    }
    if frame[VERSION_OFFSET] & CHECKSUM_FLAG != 0 {
        let computed = bsd_checksum(&frame[VERSION_OFFSET..len]);
        let received =
            u16::from_le_bytes([frame[CHECKSUM_OFFSET], frame[CHECKSUM_OFFSET + 1]]);
        if computed != received {
            return Err(FrameError::ChecksumMismatch { computed, received });
        }
    }
    Ok(len)
}
