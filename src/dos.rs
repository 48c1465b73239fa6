//! DOS-side data shapes: 8.3 FCB names, attribute bits and packed timestamps.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;

bitflags! {
    /// DOS attribute byte carried in file property records.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME    = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const DEVICE    = 0x40;
    }
}

/// An 11-byte, space-padded, uppercase rendering of an 8.3 filename
/// ("FILE0001TXT"). Bytes 0..8 hold the basename and bytes 8..11 the
/// extension. In masks a `?` byte matches any single character. The `.`
/// and `..` entries keep their dots literally in the base field.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Fcb([u8; 11]);

impl Fcb {
    /// Builds an FCB block from a raw filename.
    ///
    /// The base is filled up to eight bytes or the first dot, whichever
    /// comes first, with embedded spaces skipped; the extension is the up
    /// to three bytes following the first dot after the base region.
    pub fn from_name(name: &[u8]) -> Self {
        let mut block = [b' '; 11];
        // Literal leading dots cover the `.` and `..` entries.
        let mut filled = 0;
        while filled < 8 && name.get(filled) == Some(&b'.') {
            block[filled] = b'.';
            filled += 1;
        }
        let mut cursor = filled;
        while filled < 8 {
            match name.get(cursor) {
                None | Some(b'.') => break,
                Some(b' ') => cursor += 1,
                Some(&c) => {
                    block[filled] = c.to_ascii_uppercase();
                    filled += 1;
                    cursor += 1;
                }
            }
        }
        // Extension starts after the first dot beyond the base, ends at a
        // dot, a space or after three bytes.
        if let Some(dot) = name.iter().skip(cursor).position(|&c| c == b'.') {
            let extension = &name[cursor + dot + 1..];
            for (slot, &c) in block[8..].iter_mut().zip(extension) {
                if c == b'.' || c == b' ' {
                    break;
                }
                *slot = c.to_ascii_uppercase();
            }
        }
        Self(block)
    }

    /// Builds an FCB block from a host directory entry name.
    pub fn from_os_name(name: &OsStr) -> Self {
        Self::from_name(name.as_bytes())
    }

    /// Reconstructs an FCB block from its raw wire bytes.
    pub fn from_bytes(raw: [u8; 11]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 11] {
        &self.0
    }

    /// Matches a filename against this block treated as a mask: byte-wise,
    /// case-insensitive, with `?` matching any single byte.
    pub fn matches(&self, name: &Fcb) -> bool {
        self.0
            .iter()
            .zip(name.0.iter())
            .all(|(m, c)| *m == b'?' || m.eq_ignore_ascii_case(c))
    }

    /// True for the `.` and `..` directory entries.
    pub fn is_dot_entry(&self) -> bool {
        self.0[0] == b'.'
    }
}

impl fmt::Display for Fcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write as _;
        for &c in &self.0 {
            let printable = if c.is_ascii_graphic() || c == b' ' { c } else { b'.' };
            f.write_char(char::from(printable))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fcb({self})")
    }
}

/// Converts a timestamp into the 32-bit DOS packed date/time format:
///
/// ```text
///                24                16                 8                 0
/// +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+
/// |Y|Y|Y|Y|Y|Y|Y|M| |M|M|M|D|D|D|D|D| |h|h|h|h|h|m|m|m| |m|m|m|s|s|s|s|s|
/// +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+
/// ```
///
/// The conversion uses local time; years before 1980 clamp to 1980.
pub fn dos_time(t: SystemTime) -> u32 {
    let secs = t
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as libc::time_t)
        .unwrap_or(0);
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    unsafe { libc::localtime_r(&secs, &mut tm) };
    pack_dos_time(
        tm.tm_year + 1900,
        tm.tm_mon + 1,
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec,
    )
}

/// Packs broken-down local time fields into the DOS bit layout.
fn pack_dos_time(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> u32 {
    let year = (year - 1980).max(0) as u32;
    let mut res = year;
    res = (res << 4) | month as u32;
    res = (res << 5) | day as u32;
    res = (res << 5) | hour as u32;
    res = (res << 6) | minute as u32;
    res = (res << 5) | (second as u32 >> 1);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fcb(name: &str) -> String {
        Fcb::from_name(name.as_bytes()).to_string()
    }

    #[test]
    fn plain_names() {
        assert_eq!(fcb("file0001.txt"), "FILE0001TXT");
        assert_eq!(fcb("HELLO.TXT"), "HELLO   TXT");
        assert_eq!(fcb("a.c"), "A       C  ");
        assert_eq!(fcb("noext"), "NOEXT      ");
    }

    #[test]
    fn overlong_parts_are_clipped() {
        assert_eq!(fcb("longfilename.text"), "LONGFILETEX");
        assert_eq!(fcb("file.tar.gz"), "FILE    TAR");
    }

    #[test]
    fn dot_entries_keep_their_dots() {
        assert_eq!(fcb("."), ".          ");
        assert_eq!(fcb(".."), "..         ");
    }

    #[test]
    fn embedded_spaces_are_skipped() {
        assert_eq!(fcb("a b.txt"), "AB      TXT");
    }

    #[test]
    fn transform_is_idempotent() {
        for name in ["file0001.txt", "a.c", "..", "x y.z", "longfilename.text"] {
            let first = Fcb::from_name(name.as_bytes());
            let rendered = first.to_string();
            // Re-encoding a rendered block must not change it: the base is
            // space-padded and the extension sits right of the 8-byte base.
            let base = rendered[..8].trim_end();
            let ext = rendered[8..].trim_end();
            let again = if ext.is_empty() {
                Fcb::from_name(base.as_bytes())
            } else {
                Fcb::from_name(format!("{base}.{ext}").as_bytes())
            };
            assert_eq!(first, again, "name {name:?}");
        }
    }

    #[test]
    fn mask_matching() {
        let mask = Fcb::from_name(b"????????txt");
        assert!(mask.matches(&Fcb::from_name(b"readme.txt")));
        assert!(!mask.matches(&Fcb::from_name(b"readme.doc")));

        let exact = Fcb::from_name(b"HELLO.TXT");
        assert!(exact.matches(&Fcb::from_name(b"hello.txt")));
        assert!(!exact.matches(&Fcb::from_name(b"hell.txt")));
    }

    #[test]
    fn packed_time_layout() {
        // 1999-12-31 23:59:58 -> year 19, month 12, day 31, 23:59:29.
        let packed = pack_dos_time(1999, 12, 31, 23, 59, 58);
        assert_eq!(packed >> 25, 19);
        assert_eq!((packed >> 21) & 0x0F, 12);
        assert_eq!((packed >> 16) & 0x1F, 31);
        assert_eq!((packed >> 11) & 0x1F, 23);
        assert_eq!((packed >> 5) & 0x3F, 59);
        assert_eq!(packed & 0x1F, 29);
    }

    #[test]
    fn years_before_1980_clamp() {
        assert_eq!(pack_dos_time(1970, 1, 1, 0, 0, 0) >> 25, 0);
    }
}
