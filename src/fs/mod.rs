//! Host filesystem operations backing the DFS subfunctions.
//!
//! Every path handed to these functions has already been resolved to its
//! host spelling by [`crate::resolver`]. The layer stays deliberately
//! stateless: files are opened, used and closed per request, matching the
//! single-shot nature of the protocol.

pub mod fat;


use std::fs::{File, OpenOptions};
use std::io::{self, Read as _, Seek, SeekFrom, Write as _};
use std::path::Path;
use std::time::UNIX_EPOCH;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::dos::{dos_time, Attributes, Fcb};
use crate::handles::HandleCache;

bitflags! {
    /// Search modifiers for [`find_file`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SearchFlags: u8 {
        /// The searched directory is the root of its drive; `.` and `..`
        /// entries are hidden from clients there.
        const ROOT = 0x01;
        /// The drive is FAT-backed and real attributes are available.
        const FAT  = 0x02;
    }
}

/// Attribute admission mask for [`find_file`]: an entry qualifies only when
/// all of its masked bits are also present in the requested attribute byte.
/// The value matches what EtherDFS clients are tested against; note it
/// omits bit 1, so HIDDEN entries are always admitted.
const SEARCH_ATTR_MASK: u8 = 0x16;

/// DOS-side properties of one filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProps {
    pub attr: Attributes,
    /// Size in bytes; directories report zero.
    pub size: u32,
    /// Modification time in DOS packed format.
    pub time: u32,
    pub fcb: Fcb,
}

/// Stats a host path into DOS-style properties.
///
/// Directories report exactly DIRECTORY with no size. Regular files carry
/// their byte size; their attribute byte is read through the FAT ioctl on
/// FAT drives and synthesized as ARCHIVE everywhere else. `None` means the
/// path does not exist.
pub fn get_attr(path: &Path, fat: bool) -> Option<FileProps> {
    let meta = std::fs::metadata(path).ok()?;
    let name = path.file_name().unwrap_or_default();
    let mut props = FileProps {
        attr: Attributes::empty(),
        size: 0,
        time: dos_time(meta.modified().unwrap_or(UNIX_EPOCH)),
        fcb: Fcb::from_os_name(name),
    };
    if meta.is_dir() {
        props.attr = Attributes::DIRECTORY;
        return Some(props);
    }
    props.size = meta.len() as u32;
    if !fat {
        props.attr = Attributes::ARCHIVE;
        return Some(props);
    }
    match fat::attributes(path) {
        Ok(bits) => props.attr = Attributes::from_bits_truncate(bits as u8),
        Err(err) => warn!("failed to fetch attributes of '{}': {err}", path.display()),
    }
    Some(props)
}

/// Stores a DOS attribute byte on a path. Only meaningful on FAT drives;
/// callers skip the call entirely elsewhere.
pub fn set_attr(path: &Path, attr: Attributes) -> io::Result<()> {
    fat::set_attributes(path, attr.bits())
}

/// Creates or truncates a file, applies attributes on FAT drives, and
/// returns its fresh properties.
pub fn create_file(path: &Path, attr: Attributes, fat: bool) -> Option<FileProps> {
    File::create(path).ok()?;
    if fat {
        if let Err(err) = fat::set_attributes(path, attr.bits()) {
            warn!(
                "failed to set attribute {:02X}h on '{}': {err}",
                attr.bits(),
                path.display()
            );
        }
    }
    get_attr(path, fat)
}

/// Reads up to `len` bytes from `offset`. Short reads at end-of-file are
/// normal and reported through the returned length.
pub fn read_file(path: &Path, offset: u32, len: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset.into()))?;
    let mut data = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut data)?;
    Ok(data)
}

/// Writes `data` at `offset` into an existing file. An empty `data` means
/// "truncate or extend the file to `offset` bytes" and reports zero bytes
/// written.
pub fn write_file(path: &Path, offset: u32, data: &[u8]) -> io::Result<usize> {
    if data.is_empty() {
        let file = OpenOptions::new().write(true).open(path)?;
        if let Err(err) = file.set_len(offset.into()) {
            warn!("failed to truncate '{}' to {offset} bytes: {err}", path.display());
        }
        return Ok(0);
    }
    debug!("write {} bytes into '{}' at offset {offset}", data.len(), path.display());
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(offset.into()))?;
    file.write_all(data)?;
    Ok(data.len())
}

/// Size of the file a handle refers to.
pub fn file_size(path: &Path) -> Option<u32> {
    get_attr(path, false).map(|props| props.size)
}

/// Total and free bytes of the filesystem holding `path`; zeros on error.
pub fn disk_info(path: &Path) -> (u64, u64) {
    use std::os::unix::ffi::OsStrExt;
    let Ok(cpath) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return (0, 0);
    };
    let mut buf: libc::statvfs = unsafe { std::mem::zeroed() };
    if unsafe { libc::statvfs(cpath.as_ptr(), &mut buf) } != 0 {
        return (0, 0);
    }
    let total = u64::from(buf.f_blocks) * u64::from(buf.f_frsize);
    let free = u64::from(buf.f_bfree) * u64::from(buf.f_bsize);
    (total, free)
}

pub fn make_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir(path)
}

pub fn remove_dir(path: &Path) -> io::Result<()> {
    std::fs::remove_dir(path)
}

pub fn remove_file(path: &Path) -> io::Result<()> {
    std::fs::remove_file(path)
}

pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

/// Existence probe for directories. CHDIR needs nothing more: no per-client
/// working directory is kept server-side.
pub fn dir_exists(path: &Path) -> bool {
    std::fs::metadata(path).map_or(false, |meta| meta.is_dir())
}

/// Builds the property listing of a directory, `.` and `..` included, in
/// the host's readdir order.
pub fn gen_dirlist(dir: &Path, fat: bool) -> io::Result<Vec<FileProps>> {
    let mut listing = Vec::new();
    for dot in [".", ".."] {
        if let Some(mut props) = get_attr(&dir.join(dot), fat) {
            props.fcb = Fcb::from_name(dot.as_bytes());
            listing.push(props);
        }
    }
    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        if let Some(props) = get_attr(&entry.path(), fat) {
            listing.push(props);
        }
    }
    Ok(listing)
}

/// Whether an entry's attributes admit it under a requested attribute byte.
///
/// A request for exactly VOLUME matches volume labels only. Any other
/// request admits an entry whose masked bits are all present in the request;
/// read-only and archive entries are always admissible.
fn admits(requested: u8, entry: Attributes) -> bool {
    if requested == Attributes::VOLUME.bits() {
        entry.contains(Attributes::VOLUME)
    } else {
        (requested | (entry.bits() & SEARCH_ATTR_MASK)) == requested
    }
}

/// Finds the next directory entry matching an FCB mask and attribute byte.
///
/// `nth` carries the 1-based position of the previous hit (zero to start a
/// fresh walk, which also regenerates the cached listing). On a hit `nth`
/// is updated so the client can continue the walk with FINDNEXT.
pub fn find_file(
    handles: &mut HandleCache,
    id: u16,
    mask: &Fcb,
    requested: u8,
    nth: &mut u16,
    flags: SearchFlags,
) -> Option<FileProps> {
    let (name, listing) = handles.entry(id)?;
    if *nth == 0 || listing.is_none() {
        match gen_dirlist(name, flags.contains(SearchFlags::FAT)) {
            Ok(fresh) => {
                debug!("scanned dir '{}' and found {} items", name.display(), fresh.len());
                *listing = Some(fresh);
            }
            Err(err) => {
                warn!("failed to scan dir '{}': {err}", name.display());
                *listing = None;
                return None;
            }
        }
    }
    let entries = listing.as_ref()?;
    for (index, props) in entries.iter().enumerate().skip(usize::from(*nth)) {
        if flags.contains(SearchFlags::ROOT) && props.fcb.is_dot_entry() {
            continue;
        }
        if !mask.matches(&props.fcb) {
            continue;
        }
        if !admits(requested, props.attr) {
            continue;
        }
        *nth = (index + 1) as u16;
        return Some(props.clone());
    }
    None
}

/// Unlinks every regular file in `dir` whose FCB name matches `mask`;
/// directories are skipped. Matching nothing is not an error.
pub fn del_files(dir: &Path, mask: &Fcb) -> io::Result<u32> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        if entry.file_type().map_or(true, |t| t.is_dir()) {
            continue;
        }
        if !mask.matches(&Fcb::from_os_name(&entry.file_name())) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => warn!("failed to delete '{}': {err}", entry.path().display()),
        }
    }
    Ok(removed)
}
