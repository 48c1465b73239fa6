//! FAT capability probing and DOS attribute access through the Linux
//! msdos ioctls.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

const FAT_IOCTL_GET_ATTRIBUTES: libc::c_ulong = 0x8004_7210;
const FAT_IOCTL_SET_ATTRIBUTES: libc::c_ulong = 0x4004_7211;
const MSDOS_SUPER_MAGIC: i64 = 0x4d44;

/// Reads the DOS attribute bits of a file on a FAT filesystem.
pub fn attributes(path: &Path) -> io::Result<u32> {
    let file = File::open(path)?;
    let mut bits: u32 = 0;
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            FAT_IOCTL_GET_ATTRIBUTES as _,
            &mut bits,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(bits)
}

/// Stores DOS attribute bits on a file on a FAT filesystem.
pub fn set_attributes(path: &Path, attr: u8) -> io::Result<()> {
    let file = File::open(path)?;
    let bits = u32::from(attr);
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            FAT_IOCTL_SET_ATTRIBUTES as _,
            &bits,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Whether a path resides on a FAT filesystem.
pub fn is_fat(path: &Path) -> bool {
    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statfs(cpath.as_ptr(), &mut buf) };
    rc == 0 && i64::from(buf.f_type) == MSDOS_SUPER_MAGIC
}
