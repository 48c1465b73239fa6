//! Per-subfunction argument layouts and their parsers.
//!
//! Each function takes the payload that follows the 60-byte frame header
//! and enforces the length preconditions of its subfunction; a violation
//! means the frame is malformed and gets no reply.

use std::io::Cursor;

use super::{primitive, Error, Result};
use crate::dos::Fcb;

/// READFILE: `u32 offset, u16 handle, u16 len`, exactly 8 bytes.
pub struct ReadArgs {
    pub offset: u32,
    pub handle: u16,
    pub len: u16,
}

pub fn read(body: &[u8]) -> Result<ReadArgs> {
    if body.len() != 8 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(ReadArgs {
        offset: primitive::u32(src)?,
        handle: primitive::u16(src)?,
        len: primitive::u16(src)?,
    })
}

/// WRITEFILE: `u32 offset, u16 handle` followed by the data to write.
pub struct WriteArgs {
    pub offset: u32,
    pub handle: u16,
    pub data: Vec<u8>,
}

pub fn write(body: &[u8]) -> Result<WriteArgs> {
    if body.len() < 6 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(WriteArgs {
        offset: primitive::u32(src)?,
        handle: primitive::u16(src)?,
        data: primitive::remainder(src)?,
    })
}

/// SETATTR: `u8 attributes` followed by the target pathname.
pub struct SetAttrArgs {
    pub attr: u8,
    pub path: Vec<u8>,
}

pub fn set_attr(body: &[u8]) -> Result<SetAttrArgs> {
    if body.len() < 2 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(SetAttrArgs {
        attr: primitive::u8(src)?,
        path: primitive::remainder(src)?,
    })
}

/// GETATTR carries just a pathname, which must not be empty.
pub fn attr_path(body: &[u8]) -> Result<&[u8]> {
    if body.is_empty() {
        return Err(Error::BadLength);
    }
    Ok(body)
}

/// RENAME: `u8 srclen` followed by the source and destination pathnames.
pub struct RenameArgs {
    pub source: Vec<u8>,
    pub target: Vec<u8>,
}

pub fn rename(body: &[u8]) -> Result<RenameArgs> {
    if body.len() < 3 {
        return Err(Error::BadLength);
    }
    let source_len = usize::from(body[0]);
    let names = &body[1..];
    if names.len() < source_len {
        return Err(Error::BadPayload);
    }
    Ok(RenameArgs {
        source: names[..source_len].to_vec(),
        target: names[source_len..].to_vec(),
    })
}

/// OPEN/CREATE/SPOPENFILE: three 16-bit words off the client's stack
/// followed by the pathname. Which words matter depends on the subfunction.
pub struct OpenArgs {
    /// OPEN: requested open mode. CREATE: attributes for the new file.
    pub stack_attr: u16,
    /// SPOPENFILE action code: high nibble = behavior when the file is
    /// missing, low nibble = behavior when it exists.
    pub action: u16,
    /// SPOPENFILE open mode; echoed (masked to 7 bits) in the reply.
    pub open_mode: u16,
    pub path: Vec<u8>,
}

pub fn open(body: &[u8]) -> Result<OpenArgs> {
    if body.len() < 6 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(OpenArgs {
        stack_attr: primitive::u16(src)?,
        action: primitive::u16(src)?,
        open_mode: primitive::u16(src)?,
        path: primitive::remainder(src)?,
    })
}

/// FINDFIRST: `u8 attributes` followed by the search path (directory plus
/// mask in one string).
pub struct FindFirstArgs {
    pub attr: u8,
    pub path: Vec<u8>,
}

pub fn find_first(body: &[u8]) -> Result<FindFirstArgs> {
    if body.is_empty() {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(FindFirstArgs {
        attr: primitive::u8(src)?,
        path: primitive::remainder(src)?,
    })
}

/// FINDNEXT: `u16 dir handle, u16 position, u8 attributes, 11-byte FCB
/// mask`.
pub struct FindNextArgs {
    pub handle: u16,
    pub position: u16,
    pub attr: u8,
    pub mask: Fcb,
}

pub fn find_next(body: &[u8]) -> Result<FindNextArgs> {
    if body.len() < 16 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(FindNextArgs {
        handle: primitive::u16(src)?,
        position: primitive::u16(src)?,
        attr: primitive::u8(src)?,
        mask: primitive::fcb(src)?,
    })
}

/// SEEKFROMEND: `i32 offset, u16 handle`, exactly 6 bytes.
pub struct SeekArgs {
    pub offset: i32,
    pub handle: u16,
}

pub fn seek_from_end(body: &[u8]) -> Result<SeekArgs> {
    if body.len() != 6 {
        return Err(Error::BadLength);
    }
    let src = &mut Cursor::new(body);
    Ok(SeekArgs {
        offset: primitive::i32(src)?,
        handle: primitive::u16(src)?,
    })
}
