//! Handlers for the file-level subfunctions: DISKSPACE, READ, WRITE, the
//! OPEN family and SEEKFROMEND.

use std::io::{Cursor, Write as _};

use tracing::{debug, error, warn};

use super::{Context, Discard};
use crate::dos::Attributes;
use crate::parser::args::{OpenArgs, ReadArgs, SeekArgs, WriteArgs};
use crate::{fs, resolver, serializer};

/// The upper bound MS-DOS clients tolerate: anything past 2 GiB confuses
/// their 16-bit cluster math.
const SPACE_LIMIT: u64 = 2 * 1024 * 1024 * 1024 - 1;

pub(super) fn disk_space(
    ctx: &mut Context,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let (mut total, mut free) = fs::disk_info(ctx.root);
    total = total.min(SPACE_LIMIT);
    free = free.min(SPACE_LIMIT);
    debug!("diskspace: total {} KiB, free {} KiB", total >> 10, free >> 10);
    // Report in 32 KiB clusters so a full 2 GiB still fits 16 bits.
    serializer::disk_space(out, (total >> 15) as u16, (free >> 15) as u16)?;
    // AX: sectors per cluster (low byte; the clients only accept 1) and
    // media id.
    Ok(1)
}

pub(super) fn read(
    ctx: &mut Context,
    args: ReadArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let Some(path) = ctx.handles.name_of(args.handle) else {
        error!("read with invalid handle {:#06X}", args.handle);
        return Ok(5);
    };
    debug!(
        "read {} bytes of '{}' from offset {}",
        args.len,
        path.display(),
        args.offset
    );
    let capacity = out.get_ref().len() - out.position() as usize;
    let len = usize::from(args.len).min(capacity);
    match fs::read_file(path, args.offset, len) {
        Ok(data) => {
            out.write_all(&data)?;
            Ok(0)
        }
        Err(err) => {
            warn!("read of '{}' failed: {err}", path.display());
            Ok(5)
        }
    }
}

pub(super) fn write(
    ctx: &mut Context,
    args: WriteArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let Some(path) = ctx.handles.name_of(args.handle) else {
        error!("write with invalid handle {:#06X}", args.handle);
        return Ok(5);
    };
    match fs::write_file(path, args.offset, &args.data) {
        Ok(written) => {
            serializer::u16(out, written as u16)?;
            Ok(0)
        }
        Err(err) => {
            error!("write to '{}' failed: {err}", path.display());
            Ok(5)
        }
    }
}

/// Which member of the OPEN family is running. They share their reply shape
/// and most of the path work.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpenKind {
    /// Plain OPEN: the file must exist and be a regular file.
    Open,
    /// CREATE: create or truncate unconditionally.
    Create,
    /// SPOPENFILE: behavior picked by the request's action code.
    Extended,
}

pub(super) fn open(
    ctx: &mut Context,
    kind: OpenKind,
    args: OpenArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let request = resolver::normalize(&args.path);
    let (dir_part, name_part) = resolver::split(&request);

    let host_dir = match resolver::resolve(ctx.root, dir_part) {
        Ok(dir) if fs::dir_exists(&dir) => dir,
        _ => {
            debug!("{kind:?} '{request}' failed: directory does not exist");
            return Ok(3);
        }
    };
    // When the file already exists the host spelling wins; otherwise the
    // requested (lowercased) name seeds a new entry in the resolved
    // directory.
    let host_path = match resolver::resolve(ctx.root, &request) {
        Ok(path) => path,
        Err(_) => host_dir.join(name_part),
    };

    let attr = Attributes::from_bits_truncate(args.stack_attr as u8);
    let outcome = match kind {
        OpenKind::Create => {
            debug!("create '{}' attr {:#04X}", host_path.display(), args.stack_attr);
            fs::create_file(&host_path, attr, ctx.fat)
                .map(|props| (props, 0, 2))
        }
        OpenKind::Open => {
            debug!("open '{}' modes {:#06X}", host_path.display(), args.stack_attr);
            match fs::get_attr(&host_path, ctx.fat) {
                Some(props)
                    if !props
                        .attr
                        .intersects(Attributes::VOLUME | Attributes::DIRECTORY) =>
                {
                    Some((props, 0, args.stack_attr as u8))
                }
                _ => None,
            }
        }
        OpenKind::Extended => extended_open(ctx, &args, &host_path, attr),
    };

    match outcome {
        Some((props, special_result, open_mode)) => {
            let handle = ctx.handles.intern(&host_path, ctx.now);
            debug!(
                "serving '{}' as handle {handle:#06X} ({} bytes, attr {:#04X})",
                host_path.display(),
                props.size,
                props.attr.bits()
            );
            serializer::opened(out, &props, handle, special_result, open_mode)?;
            Ok(0)
        }
        None => {
            debug!("{kind:?} '{request}' failed");
            Ok(2)
        }
    }
}

/// SPOPENFILE's action code: the high nibble decides what to do when the
/// file is missing (1 = create), the low nibble when it exists (1 = open,
/// 2 = truncate). The reply's special result word reports what happened:
/// 1 opened, 2 created, 3 truncated.
fn extended_open(
    ctx: &mut Context,
    args: &OpenArgs,
    host_path: &std::path::Path,
    attr: Attributes,
) -> Option<(fs::FileProps, u16, u8)> {
    let open_mode = (args.open_mode & 0x7F) as u8;
    debug!(
        "special open '{}' action {:#06X} openmode {:#06X}",
        host_path.display(),
        args.action,
        args.open_mode
    );
    match fs::get_attr(host_path, ctx.fat) {
        None => {
            if args.action & 0xF0 == 0x10 {
                let props = fs::create_file(host_path, attr, ctx.fat)?;
                Some((props, 2, open_mode))
            } else {
                None
            }
        }
        Some(props)
            if props
                .attr
                .intersects(Attributes::VOLUME | Attributes::DIRECTORY) =>
        {
            debug!("'{}' is a directory or volume label", host_path.display());
            None
        }
        Some(props) => match args.action & 0x0F {
            1 => Some((props, 1, open_mode)),
            2 => {
                let props = fs::create_file(host_path, attr, ctx.fat)?;
                Some((props, 3, open_mode))
            }
            _ => None,
        },
    }
}

pub(super) fn seek_from_end(
    ctx: &mut Context,
    args: SeekArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    // Callers pass zero or negative offsets; anything positive is clamped.
    let offset = args.offset.min(0);
    debug!("seek from end of file {:#06X} at offset {offset}", args.handle);
    match ctx.handles.name_of(args.handle).and_then(fs::file_size) {
        None => {
            debug!("file not found");
            Ok(2)
        }
        Some(size) => {
            let absolute = (i64::from(size) + i64::from(offset)).max(0) as u32;
            serializer::u32(out, absolute)?;
            Ok(0)
        }
    }
}
