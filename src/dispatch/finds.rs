//! Handlers for the FINDFIRST/FINDNEXT directory search protocol.

use std::io::Cursor;

use tracing::{debug, warn};

use super::{Context, Discard};
use crate::dos::Fcb;
use crate::fs::{self, SearchFlags};
use crate::parser::args::{FindFirstArgs, FindNextArgs};
use crate::{resolver, serializer};

/// "No more files". Returned even when the very first search finds nothing:
/// MS-DOS 5.x answers a failing FindFirst this way and applications such as
/// LapLink depend on it, so "file not found" would break them.
const NO_MORE_FILES: u16 = 0x12;

pub(super) fn first(
    ctx: &mut Context,
    args: FindFirstArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let request = resolver::normalize(&args.path);
    let (dir_part, mask_part) = resolver::split(&request);
    let mask = Fcb::from_name(mask_part.as_bytes());

    let mut flags = SearchFlags::empty();
    if resolver::is_root_request(dir_part) {
        flags |= SearchFlags::ROOT;
    }
    if ctx.fat {
        flags |= SearchFlags::FAT;
    }
    debug!("findfirst in '{dir_part}', mask '{mask}', attribs {:#04X}", args.attr);

    let host_dir = match resolver::resolve(ctx.root, dir_part) {
        Ok(dir) => dir,
        Err(resolver::Error::NotFound { partial }) => {
            // Let the failing directory scan produce the error code; the
            // partial path simply has no listing.
            warn!("findfirst: cannot obtain host path for '{dir_part}'");
            partial
        }
        Err(resolver::Error::Invalid) => {
            warn!("findfirst: invalid search path '{request}'");
            return Ok(NO_MORE_FILES);
        }
    };

    let handle = ctx.handles.intern(&host_dir, ctx.now);
    reply_with_match(ctx, handle, &mask, args.attr, 0, flags, out)
}

pub(super) fn next(
    ctx: &mut Context,
    args: FindNextArgs,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let mut flags = SearchFlags::empty();
    if ctx.fat {
        flags |= SearchFlags::FAT;
    }
    if let Some(dir) = ctx.handles.name_of(args.handle) {
        if dir == ctx.root {
            flags |= SearchFlags::ROOT;
        }
    }
    debug!(
        "findnext looks for file {} in dir {:#06X}, mask '{}'",
        args.position, args.handle, args.mask
    );
    reply_with_match(ctx, args.handle, &args.mask, args.attr, args.position, flags, out)
}

fn reply_with_match(
    ctx: &mut Context,
    handle: u16,
    mask: &Fcb,
    attr: u8,
    position: u16,
    flags: SearchFlags,
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let mut position = position;
    match fs::find_file(ctx.handles, handle, mask, attr, &mut position, flags) {
        None => {
            debug!("no more matching files");
            Ok(NO_MORE_FILES)
        }
        Some(props) => {
            debug!("found file {} (attr {:#04X})", props.fcb, props.attr.bits());
            serializer::found(out, &props, handle, position)?;
            Ok(0)
        }
    }
}
