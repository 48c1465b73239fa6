//! Handlers for the pathname subfunctions: directory management, attribute
//! access, RENAME and DELETE.

use std::io::Cursor;

use tracing::{debug, error, warn};

use super::{Context, Discard};
use crate::dos::{Attributes, Fcb};
use crate::parser::args::{RenameArgs, SetAttrArgs};
use crate::{fs, resolver, serializer};

pub(super) fn make_dir(ctx: &mut Context, raw: &[u8]) -> u16 {
    let request = resolver::normalize(raw);
    let target = match resolver::resolve(ctx.root, &request) {
        Ok(existing) => {
            // The new name resolving means some entry already FCB-matches
            // it; mkdir on the host spelling will fail accordingly.
            warn!("mkdir '{request}': an entry matching this name already exists");
            existing
        }
        // The failing component rides along verbatim, which is exactly the
        // path the new directory should get.
        Err(resolver::Error::NotFound { partial }) => partial,
        Err(resolver::Error::Invalid) => return 0x1D,
    };
    debug!("mkdir '{}'", target.display());
    match fs::make_dir(&target) {
        Ok(()) => 0,
        Err(err) => {
            error!("mkdir '{}' failed: {err}", target.display());
            0x1D
        }
    }
}

pub(super) fn remove_dir(ctx: &mut Context, raw: &[u8]) -> u16 {
    let request = resolver::normalize(raw);
    let target = match resolver::resolve(ctx.root, &request) {
        Ok(dir) => dir,
        Err(resolver::Error::NotFound { partial }) => partial,
        Err(resolver::Error::Invalid) => return 0x1D,
    };
    debug!("rmdir '{}'", target.display());
    match fs::remove_dir(&target) {
        Ok(()) => 0,
        Err(err) => {
            error!("rmdir '{}' failed: {err}", target.display());
            0x1D
        }
    }
}

/// CHDIR is purely an existence check; no directory state is kept.
pub(super) fn change_dir(ctx: &mut Context, raw: &[u8]) -> u16 {
    let request = resolver::normalize(raw);
    debug!("chdir '{request}'");
    match resolver::resolve(ctx.root, &request) {
        Ok(dir) if fs::dir_exists(&dir) => 0,
        _ => {
            warn!("chdir '{request}': no such directory");
            3
        }
    }
}

pub(super) fn set_attributes(ctx: &mut Context, args: SetAttrArgs) -> u16 {
    let request = resolver::normalize(&args.path);
    debug!("setattr '{request}' attr {:#04X}", args.attr);
    let path = match resolver::resolve(ctx.root, &request) {
        Ok(path) => path,
        Err(_) => {
            warn!("setattr: cannot obtain host path for '{request}'");
            return 2;
        }
    };
    // Attribute bits only exist on FAT; elsewhere the call silently
    // succeeds so clients keep working.
    if !ctx.fat {
        return 0;
    }
    match fs::set_attr(&path, Attributes::from_bits_truncate(args.attr)) {
        Ok(()) => 0,
        Err(err) => {
            warn!("setattr on '{}' failed: {err}", path.display());
            2
        }
    }
}

pub(super) fn get_attributes(
    ctx: &mut Context,
    raw: &[u8],
    out: &mut Cursor<&mut [u8]>,
) -> Result<u16, Discard> {
    let request = resolver::normalize(raw);
    debug!("getattr '{request}' (fat={})", ctx.fat);
    let path = match resolver::resolve(ctx.root, &request) {
        Ok(path) => path,
        Err(_) => {
            warn!("getattr: cannot obtain host path for '{request}'");
            return Ok(2);
        }
    };
    match fs::get_attr(&path, ctx.fat) {
        None => {
            debug!("no file found");
            Ok(2)
        }
        Some(props) => {
            debug!("found it ({} bytes, attr {:#04X})", props.size, props.attr.bits());
            serializer::attributes(out, &props)?;
            Ok(0)
        }
    }
}

pub(super) fn rename(ctx: &mut Context, args: RenameArgs) -> u16 {
    let source_request = resolver::normalize(&args.source);
    let target_request = resolver::normalize(&args.target);
    debug!("rename '{source_request}' -> '{target_request}'");
    let source = match resolver::resolve(ctx.root, &source_request) {
        Ok(path) => path,
        Err(_) => {
            error!("rename: cannot obtain host path for '{source_request}'");
            return 0;
        }
    };
    // The existence check runs against the unresolved target spelling; a
    // case-variant file on the host can evade it.
    let target = resolver::literal(ctx.root, &target_request);
    if fs::get_attr(&target, false).is_some() {
        debug!("'{}' exists already", target.display());
        return 5;
    }
    match fs::rename(&source, &target) {
        Ok(()) => 0,
        Err(err) => {
            error!("rename to '{}' failed: {err}", target.display());
            5
        }
    }
}

pub(super) fn delete(ctx: &mut Context, raw: &[u8]) -> u16 {
    let request = resolver::normalize(raw);
    debug!("delete '{request}'");
    let (dir_part, mask_part) = resolver::split(&request);
    if mask_part.contains('?') {
        let dir = match resolver::resolve(ctx.root, dir_part) {
            Ok(dir) => dir,
            Err(_) => {
                warn!("delete: cannot obtain host path for '{dir_part}'");
                return 2;
            }
        };
        match fs::del_files(&dir, &Fcb::from_name(mask_part.as_bytes())) {
            Ok(count) => {
                debug!("deleted {count} files");
                0
            }
            Err(err) => {
                warn!("wildcard delete in '{}' failed: {err}", dir.display());
                2
            }
        }
    } else {
        let path = match resolver::resolve(ctx.root, &request) {
            Ok(path) => path,
            Err(_) => {
                warn!("delete: cannot obtain host path for '{request}'");
                return 2;
            }
        };
        match fs::get_attr(&path, ctx.fat) {
            None => 2,
            Some(props) if props.attr.contains(Attributes::READ_ONLY) => 5,
            Some(_) => match fs::remove_file(&path) {
                Ok(()) => 0,
                Err(err) => {
                    warn!("failed to delete '{}': {err}", path.display());
                    2
                }
            },
        }
    }
}
