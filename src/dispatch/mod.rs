//! The subfunction dispatcher, heart of the protocol.
//!
//! [`process`] turns one validated request frame into one reply frame built
//! inside the caller's answer-cache slot: it replays the cached reply on a
//! retransmission, mirrors the request header with swapped addresses,
//! selects the subfunction handler, and leaves the DOS result code in AX
//! (bytes 58..60). A [`Discard`] means the frame gets no reply at all and
//! the client will retry on its own schedule.

mod files;
mod finds;
mod paths;

use std::fmt;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, error};

use crate::answers::Answer;
use crate::drives::{letter, DriveTable};
use crate::frame::{MacAddr, AX_OFFSET, BODY_OFFSET, DRIVE_OFFSET, HEADER_LEN, QUERY_OFFSET, SEQUENCE_OFFSET, SRC_OFFSET};
use crate::handles::HandleCache;
use crate::parser::{self, Subfunction};

pub use files::OpenKind;

/// Why a request frame is dropped without a reply.
#[derive(Debug)]
pub enum Discard {
    /// Below the minimum frame size.
    TooShort,
    /// Drive number outside C..Z.
    InvalidDrive(u8),
    /// Drive is valid but not exported.
    UnknownDrive(u8),
    /// Unsupported opcode or payload that does not parse.
    Request(parser::Error),
    /// Reply would not fit the frame buffer.
    ReplyOverflow,
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discard::TooShort => write!(f, "request shorter than {HEADER_LEN} bytes"),
            Discard::InvalidDrive(d) => write!(f, "invalid drive value {d:#04X}"),
            Discard::UnknownDrive(d) => write!(f, "unknown drive {}:", letter(*d)),
            Discard::Request(err) => write!(f, "{err}"),
            Discard::ReplyOverflow => write!(f, "reply exceeds the frame buffer"),
        }
    }
}

impl From<parser::Error> for Discard {
    fn from(err: parser::Error) -> Self {
        Discard::Request(err)
    }
}

impl From<io::Error> for Discard {
    fn from(_: io::Error) -> Self {
        Discard::ReplyOverflow
    }
}

/// Everything a subfunction handler may touch: the drive being addressed
/// and the process-wide handle cache.
struct Context<'a> {
    root: &'a Path,
    fat: bool,
    handles: &'a mut HandleCache,
    now: SystemTime,
}

/// Dispatches one request frame, building the reply into `answer`.
///
/// Returns the total reply length (at least [`HEADER_LEN`]). The caller is
/// responsible for stamping the trailer fields and transmitting, and for
/// recording or invalidating the answer slot afterwards.
pub fn process(
    answer: &mut Answer,
    request: &[u8],
    own_mac: MacAddr,
    drives: &DriveTable,
    handles: &mut HandleCache,
    now: SystemTime,
) -> Result<usize, Discard> {
    if request.len() < HEADER_LEN {
        return Err(Discard::TooShort);
    }
    // A client that missed our reply re-sends its request with the same
    // sequence byte; re-executing it could destroy data, so replay the
    // stored reply as-is.
    if answer.matches_retry(request) {
        debug!("cache hit (seq {})", request[SEQUENCE_OFFSET]);
        return Ok(answer.len());
    }

    let drive = request[DRIVE_OFFSET] & 0x1F;
    let opcode = request[QUERY_OFFSET];

    let frame = answer.frame_mut();
    frame[..HEADER_LEN].copy_from_slice(&request[..HEADER_LEN]);
    frame[..6].copy_from_slice(&request[SRC_OFFSET..SRC_OFFSET + 6]);
    frame[6..12].copy_from_slice(own_mac.as_bytes());

    if !(2..=25).contains(&drive) {
        error!("invalid drive value {drive:#04X}");
        return Err(Discard::InvalidDrive(drive));
    }
    let Some(share) = drives.get(drive) else {
        error!("unknown drive: {}: ({drive:#04X})", letter(drive));
        return Err(Discard::UnknownDrive(drive));
    };

    let sub = Subfunction::from_opcode(opcode)?;
    let body = &request[BODY_OFFSET..];
    debug!("got query {opcode:#04X} for drive {}:", letter(drive));

    let mut ctx = Context {
        root: &share.root,
        fat: share.fat,
        handles,
        now,
    };
    let (head, tail) = frame.split_at_mut(BODY_OFFSET);
    let mut out = Cursor::new(tail);

    let ax: u16 = match sub {
        Subfunction::InstallCheck => 0,
        Subfunction::CommitFile => 0,
        Subfunction::CloseFile => {
            // No descriptors are kept open between requests, so there is
            // nothing to close.
            debug!("close file");
            0
        }
        Subfunction::LockFile | Subfunction::UnlockFile => 0,
        Subfunction::DiskSpace => files::disk_space(&mut ctx, &mut out)?,
        Subfunction::ReadFile => files::read(&mut ctx, parser::args::read(body)?, &mut out)?,
        Subfunction::WriteFile => files::write(&mut ctx, parser::args::write(body)?, &mut out)?,
        Subfunction::Open => {
            files::open(&mut ctx, OpenKind::Open, parser::args::open(body)?, &mut out)?
        }
        Subfunction::Create => {
            files::open(&mut ctx, OpenKind::Create, parser::args::open(body)?, &mut out)?
        }
        Subfunction::ExtendedOpen => {
            files::open(&mut ctx, OpenKind::Extended, parser::args::open(body)?, &mut out)?
        }
        Subfunction::SeekFromEnd => {
            files::seek_from_end(&mut ctx, parser::args::seek_from_end(body)?, &mut out)?
        }
        Subfunction::FindFirst => {
            finds::first(&mut ctx, parser::args::find_first(body)?, &mut out)?
        }
        Subfunction::FindNext => finds::next(&mut ctx, parser::args::find_next(body)?, &mut out)?,
        Subfunction::MakeDir => paths::make_dir(&mut ctx, body),
        Subfunction::RemoveDir => paths::remove_dir(&mut ctx, body),
        Subfunction::ChangeDir => paths::change_dir(&mut ctx, body),
        Subfunction::SetAttributes => {
            paths::set_attributes(&mut ctx, parser::args::set_attr(body)?)
        }
        Subfunction::GetAttributes => {
            paths::get_attributes(&mut ctx, parser::args::attr_path(body)?, &mut out)?
        }
        Subfunction::Rename => match parser::args::rename(body) {
            Ok(args) => paths::rename(&mut ctx, args),
            // A source length pointing past the payload earns "file not
            // found" rather than silence.
            Err(parser::Error::BadPayload) => 2,
            Err(err) => return Err(Discard::Request(err)),
        },
        Subfunction::Delete => paths::delete(&mut ctx, body),
    };

    let written = out.position() as usize;
    head[AX_OFFSET..AX_OFFSET + 2].copy_from_slice(&ax.to_le_bytes());
    Ok(HEADER_LEN + written)
}
