//! The serve loop tying the link-layer transport to the dispatcher.

use std::io;
use std::time::SystemTime;

use tracing::{debug, error, warn};

use crate::answers::AnswerCache;
use crate::dispatch;
use crate::drives::DriveTable;
use crate::frame::{self, FrameError, MacAddr, CHECKSUM_FLAG, RECV_BUFFER, SRC_OFFSET, VERSION_OFFSET};
use crate::handles::HandleCache;
use crate::net::FrameIo;

/// The server state: the immutable drive table plus the handle and answer
/// caches. Everything is owned by the single task running [`Server::serve`];
/// requests are handled strictly one at a time, in arrival order.
pub struct Server {
    drives: DriveTable,
    handles: HandleCache,
    answers: AnswerCache,
}

impl Server {
    pub fn new(drives: DriveTable) -> Self {
        Self {
            drives,
            handles: HandleCache::new(),
            answers: AnswerCache::new(),
        }
    }

    /// Receives, dispatches and answers frames until the transport fails.
    /// Shutdown happens outside: the caller races this future against its
    /// signal handlers.
    pub async fn serve<T: FrameIo>(&mut self, io: &mut T) -> io::Result<()> {
        let own = io.mac();
        let mut buf = [0u8; RECV_BUFFER];
        loop {
            let received = io.recv(&mut buf).await?;
            if let Some(reply) = self.handle_frame(&buf[..received], own) {
                if let Err(err) = io.send(reply).await {
                    error!("send failed: {err}");
                }
            }
        }
    }

    /// Validates and dispatches one received frame. Returns the stamped
    /// reply to transmit, if any.
    fn handle_frame(&mut self, raw: &[u8], own: MacAddr) -> Option<&[u8]> {
        let len = match frame::validate(raw, &own) {
            Ok(len) => len,
            // Stray traffic; not worth a log line above debug.
            Err(err @ (FrameError::TooShort | FrameError::NotForUs)) => {
                debug!("{err}");
                return None;
            }
            Err(err) => {
                if raw.len() >= SRC_OFFSET + 6 {
                    error!("{err} (from {})", MacAddr::from_slice(&raw[SRC_OFFSET..]));
                } else {
                    error!("{err}");
                }
                return None;
            }
        };
        let request = &raw[..len];
        let checksummed = request[VERSION_OFFSET] & CHECKSUM_FLAG != 0;
        let client = MacAddr::from_slice(&request[SRC_OFFSET..]);
        let now = SystemTime::now();

        let answer = self.answers.entry(&client);
        match dispatch::process(answer, request, own, &self.drives, &mut self.handles, now) {
            Ok(reply_len) => {
                answer.record(reply_len, now);
                answer.stamp(checksummed);
                Some(answer.frame())
            }
            Err(discard) => {
                answer.invalidate();
                warn!("query ignored: {discard}");
                None
            }
        }
    }
}
