#![allow(dead_code)]

use std::path::PathBuf;
use std::time::SystemTime;

use tempfile::TempDir;

use ethersrv::answers::AnswerCache;
use ethersrv::dispatch::{self, Discard};
use ethersrv::drives::{Drive, DriveTable};
use ethersrv::frame::{self, MacAddr, HEADER_LEN};
use ethersrv::handles::HandleCache;

pub const SERVER_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0xEE]);
pub const CLIENT_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];

/// A drive C: exported from a temporary directory, plus the server caches,
/// driven directly through the dispatcher.
pub struct Fixture {
    pub tempdir: TempDir,
    pub drives: DriveTable,
    pub handles: HandleCache,
    pub answers: AnswerCache,
    seq: u8,
}

impl Fixture {
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let mut drives = DriveTable::new();
        drives.map(
            2,
            Drive {
                root: tempdir.path().to_path_buf(),
                fat: false,
            },
        );
        Self {
            tempdir,
            drives,
            handles: HandleCache::new(),
            answers: AnswerCache::new(),
            seq: 0,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.tempdir.path().join(name)
    }

    pub fn write_file(&self, name: &str, data: &[u8]) {
        std::fs::write(self.path(name), data).expect("write fixture file");
    }

    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir(self.path(name)).expect("create fixture dir");
    }

    /// Sends one request on drive C: with a fresh sequence byte and returns
    /// the reply frame.
    pub fn request(&mut self, op: u8, body: &[u8]) -> Result<Vec<u8>, Discard> {
        self.seq = self.seq.wrapping_add(1);
        let frame = build_frame(CLIENT_MAC, self.seq, 2, op, body);
        self.dispatch(&frame)
    }

    /// Dispatches a prebuilt frame, maintaining the answer cache the way
    /// the serve loop does.
    pub fn dispatch(&mut self, frame: &[u8]) -> Result<Vec<u8>, Discard> {
        let now = SystemTime::now();
        let answer = self.answers.entry(&MacAddr::from_slice(&frame[6..12]));
        match dispatch::process(
            answer,
            frame,
            SERVER_MAC,
            &self.drives,
            &mut self.handles,
            now,
        ) {
            Ok(len) => {
                answer.record(len, now);
                Ok(answer.frame().to_vec())
            }
            Err(discard) => {
                answer.invalidate();
                Err(discard)
            }
        }
    }
}

/// Builds a raw request frame: 60-byte header plus the subfunction payload.
pub fn build_frame(client: [u8; 6], seq: u8, drive: u8, op: u8, body: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; HEADER_LEN + body.len()];
    frame[..6].copy_from_slice(SERVER_MAC.as_bytes());
    frame[6..12].copy_from_slice(&client);
    frame[12..14].copy_from_slice(&frame::ETHERTYPE.to_be_bytes());
    frame[56] = frame::PROTO_VERSION;
    frame[57] = seq;
    frame[58] = drive;
    frame[59] = op;
    frame[60..].copy_from_slice(body);
    frame
}

/// Flags a built frame as checksummed and stores the correct sum.
pub fn with_checksum(mut frame: Vec<u8>) -> Vec<u8> {
    frame[56] |= frame::CHECKSUM_FLAG;
    let sum = frame::bsd_checksum(&frame[56..]);
    frame[54..56].copy_from_slice(&sum.to_le_bytes());
    frame
}

/// The AX result code of a reply.
pub fn ax(reply: &[u8]) -> u16 {
    u16::from_le_bytes([reply[58], reply[59]])
}

/// The opcode-specific payload of a reply.
pub fn body(reply: &[u8]) -> &[u8] {
    &reply[HEADER_LEN..]
}

pub fn le16(raw: &[u8]) -> u16 {
    u16::from_le_bytes([raw[0], raw[1]])
}

pub fn le32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

/// Builds the OPEN/CREATE/SPOPENFILE payload: three stack words plus path.
pub fn open_body(stack_attr: u16, action: u16, open_mode: u16, path: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&stack_attr.to_le_bytes());
    body.extend_from_slice(&action.to_le_bytes());
    body.extend_from_slice(&open_mode.to_le_bytes());
    body.extend_from_slice(path);
    body
}

/// Builds the READFILE payload.
pub fn read_body(offset: u32, handle: u16, len: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&offset.to_le_bytes());
    body.extend_from_slice(&handle.to_le_bytes());
    body.extend_from_slice(&len.to_le_bytes());
    body
}

/// Builds the WRITEFILE payload.
pub fn write_body(offset: u32, handle: u16, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&offset.to_le_bytes());
    body.extend_from_slice(&handle.to_le_bytes());
    body.extend_from_slice(data);
    body
}

/// OPEN family replies: (handle, special-open result, open mode).
pub fn opened_fields(reply: &[u8]) -> (u16, u16, u8) {
    let b = body(reply);
    (le16(&b[20..]), le16(&b[22..]), b[24])
}
