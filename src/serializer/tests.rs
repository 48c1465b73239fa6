use super::*;
use crate::dos::{Attributes, Fcb};

fn sample() -> FileProps {
    FileProps {
        attr: Attributes::ARCHIVE,
        size: 0x0102_0304,
        time: 0x0A0B_0C0D,
        fcb: Fcb::from_name(b"hello.txt"),
    }
}

#[test]
fn found_layout_is_24_bytes() {
    let mut out = Vec::new();
    found(&mut out, &sample(), 0x1234, 3).unwrap();
    assert_eq!(out.len(), 24);
    assert_eq!(out[0], 0x20);
    assert_eq!(&out[1..12], b"HELLO   TXT");
    assert_eq!(&out[12..16], &[0x0D, 0x0C, 0x0B, 0x0A]);
    assert_eq!(&out[16..20], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(&out[20..22], &[0x34, 0x12]);
    assert_eq!(&out[22..24], &[0x03, 0x00]);
}

#[test]
fn opened_layout_is_25_bytes() {
    let mut out = Vec::new();
    opened(&mut out, &sample(), 0x00FE, 2, 0x42).unwrap();
    assert_eq!(out.len(), 25);
    assert_eq!(&out[20..22], &[0xFE, 0x00]);
    assert_eq!(&out[22..24], &[0x02, 0x00]);
    assert_eq!(out[24], 0x42);
}

#[test]
fn attributes_layout_is_9_bytes() {
    let mut out = Vec::new();
    attributes(&mut out, &sample()).unwrap();
    assert_eq!(out.len(), 9);
    assert_eq!(&out[0..4], &[0x0D, 0x0C, 0x0B, 0x0A]);
    assert_eq!(&out[4..8], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(out[8], 0x20);
}

#[test]
fn disk_space_layout() {
    let mut out = Vec::new();
    disk_space(&mut out, 0x8000, 0x2000).unwrap();
    assert_eq!(out, [0x00, 0x80, 0x00, 0x80, 0x00, 0x20]);
}
