use super::args;
use super::{Error, Subfunction};
use crate::dos::Fcb;

#[test]
fn opcode_decoding() {
    assert_eq!(Subfunction::from_opcode(0x00), Ok(Subfunction::InstallCheck));
    assert_eq!(Subfunction::from_opcode(0x1B), Ok(Subfunction::FindFirst));
    assert_eq!(Subfunction::from_opcode(0x2E), Ok(Subfunction::ExtendedOpen));
    assert_eq!(
        Subfunction::from_opcode(0x2D),
        Err(Error::UnknownSubfunction(0x2D))
    );
}

#[test]
fn read_args_take_exactly_eight_bytes() {
    let mut body = Vec::new();
    body.extend_from_slice(&0x1234u32.to_le_bytes());
    body.extend_from_slice(&7u16.to_le_bytes());
    body.extend_from_slice(&512u16.to_le_bytes());

    let args = args::read(&body).unwrap();
    assert_eq!(args.offset, 0x1234);
    assert_eq!(args.handle, 7);
    assert_eq!(args.len, 512);

    assert!(args::read(&body[..7]).is_err());
    body.push(0);
    assert!(args::read(&body).is_err());
}

#[test]
fn write_args_capture_the_payload() {
    let mut body = Vec::new();
    body.extend_from_slice(&9u32.to_le_bytes());
    body.extend_from_slice(&3u16.to_le_bytes());
    body.extend_from_slice(b"payload");

    let args = args::write(&body).unwrap();
    assert_eq!(args.offset, 9);
    assert_eq!(args.handle, 3);
    assert_eq!(args.data, b"payload");

    // A zero-length payload is valid: it encodes truncation.
    let args = args::write(&body[..6]).unwrap();
    assert!(args.data.is_empty());
    assert!(args::write(&body[..5]).is_err());
}

#[test]
fn rename_args_split_on_the_source_length() {
    let mut body = vec![8u8];
    body.extend_from_slice(b"\\OLD.TXT");
    body.extend_from_slice(b"\\NEW.TXT");

    let args = args::rename(&body).unwrap();
    assert_eq!(args.source, b"\\OLD.TXT");
    assert_eq!(args.target, b"\\NEW.TXT");

    // Source length pointing past the payload is inconsistent, not short.
    let bad = [40u8, b'a', b'b'];
    assert!(matches!(args::rename(&bad), Err(Error::BadPayload)));
    assert!(matches!(args::rename(&[1u8, b'a']), Err(Error::BadLength)));
}

#[test]
fn open_args_carry_three_stack_words() {
    let mut body = Vec::new();
    body.extend_from_slice(&0x0020u16.to_le_bytes());
    body.extend_from_slice(&0x0011u16.to_le_bytes());
    body.extend_from_slice(&0x0042u16.to_le_bytes());
    body.extend_from_slice(b"\\FILE.TXT");

    let args = args::open(&body).unwrap();
    assert_eq!(args.stack_attr, 0x20);
    assert_eq!(args.action, 0x11);
    assert_eq!(args.open_mode, 0x42);
    assert_eq!(args.path, b"\\FILE.TXT");
    assert!(args::open(&body[..5]).is_err());
}

#[test]
fn find_next_args_include_the_fcb_mask() {
    let mut body = Vec::new();
    body.extend_from_slice(&5u16.to_le_bytes());
    body.extend_from_slice(&2u16.to_le_bytes());
    body.push(0x10);
    body.extend_from_slice(b"????????TXT");

    let args = args::find_next(&body).unwrap();
    assert_eq!(args.handle, 5);
    assert_eq!(args.position, 2);
    assert_eq!(args.attr, 0x10);
    assert_eq!(args.mask, Fcb::from_bytes(*b"????????TXT"));
    assert!(args::find_next(&body[..15]).is_err());
}

#[test]
fn seek_args_take_exactly_six_bytes() {
    let mut body = Vec::new();
    body.extend_from_slice(&(-100i32).to_le_bytes());
    body.extend_from_slice(&9u16.to_le_bytes());

    let args = args::seek_from_end(&body).unwrap();
    assert_eq!(args.offset, -100);
    assert_eq!(args.handle, 9);

    body.push(0);
    assert!(args::seek_from_end(&body).is_err());
}
