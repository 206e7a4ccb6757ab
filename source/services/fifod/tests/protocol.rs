// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host tests for fifod frame decoding/encoding bounds
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 7 tests, 2 property tests
//! ADR: docs/adr/0017-service-architecture.md

use fifod::protocol::{
    clamp_path, decode_request, decode_response, encode_request, encode_response, encode_status_response,
    DecodeError, OpenRequest, Request, Response, Status, WriteRequest, MAGIC0, MAGIC1, MAX_DATA_LEN,
    MAX_PATH_LEN, OP_CLOSE, OP_OPEN, OP_READ, OP_WRITE, VERSION,
};
use proptest::prelude::*;

#[test]
fn decode_open_smoke() {
    let mut frame = vec![MAGIC0, MAGIC1, VERSION, OP_OPEN];
    frame.extend_from_slice(&9u16.to_le_bytes()); // path_len
    frame.extend_from_slice(b"/dev/fifo");
    match decode_request(&frame).expect("decode") {
        Request::Open(open) => assert_eq!(open.path, "/dev/fifo"),
        _ => panic!("wrong request"),
    }
}

#[test]
fn decode_read_keeps_negative_length() {
    let mut frame = vec![MAGIC0, MAGIC1, VERSION, OP_READ];
    frame.extend_from_slice(&7u32.to_le_bytes());
    frame.extend_from_slice(&(-5i64).to_le_bytes());
    frame.extend_from_slice(&64u32.to_le_bytes());
    match decode_request(&frame).expect("decode") {
        Request::Read(read) => {
            assert_eq!(read.handle, 7);
            assert_eq!(read.len, -5);
            assert_eq!(read.buf_cap, 64);
        }
        _ => panic!("wrong request"),
    }
}

#[test]
fn decode_rejects_bad_frames() {
    assert_eq!(decode_request(b"FD"), Err(DecodeError::Malformed));
    assert_eq!(decode_request(&[MAGIC0, MAGIC1, 9, OP_OPEN]), Err(DecodeError::Unsupported));
    assert_eq!(decode_request(&[MAGIC0, MAGIC1, VERSION, 42]), Err(DecodeError::Unsupported));
    assert_eq!(
        decode_request(&[MAGIC0, MAGIC1, VERSION, OP_CLOSE, 1, 0, 0]),
        Err(DecodeError::Malformed)
    );

    let mut open = vec![MAGIC0, MAGIC1, VERSION, OP_OPEN];
    open.extend_from_slice(&((MAX_PATH_LEN + 1) as u16).to_le_bytes());
    assert_eq!(decode_request(&open), Err(DecodeError::TooLarge));

    let mut write = vec![MAGIC0, MAGIC1, VERSION, OP_WRITE];
    write.extend_from_slice(&1u32.to_le_bytes());
    write.extend_from_slice(&0i64.to_le_bytes());
    write.extend_from_slice(&((MAX_DATA_LEN + 1) as u32).to_le_bytes());
    assert_eq!(decode_request(&write), Err(DecodeError::TooLarge));
}

#[test]
fn write_request_survives_encoding() {
    let request = Request::Write(WriteRequest { handle: 3, len: 10, data: b"abc".to_vec() });
    assert_eq!(decode_request(&encode_request(&request)), Ok(request));
}

#[test]
fn long_open_path_is_cut_at_char_boundary() {
    let path = format!("/dev/{}é", "a".repeat(MAX_PATH_LEN - 6));
    assert_eq!(path.len(), MAX_PATH_LEN + 1);
    assert_eq!(clamp_path(&path), &path[..MAX_PATH_LEN - 1]);
    let frame = encode_request(&Request::Open(OpenRequest { path: path.clone() }));
    match decode_request(&frame).expect("decode") {
        Request::Open(open) => assert_eq!(open.path, &path[..MAX_PATH_LEN - 1]),
        _ => panic!("wrong request"),
    }
}

#[test]
fn failed_responses_carry_no_payload() {
    let frame = encode_status_response(OP_READ, Status::BadAddress);
    assert_eq!(frame.len(), 5);
    assert_eq!(
        decode_response(&frame),
        Ok(Response::Read { status: Status::BadAddress, data: Vec::new() })
    );
    let ok = encode_response(&Response::Read { status: Status::Ok, data: b"xy".to_vec() });
    assert_eq!(&ok[5..], &[2, 0, 0, 0, b'x', b'y']);
}

#[test]
fn responses_are_not_requests() {
    let frame = encode_response(&Response::Close { status: Status::Ok });
    assert_eq!(decode_request(&frame), Err(DecodeError::Malformed));
    let request = encode_request(&Request::Close(fifod::protocol::CloseRequest { handle: 1 }));
    assert_eq!(decode_response(&request), Err(DecodeError::Malformed));
}

proptest! {
    #[test]
    fn decode_request_never_panics(frame in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_request(&frame);
    }

    #[test]
    fn decode_response_never_panics(
        op in 0u8..8,
        tail in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut frame = vec![MAGIC0, MAGIC1, VERSION, op | 0x80];
        frame.extend_from_slice(&tail);
        let _ = decode_response(&frame);
    }
}
