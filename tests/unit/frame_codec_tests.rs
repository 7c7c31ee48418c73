//! Unit tests for the event-stream frame codec.
//!
//! Covers:
//! - encoding of updates and keep-alive comment frames
//! - partial delivery buffered until the blank-line delimiter
//! - CRLF delimiters
//! - frames without a data line are skipped
//! - oversized frames are rejected once and then discarded, however split
//! - `data:` lines: optional space or tab, multiple lines joined
//! - trailing frame without delimiter is flushed at end of stream

use bytes::BytesMut;
use chrono::{TimeZone, Utc};
use tokio_util::codec::{Decoder, Encoder};

use job_relay::frame::{FrameCodec, OutboundFrame, MAX_FRAME_BYTES};
use job_relay::models::progress::ProgressUpdate;
use job_relay::AppError;

fn sample_update() -> ProgressUpdate {
    let mut update = ProgressUpdate::new("job-1", vec!["Called tool \"web_search\"".into()])
        .with_tokens(Some(12), Some(4));
    update.timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    update
}

// ── Encoder ──────────────────────────────────────────────────────────────────

#[test]
fn update_encodes_as_single_data_frame() {
    let mut codec = FrameCodec::new();
    let bytes = codec
        .encode_to_bytes(OutboundFrame::Update(sample_update()))
        .expect("encode");
    let text = std::str::from_utf8(&bytes).expect("utf8");

    assert!(text.starts_with("data: {"), "frame must open with the data prefix: {text}");
    assert!(text.ends_with("}\n\n"), "frame must end with one blank line: {text}");
    assert_eq!(text.matches("\n\n").count(), 1, "no embedded blank line");
    assert!(text.contains("\"jobId\":\"job-1\""));
    assert!(text.contains("\"inputTokens\":12"));
    assert!(!text.contains("isFinal"), "absent optional fields are omitted");
}

#[test]
fn multiline_message_does_not_break_framing() {
    let mut codec = FrameCodec::new();
    let update = ProgressUpdate::new("job-1", vec!["line one\n\nline three".into()]);
    let bytes = codec
        .encode_to_bytes(OutboundFrame::Update(update.clone()))
        .expect("encode");

    let mut buf = BytesMut::from(&bytes[..]);
    let payload = codec.decode(&mut buf).expect("decode").expect("one frame");
    let decoded: ProgressUpdate = serde_json::from_str(&payload).expect("json");
    assert_eq!(decoded, update);
    assert!(buf.is_empty());
}

#[test]
fn keep_alive_encodes_as_comment_frame() {
    let mut codec = FrameCodec::new();
    let mut dst = BytesMut::new();
    codec.encode(OutboundFrame::KeepAlive, &mut dst).expect("encode");
    assert_eq!(&dst[..], b": keep-alive\n\n");
}

// ── Decoder ──────────────────────────────────────────────────────────────────

#[test]
fn partial_frame_is_buffered_until_delimiter() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: {\"a\":1}\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), None);

    buf.extend_from_slice(b"\n");
    assert_eq!(
        codec.decode(&mut buf).expect("decode"),
        Some("{\"a\":1}".to_owned())
    );
    assert!(buf.is_empty());
}

#[test]
fn batched_frames_are_decoded_in_order() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: one\n\ndata: two\n\ndata: thr");

    assert_eq!(codec.decode(&mut buf).expect("first"), Some("one".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("second"), Some("two".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("partial"), None);
    assert_eq!(&buf[..], b"data: thr");
}

#[test]
fn crlf_delimited_frames_decode() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: one\r\n\r\ndata: two\r\n\r\n");

    assert_eq!(codec.decode(&mut buf).expect("first"), Some("one".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("second"), Some("two".to_owned()));
}

#[test]
fn crlf_split_across_fragments_still_delimits() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: one\r\n\r");
    assert_eq!(codec.decode(&mut buf).expect("partial"), None);

    buf.extend_from_slice(b"\n");
    assert_eq!(codec.decode(&mut buf).expect("complete"), Some("one".to_owned()));
}

#[test]
fn comment_frames_are_skipped() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(": keep-alive\n\nevent: ping\n\ndata: real\n\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("real".to_owned()));
    assert!(buf.is_empty());
}

#[test]
fn oversized_frame_is_rejected_then_discarded() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(&b"data: "[..]);
    buf.extend_from_slice(&vec![b'x'; MAX_FRAME_BYTES + 1]);

    let err = codec.decode(&mut buf).expect_err("oversized frame must fail");
    assert!(
        matches!(&err, AppError::Protocol(msg) if msg.contains("frame too long")),
        "unexpected error: {err}"
    );

    // The tail of the oversized frame is dropped without a second error.
    buf.extend_from_slice(b"xxxx\n\ndata: next\n\n");
    assert_eq!(codec.decode(&mut buf).expect("resume"), Some("next".to_owned()));
}

#[test]
fn frame_at_the_limit_decodes_when_its_delimiter_arrives_late() {
    let body = format!("data: {}", "x".repeat(MAX_FRAME_BYTES - 6));
    assert_eq!(body.len(), MAX_FRAME_BYTES);

    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(body.as_str());
    buf.extend_from_slice(b"\n");
    assert_eq!(codec.decode(&mut buf).expect("pending"), None);

    buf.extend_from_slice(b"\n");
    let payload = codec.decode(&mut buf).expect("decode").expect("frame");
    assert_eq!(payload.len(), MAX_FRAME_BYTES - 6);
}

#[test]
fn frame_one_byte_over_the_limit_fails_whole_or_split() {
    let mut frame = format!("data: {}", "x".repeat(MAX_FRAME_BYTES - 5)).into_bytes();
    frame.extend_from_slice(b"\n\ndata: next\n\n");

    let mut whole = FrameCodec::new();
    let mut buf = BytesMut::from(&frame[..]);
    assert!(whole.decode(&mut buf).is_err());
    assert_eq!(whole.decode(&mut buf).expect("resume"), Some("next".to_owned()));

    let mut split = FrameCodec::new();
    let mut errors = 0;
    let mut payloads = Vec::new();
    let mut buf = BytesMut::new();
    for chunk in frame.chunks(4096) {
        buf.extend_from_slice(chunk);
        loop {
            match split.decode(&mut buf) {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => break,
                Err(_) => errors += 1,
            }
        }
    }
    assert_eq!(errors, 1);
    assert_eq!(payloads, vec!["next".to_owned()]);
}

#[test]
fn tab_after_data_prefix_is_dropped() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data:\tone\n\n");
    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("one".to_owned()));
}

#[test]
fn multiple_data_lines_join_with_newline() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: {\"a\":\ndata: 1}\n\n");
    assert_eq!(
        codec.decode(&mut buf).expect("decode"),
        Some("{\"a\":\n1}".to_owned())
    );
}

#[test]
fn trailing_frame_is_flushed_at_eof() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("data: one\n\ndata: tail");

    assert_eq!(codec.decode_eof(&mut buf).expect("first"), Some("one".to_owned()));
    assert_eq!(codec.decode_eof(&mut buf).expect("tail"), Some("tail".to_owned()));
    assert_eq!(codec.decode_eof(&mut buf).expect("empty"), None);
}

#[test]
fn multibyte_character_split_across_fragments_survives() {
    let mut codec = FrameCodec::new();
    let frame = "data: caf\u{e9} \u{2600}\n\n".as_bytes();
    // Split inside the two-byte 'é'.
    let split = frame.iter().position(|b| *b == 0xC3).expect("lead byte") + 1;

    let mut buf = BytesMut::from(&frame[..split]);
    assert_eq!(codec.decode(&mut buf).expect("partial"), None);

    buf.extend_from_slice(&frame[split..]);
    assert_eq!(
        codec.decode(&mut buf).expect("complete"),
        Some("caf\u{e9} \u{2600}".to_owned())
    );
}
