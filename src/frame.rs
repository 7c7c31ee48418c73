//! Event-stream frame codec.
//!
//! One frame on the wire is a block of text terminated by a blank line and
//! carrying a `data:` line whose payload is a JSON-encoded
//! [`ProgressUpdate`]:
//!
//! ```text
//! data: {"jobId":"job-1","messages":["..."],"timestamp":"..."}\n\n
//! ```
//!
//! The decoder works on raw bytes so that a fragment boundary falling inside
//! a multi-byte UTF-8 sequence never corrupts a payload: bytes are only
//! validated as UTF-8 once the whole frame has arrived.
//!
//! # Usage
//!
//! The server feeds [`OutboundFrame`]s through [`FrameCodec`]'s
//! [`Encoder`]; the client's [`FrameReassembler`] drives the [`Decoder`]
//! over a per-session buffer.
//!
//! [`FrameReassembler`]: crate::client::reassembler::FrameReassembler

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::models::progress::ProgressUpdate;
use crate::{AppError, Result};

/// Maximum size of a single frame accepted by the decoder: 1 MiB.
///
/// Measured on the frame body, excluding its blank-line delimiter and after
/// CRLF normalization. A larger frame is rejected with
/// [`AppError::Protocol`] (`"frame too long"`) whether it arrives whole or
/// in pieces.
pub const MAX_FRAME_BYTES: usize = 1_048_576;

/// Blank-line frame terminator, after CRLF normalization.
const DELIMITER: &[u8] = b"\n\n";

/// Trailing bytes of an undelimited buffer that may still turn out to be
/// delimiter rather than frame body: `\n` then a `\r` awaiting its `\n`.
const PENDING_TAIL: usize = 2;

/// Prefix of a payload line inside a frame.
const DATA_PREFIX: &str = "data:";

/// Comment frame written while a job is idle to keep intermediaries from
/// closing the connection.
const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// A frame the server writes onto an open job response.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// A serialized progress update.
    Update(ProgressUpdate),
    /// A comment frame with no payload.
    KeepAlive,
}

/// Codec for blank-line delimited event-stream frames.
///
/// # Decoder
///
/// Yields the payload of each complete frame. Payload lines follow the
/// event-stream rule: every line starting with `data:` contributes, one
/// leading space or tab after the prefix is dropped, and several data lines
/// are joined with `\n`. Frames without a data line (comments, keep-alives)
/// are skipped. CRLF line endings are normalized to LF before scanning.
///
/// Bytes already scanned are never scanned again, so reassembling a frame
/// from many small fragments costs the same as decoding it whole.
///
/// # Encoder
///
/// Writes `data: <json>\n\n` for updates and a comment frame for
/// keep-alives. `serde_json` escapes newlines inside strings, so an encoded
/// payload never contains a blank line.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Set while dropping the tail of an oversized frame.
    discarding: bool,
    /// Length of the buffer prefix already CRLF-normalized.
    normalized: usize,
    /// Length of the buffer prefix already searched for a delimiter.
    scanned: usize,
}

impl FrameCodec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one frame into a standalone buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the update cannot be serialized.
    pub fn encode_to_bytes(&mut self, frame: OutboundFrame) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode(frame, &mut dst)?;
        Ok(dst.freeze())
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete frame's payload from `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete frame yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.normalize_tail(src);

        loop {
            let from = self.scanned.saturating_sub(DELIMITER.len() - 1);
            let Some(offset) = find_delimiter(&src[from..]) else {
                self.scanned = src.len();
                return self.check_overflow(src);
            };

            let end = from + offset;
            let frame = src.split_to(end);
            src.advance(DELIMITER.len());
            self.normalized = self.normalized.saturating_sub(end + DELIMITER.len());
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            check_frame_len(frame.len())?;

            if let Some(payload) = extract_payload(&frame)? {
                return Ok(Some(payload));
            }
        }
    }

    /// Decode whatever remains when the stream ends.
    ///
    /// A trailing frame that lacks its delimiter is still decoded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(payload) = self.decode(src)? {
            return Ok(Some(payload));
        }
        let discarding = std::mem::take(&mut self.discarding);
        self.normalized = 0;
        self.scanned = 0;
        if discarding || src.is_empty() {
            src.clear();
            return Ok(None);
        }
        let frame = src.split();
        check_frame_len(frame.len())?;
        extract_payload(&frame)
    }
}

impl Encoder<OutboundFrame> for FrameCodec {
    type Error = AppError;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<()> {
        match item {
            OutboundFrame::Update(update) => {
                let json = serde_json::to_string(&update)?;
                dst.reserve(DATA_PREFIX.len() + 1 + json.len() + DELIMITER.len());
                dst.put_slice(DATA_PREFIX.as_bytes());
                dst.put_u8(b' ');
                dst.put_slice(json.as_bytes());
                dst.put_slice(DELIMITER);
            }
            OutboundFrame::KeepAlive => dst.put_slice(KEEP_ALIVE_FRAME),
        }
        Ok(())
    }
}

impl FrameCodec {
    /// Normalize the bytes appended since the last call.
    ///
    /// Starts one byte early so a `\r` left at the end of the previous
    /// fragment pairs with a `\n` that opens this one.
    fn normalize_tail(&mut self, src: &mut BytesMut) {
        let from = self.normalized.min(src.len()).saturating_sub(1);
        normalize_line_endings(src, from);
        self.normalized = src.len();
        self.scanned = self.scanned.min(from);
    }

    /// Enforce [`MAX_FRAME_BYTES`] on a buffer with no complete frame.
    ///
    /// Only fires once the frame body is certain to exceed the limit, so a
    /// frame rejected here would also be rejected if it arrived whole.
    fn check_overflow(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if self.discarding {
            self.drop_prefix(src);
            return Ok(None);
        }
        if src.len() <= MAX_FRAME_BYTES + PENDING_TAIL {
            return Ok(None);
        }
        self.discarding = true;
        self.drop_prefix(src);
        Err(too_long())
    }

    /// Drop all but the bytes that may begin the next delimiter.
    fn drop_prefix(&mut self, src: &mut BytesMut) {
        let keep = src.len().min(PENDING_TAIL);
        src.advance(src.len() - keep);
        self.normalized = src.len();
        self.scanned = 0;
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_FRAME_BYTES {
        return Err(too_long());
    }
    Ok(())
}

fn too_long() -> AppError {
    AppError::Protocol(format!("frame too long: exceeded {MAX_FRAME_BYTES} bytes"))
}

/// Collapse every `\r\n` in `src[from..]` to `\n`, in place.
///
/// A lone trailing `\r` is left alone; it is resolved once the next
/// fragment shows whether a `\n` follows.
fn normalize_line_endings(src: &mut BytesMut, from: usize) {
    let len = src.len();
    let Some(first) = src[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|pos| from + pos)
    else {
        return;
    };
    let mut write = first;
    for read in first..len {
        let byte = src[read];
        if byte == b'\r' && read + 1 < len && src[read + 1] == b'\n' {
            continue;
        }
        src[write] = byte;
        write += 1;
    }
    src.truncate(write);
}

/// Offset of the first blank-line delimiter in `src`.
fn find_delimiter(src: &[u8]) -> Option<usize> {
    src.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

/// Join the payloads of one frame's `data:` lines.
///
/// Returns `Ok(None)` for frames that carry no data line.
fn extract_payload(frame: &[u8]) -> Result<Option<String>> {
    let text = std::str::from_utf8(frame)
        .map_err(|err| AppError::Protocol(format!("frame is not valid utf-8: {err}")))?;

    let mut payload: Option<String> = None;
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let value = rest.strip_prefix([' ', '\t']).unwrap_or(rest).trim_end();
        match payload.as_mut() {
            Some(joined) => {
                joined.push('\n');
                joined.push_str(value);
            }
            None => payload = Some(value.to_owned()),
        }
    }
    Ok(payload)
}
