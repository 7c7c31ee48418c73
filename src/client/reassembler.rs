//! Per-session reassembly of progress updates from unaligned fragments.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::frame::FrameCodec;
use crate::models::progress::ProgressUpdate;

/// Turns arbitrary body fragments into decoded [`ProgressUpdate`]s.
///
/// Fragments are appended to a byte buffer and drained through
/// [`FrameCodec`]; each complete frame's payload is decoded as JSON. A
/// payload that fails to decode is logged and dropped, and decoding
/// continues with the next frame. Once a terminal update is produced the
/// buffer is cleared and every later fragment is ignored.
///
/// Splitting the same bytes into any number of fragments yields the same
/// updates in the same order.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buffer: BytesMut,
    codec: FrameCodec,
    finished: bool,
}

impl FrameReassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fragment` and return every update it completes, in order.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<ProgressUpdate> {
        if self.finished {
            debug!(bytes = fragment.len(), "ignoring fragment after terminal update");
            return Vec::new();
        }
        self.buffer.extend_from_slice(fragment);

        let mut updates = Vec::new();
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(payload)) => {
                    if self.collect(&payload, &mut updates) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => warn!(%err, "dropping undecodable frame"),
            }
        }
        updates
    }

    /// Decode one already-framed payload, as delivered by a native
    /// event-stream client.
    pub fn accept_payload(&mut self, payload: &str) -> Option<ProgressUpdate> {
        if self.finished {
            debug!("ignoring payload after terminal update");
            return None;
        }
        let mut updates = Vec::with_capacity(1);
        self.collect(payload, &mut updates);
        updates.pop()
    }

    /// Flush whatever remains buffered once the body has ended.
    ///
    /// A trailing frame missing its final blank line is still decoded.
    pub fn finish(&mut self) -> Vec<ProgressUpdate> {
        let mut updates = Vec::new();
        while !self.finished {
            match self.codec.decode_eof(&mut self.buffer) {
                Ok(Some(payload)) => {
                    self.collect(&payload, &mut updates);
                }
                Ok(None) => break,
                Err(err) => warn!(%err, "dropping undecodable trailing frame"),
            }
        }
        self.buffer.clear();
        self.codec = FrameCodec::new();
        updates
    }

    /// Whether a terminal update has been produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode `payload` into `updates`. Returns `true` if it was terminal.
    fn collect(&mut self, payload: &str, updates: &mut Vec<ProgressUpdate>) -> bool {
        match serde_json::from_str::<ProgressUpdate>(payload) {
            Ok(update) => {
                let terminal = update.is_terminal();
                updates.push(update);
                if terminal {
                    self.finished = true;
                    self.buffer.clear();
                    self.codec = FrameCodec::new();
                }
                terminal
            }
            Err(err) => {
                warn!(%err, payload_len = payload.len(), "dropping malformed progress update");
                false
            }
        }
    }
}
