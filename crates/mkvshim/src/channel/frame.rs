//! Message framing: raw payload bytes followed by a single NUL.

use crate::error::{Result, ShimError};

pub const TERMINATOR: u8 = 0;

/// Frame `payload` for one write call.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.contains(&TERMINATOR) {
        return Err(ShimError::InteriorNul);
    }
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.extend_from_slice(payload);
    buf.push(TERMINATOR);
    Ok(buf)
}

/// Incremental splitter for the consumer side of the stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and collect every message completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for &b in bytes {
            if b == TERMINATOR {
                out.push(std::mem::take(&mut self.pending));
            } else {
                self.pending.push(b);
            }
        }
        out
    }

    /// Bytes received after the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}
