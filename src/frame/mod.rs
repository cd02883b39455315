//! Length-prefixed framing for stream transports.
//!
//! Format: `<u32_le_len><frame_bytes...>`

use crate::{FrameSink, LocioError};

use std::io::Write;

/// Number of bytes used for the length prefix.
pub const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    /// Largest frame a peer may announce before the stream is considered corrupt.
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { max_frame_len: 1024 * 1024 }
    }
}

/// A writer that frames messages with a u32 length prefix.
#[derive(Debug)]
pub struct FramedWriter<W: Write> {
    inner: W,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W) -> Self { Self { inner } }

    /// Writes one frame.
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<(), LocioError> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| LocioError::frame_too_large(bytes.len(), u32::MAX as usize))?;

        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(bytes)?;
        Ok(())
    }
}

impl<W: Write> FrameSink for FramedWriter<W> {
    type Error = LocioError;
    fn send_frame(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.write_frame(bytes)?;
        Ok(bytes.len())
    }
}

/// Splits the next complete frame off the front of `buf`.
///
/// Returns `Ok(None)` while the prefix or the payload is still incomplete. An
/// announced length above `cfg.max_frame_len` is an error; the buffer is left
/// untouched so the caller decides whether to drop the stream.
pub fn take_frame(buf: &mut Vec<u8>, cfg: &FrameConfig) -> Result<Option<Vec<u8>>, LocioError> {
    if buf.len() < LEN_PREFIX {
        return Ok(None);
    }

    let mut prefix = [0u8; LEN_PREFIX];
    prefix.copy_from_slice(&buf[..LEN_PREFIX]);
    let len = u32::from_le_bytes(prefix) as usize;

    if len > cfg.max_frame_len {
        return Err(LocioError::frame_too_large(len, cfg.max_frame_len));
    }

    let end = LEN_PREFIX + len;
    if buf.len() < end {
        return Ok(None);
    }

    let frame = buf[LEN_PREFIX..end].to_vec();
    buf.drain(..end);
    Ok(Some(frame))
}

pub mod cbor;
pub mod postcard;
