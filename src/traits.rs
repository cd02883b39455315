/// Anything that can carry one frame to its peer(s).
pub trait FrameSink {
    type Error;
    fn send_frame(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;
}

/// Anything that yields frames one at a time.
///
/// `recv_frame` returns `Ok(None)` when its wait expired without a frame.
/// The last received frame stays readable through `last_frame`.
pub trait FrameSource {
    type Error;
    fn recv_frame(&mut self) -> Result<Option<usize>, Self::Error>;
    fn last_frame(&self) -> &[u8];
}
