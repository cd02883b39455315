use std::borrow::Cow;
use std::time::Duration;

use tracing::debug;

use crate::{AddressResolver, FrameSource, Location, LocioError, Protocol, Socket};

/// Frames this short carry no content (empty or a bare `{}`).
pub const MIN_NOTICE_LEN: usize = 2;

/// Receive timeout for an observer: a non-blocking poll in low-latency mode,
/// otherwise `notice_timeout` to avoid spinning.
pub fn select_timeout(low_latency: bool, notice_timeout: Duration) -> Duration {
    if low_latency { Duration::ZERO } else { notice_timeout }
}

/// Subscriber on the master's broadcast channel.
pub struct Observer<S = Socket> {
    source: S,
    timeout: Duration,
}

impl Observer<Socket> {
    pub fn connect(
        resolver: &impl AddressResolver,
        master: &Location,
        low_latency: bool,
        notice_timeout: Duration,
    ) -> Result<Self, LocioError> {
        let timeout = select_timeout(low_latency, notice_timeout);
        let mut socket = Socket::new(Protocol::Subscribe)?;
        let url = resolver.connect_address(master, socket.protocol());
        socket.connect(&url)?;
        socket.set_recv_timeout(Some(timeout));
        socket.subscribe("")?;
        debug!(timeout_ms = timeout.as_millis() as u64, %url, "observing master channel");
        Ok(Self { source: socket, timeout })
    }

    pub fn close(&mut self) {
        debug!("master observer closing");
        self.source.close();
    }
}

impl<S> Observer<S> {
    pub fn with_source(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn timeout(&self) -> Duration { self.timeout }
}

impl<S: FrameSource<Error = LocioError>> Observer<S> {
    /// Wait up to the configured timeout for a notice with content.
    ///
    /// `false` means nothing new: either the wait expired or the frame was
    /// content-free. Only transport failures are errors.
    pub fn wait(&mut self) -> Result<bool, LocioError> {
        Ok(matches!(self.source.recv_frame()?, Some(len) if len > MIN_NOTICE_LEN))
    }

    /// Content of the last frame. Meaningful after `wait` returned `true`.
    pub fn notice(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.source.last_frame())
    }
}
