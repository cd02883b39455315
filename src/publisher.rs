//! "New data available" signals sent to the master.
//!
//! Callers see one type with two operations; whether a real connection sits
//! behind it is decided once, when the owning device is built.

use tracing::debug;

use crate::{AddressResolver, FrameSink, Location, LocioCode, LocioError, Protocol, Socket};

/// Content-free notice: "something changed, look again".
pub const HEARTBEAT: &str = "{}";

pub enum Publisher<S = Socket> {
    Active(ActivePublisher<S>),
    /// Stand-in for processes with no coordinator connection.
    Noop,
}

impl<S: FrameSink<Error = LocioError>> Publisher<S> {
    pub fn is_active(&self) -> bool {
        matches!(self, Publisher::Active(_))
    }

    /// Heartbeat. Always succeeds on the noop variant.
    pub fn notify(&mut self) -> Result<(), LocioError> {
        match self {
            Publisher::Active(p) => p.notify(),
            Publisher::Noop => Ok(()),
        }
    }

    /// Send `message` verbatim. The noop variant refuses: real content must
    /// never vanish into a publisher that has no master behind it.
    pub fn publish(&mut self, message: &str) -> Result<(), LocioError> {
        match self {
            Publisher::Active(p) => p.publish(message),
            Publisher::Noop => Err(LocioError::new(LocioCode::NoopPublish).ctx(message)),
        }
    }
}

/// PUSH connection to the master's notice intake.
pub struct ActivePublisher<S = Socket> {
    sink: S,
    low_latency: bool,
}

impl ActivePublisher<Socket> {
    pub fn connect(resolver: &impl AddressResolver, master: &Location, low_latency: bool) -> Result<Self, LocioError> {
        let mut socket = Socket::new(Protocol::Push)?;
        let url = resolver.connect_address(master, socket.protocol());
        socket.connect(&url)?;
        debug!(%url, "ready to publish and notify to master");
        Ok(Self::with_sink(socket, low_latency))
    }

    /// Release the connection. Idempotent.
    pub fn close(&mut self) {
        if self.sink.is_closed() {
            return;
        }
        debug!("master publisher closing");
        self.sink.close();
        debug!("master publisher closed");
    }
}

impl Publisher<Socket> {
    /// Close the active connection, if any, and fall back to the noop variant.
    pub fn close(&mut self) {
        if let Publisher::Active(p) = self {
            p.close();
        }
        *self = Publisher::Noop;
    }
}

impl<S> ActivePublisher<S> {
    pub fn with_sink(sink: S, low_latency: bool) -> Self {
        Self { sink, low_latency }
    }

    pub fn sink(&self) -> &S { &self.sink }
    pub fn is_low_latency(&self) -> bool { self.low_latency }
}

impl<S: FrameSink<Error = LocioError>> ActivePublisher<S> {
    /// In low-latency mode consumers poll instead, so the heartbeat is skipped.
    pub fn notify(&mut self) -> Result<(), LocioError> {
        if self.low_latency {
            return Ok(());
        }
        self.publish(HEARTBEAT)
    }

    /// Not retried; a failed send is the caller's to handle.
    pub fn publish(&mut self, message: &str) -> Result<(), LocioError> {
        self.sink.send_frame(message.as_bytes()).map(|_| ())
    }
}
