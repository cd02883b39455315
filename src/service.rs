use tracing::info;

use crate::{AddressResolver, FrameSink, FrameSource, Location, LocioCode, LocioError, Protocol, Socket};

/// Synchronous request/reply with the master.
///
/// One request in flight at a time; `&mut self` on `request` is what keeps it
/// that way. No timeout unless one is set on the underlying socket.
pub struct MasterService<S = Socket> {
    channel: S,
}

impl MasterService<Socket> {
    pub fn connect(resolver: &impl AddressResolver, master: &Location) -> Result<Self, LocioError> {
        let mut socket = Socket::new(Protocol::Request)?;
        let url = resolver.connect_address(master, socket.protocol());
        info!(%url, "ready to use master service");
        socket.connect(&url)?;
        Ok(Self { channel: socket })
    }

    /// Socket access, e.g. to bound the reply wait with `set_recv_timeout`.
    pub fn socket_mut(&mut self) -> &mut Socket { &mut self.channel }

    pub fn close(&mut self) {
        self.channel.close();
    }
}

impl<S> MasterService<S> {
    pub fn with_channel(channel: S) -> Self {
        Self { channel }
    }
}

impl<S> MasterService<S>
where
    S: FrameSink<Error = LocioError> + FrameSource<Error = LocioError>,
{
    /// Send `message` and block for its reply, returned byte for byte.
    pub fn request(&mut self, message: &str) -> Result<String, LocioError> {
        self.channel.send_frame(message.as_bytes())?;
        if self.channel.recv_frame()?.is_none() {
            return Err(LocioError::new(LocioCode::Timeout).ctx("no reply from master"));
        }
        String::from_utf8(self.channel.last_frame().to_vec()).map_err(|e| LocioError::new(LocioCode::Decode).ctx(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every request with a canned reply, or never.
    struct Canned {
        reply: Option<Vec<u8>>,
        sent: Vec<Vec<u8>>,
        last: Vec<u8>,
    }

    impl FrameSink for Canned {
        type Error = LocioError;
        fn send_frame(&mut self, bytes: &[u8]) -> Result<usize, LocioError> {
            self.sent.push(bytes.to_vec());
            Ok(bytes.len())
        }
    }

    impl FrameSource for Canned {
        type Error = LocioError;
        fn recv_frame(&mut self) -> Result<Option<usize>, LocioError> {
            Ok(self.reply.clone().map(|r| {
                self.last = r;
                self.last.len()
            }))
        }
        fn last_frame(&self) -> &[u8] {
            &self.last
        }
    }

    #[test]
    fn request_returns_reply_unmodified() {
        let mut svc = MasterService::with_channel(Canned {
            reply: Some(b"{\"ok\":true, \"\xc3\xa9\"}".to_vec()),
            sent: Vec::new(),
            last: Vec::new(),
        });
        let reply = svc.request("{\"msg_type\":1}").unwrap();
        assert_eq!(reply.as_bytes(), b"{\"ok\":true, \"\xc3\xa9\"}");
        assert_eq!(svc.channel.sent, [b"{\"msg_type\":1}".to_vec()]);
    }

    #[test]
    fn missing_reply_is_timeout() {
        let mut svc = MasterService::with_channel(Canned { reply: None, sent: Vec::new(), last: Vec::new() });
        assert_eq!(svc.request("x").unwrap_err().code, LocioCode::Timeout);
    }

    #[test]
    fn invalid_utf8_reply_is_decode_error() {
        let mut svc =
            MasterService::with_channel(Canned { reply: Some(vec![0xff, 0xfe, 0xfd]), sent: Vec::new(), last: Vec::new() });
        assert_eq!(svc.request("x").unwrap_err().code, LocioCode::Decode);
    }
}
