//! Message sockets over Unix Domain Sockets.
//!
//! A [`Socket`] plays exactly one [`Protocol`] role and owns exactly one
//! endpoint, either bound (listening, any number of peers) or connected (one
//! peer). Frames use the length prefix from [`crate::frame`]. Readiness comes
//! from one edge-triggered [`mio::Poll`] per socket, so every peer keeps a
//! `readable` flag that stays set until a read hits `WouldBlock`.

use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::net;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mio::net::{UnixListener, UnixStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, trace, warn};

use crate::frame::{self, FrameConfig, FramedWriter};
use crate::url::ipc_path;
use crate::{FrameSink, FrameSource, LocioCode, LocioError, Protocol};

/// Token of the listener
const LISTENER: Token = Token(0);

/// Bytes pulled from a stream per read call
const READ_CHUNK: usize = 4096;

const EVENT_CAPACITY: usize = 64;

struct Peer {
    token: Token,
    stream: UnixStream,
    /// Bytes received but not yet split into frames
    rx: Vec<u8>,
    /// Unsent tail of a broadcast frame the peer could not take at once
    tx: Vec<u8>,
    readable: bool,
    hung_up: bool,
}

impl Peer {
    fn new(token: Token, stream: UnixStream) -> Self {
        // Data may already be queued before registration.
        Self { token, stream, rx: Vec::new(), tx: Vec::new(), readable: true, hung_up: false }
    }

    /// Drain the stream into `rx` until it would block.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.hung_up = true;
                    self.readable = false;
                    return Ok(());
                }
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.readable = false;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Write as much of `buf` as the stream takes without blocking.
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            match self.stream.write(&buf[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    /// Hand `frame` to the peer without ever waiting for it.
    ///
    /// Returns `false` when the frame was skipped because the peer is full. A
    /// frame is either skipped whole or started; a started frame's tail is
    /// finished before anything else goes out, so the stream stays aligned.
    fn offer(&mut self, frame: &[u8]) -> io::Result<bool> {
        if !self.tx.is_empty() {
            let pending = std::mem::take(&mut self.tx);
            let n = self.write_some(&pending)?;
            self.tx = pending;
            self.tx.drain(..n);
            if !self.tx.is_empty() {
                return Ok(false);
            }
        }

        let n = self.write_some(frame)?;
        if n == 0 {
            return Ok(false);
        }
        self.tx.extend_from_slice(&frame[n..]);
        Ok(true)
    }
}

pub struct Socket {
    protocol: Protocol,
    url: Option<String>,
    /// Socket file to unlink on close, set only for bound sockets
    bound_path: Option<PathBuf>,
    poll: Poll,
    events: Events,
    listener: Option<UnixListener>,
    peers: Vec<Peer>,
    next_token: usize,
    /// Round-robin position for sending and fair-queued receiving
    cursor: usize,
    frame_cfg: FrameConfig,
    recv_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    subscriptions: Vec<Vec<u8>>,
    /// Peer owed a reply (REP)
    reply_to: Option<Token>,
    /// A request is out and its reply not yet received (REQ)
    awaiting_reply: bool,
    last_message: Vec<u8>,
    send_buf: Vec<u8>,
    closed: bool,
}

impl Socket {
    pub fn new(protocol: Protocol) -> Result<Self, LocioError> {
        Ok(Self {
            protocol,
            url: None,
            bound_path: None,
            poll: Poll::new()?,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener: None,
            peers: Vec::new(),
            next_token: LISTENER.0,
            cursor: 0,
            frame_cfg: FrameConfig::default(),
            recv_timeout: None,
            send_timeout: None,
            subscriptions: Vec::new(),
            reply_to: None,
            awaiting_reply: false,
            last_message: Vec::new(),
            send_buf: Vec::new(),
            closed: false,
        })
    }

    pub fn protocol(&self) -> Protocol { self.protocol }
    pub fn url(&self) -> Option<&str> { self.url.as_deref() }
    pub fn is_closed(&self) -> bool { self.closed }
    pub fn is_bound(&self) -> bool { self.listener.is_some() }
    pub fn peer_count(&self) -> usize { self.peers.len() }

    pub fn recv_timeout(&self) -> Option<Duration> { self.recv_timeout }

    /// `None` blocks until a frame arrives, `Some(Duration::ZERO)` polls once.
    pub fn set_recv_timeout(&mut self, timeout: Option<Duration>) {
        self.recv_timeout = timeout;
    }

    pub fn send_timeout(&self) -> Option<Duration> { self.send_timeout }

    /// Bound on waiting for a peer to drain its receive buffer.
    pub fn set_send_timeout(&mut self, timeout: Option<Duration>) {
        self.send_timeout = timeout;
    }

    pub fn set_frame_config(&mut self, cfg: FrameConfig) {
        self.frame_cfg = cfg;
    }

    /// Deliver frames starting with `prefix`. An empty prefix matches everything.
    pub fn subscribe(&mut self, prefix: &str) -> Result<(), LocioError> {
        if self.protocol != Protocol::Subscribe {
            return Err(LocioError::unsupported("subscribe", self.protocol));
        }
        self.subscriptions.push(prefix.as_bytes().to_vec());
        Ok(())
    }

    pub fn unsubscribe(&mut self, prefix: &str) -> Result<(), LocioError> {
        if self.protocol != Protocol::Subscribe {
            return Err(LocioError::unsupported("unsubscribe", self.protocol));
        }
        if let Some(pos) = self.subscriptions.iter().position(|s| s == prefix.as_bytes()) {
            self.subscriptions.remove(pos);
        }
        Ok(())
    }

    pub fn connect(&mut self, url: &str) -> Result<(), LocioError> {
        self.ensure_unattached()?;
        let path = ipc_path(url).ok_or_else(|| LocioError::invalid_url(url))?;

        let stream = net::UnixStream::connect(path).map_err(|e| LocioError::connect(url, e))?;
        stream.set_nonblocking(true)?;
        self.add_peer(UnixStream::from_std(stream))?;
        self.url = Some(url.to_owned());
        trace!(protocol = %self.protocol, %url, "connected");
        Ok(())
    }

    pub fn bind(&mut self, url: &str) -> Result<(), LocioError> {
        self.ensure_unattached()?;
        let path = ipc_path(url).ok_or_else(|| LocioError::invalid_url(url))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| LocioError::bind(url, e))?;
        }
        if path.exists() {
            if net::UnixStream::connect(path).is_ok() {
                return Err(LocioError::bind(url, io::ErrorKind::AddrInUse.into()));
            }
            warn!(%url, "removing stale socket file");
            fs::remove_file(path).map_err(|e| LocioError::bind(url, e))?;
        }

        let listener = net::UnixListener::bind(path).map_err(|e| LocioError::bind(url, e))?;
        listener.set_nonblocking(true)?;
        let mut listener = UnixListener::from_std(listener);
        self.poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;

        self.listener = Some(listener);
        self.bound_path = Some(path.to_path_buf());
        self.url = Some(url.to_owned());
        trace!(protocol = %self.protocol, %url, "bound");
        Ok(())
    }

    pub fn send(&mut self, message: &str) -> Result<usize, LocioError> {
        self.send_bytes(message.as_bytes())
    }

    /// Send one frame according to the socket's protocol. Returns the payload length.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, LocioError> {
        self.ensure_open()?;
        if !self.protocol.can_send() {
            return Err(LocioError::unsupported("send", self.protocol));
        }
        self.accept_pending()?;

        let mut frame = std::mem::take(&mut self.send_buf);
        frame.clear();
        let encoded = FramedWriter::new(&mut frame).write_frame(bytes);
        let result = encoded.and_then(|()| self.route(&frame));
        self.send_buf = frame;
        result.map(|()| bytes.len())
    }

    /// Wait for the next frame, honouring the receive timeout.
    ///
    /// Returns `Ok(None)` when the timeout expires; that is not an error.
    pub fn recv(&mut self) -> Result<Option<usize>, LocioError> {
        self.ensure_open()?;
        if !self.protocol.can_recv() {
            return Err(LocioError::unsupported("recv", self.protocol));
        }
        if self.protocol == Protocol::Request && !self.awaiting_reply {
            return Err(LocioError::new(LocioCode::State).ctx("recv before request was sent"));
        }

        let deadline = self.recv_timeout.map(|t| Instant::now() + t);
        let mut polled = false;
        loop {
            self.accept_pending()?;
            if let Some((token, frame)) = self.take_frame()? {
                if self.protocol == Protocol::Subscribe && !self.matches_subscription(&frame) {
                    continue;
                }
                match self.protocol {
                    Protocol::Reply => self.reply_to = Some(token),
                    Protocol::Request => self.awaiting_reply = false,
                    _ => {}
                }
                let len = frame.len();
                self.last_message = frame;
                return Ok(Some(len));
            }

            let wait = match deadline {
                None => None,
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if polled && left.is_zero() {
                        return Ok(None);
                    }
                    Some(left)
                }
            };
            self.poll_once(wait)?;
            polled = true;
        }
    }

    /// Receive one frame as text. `Ok(None)` on timeout.
    pub fn recv_string(&mut self) -> Result<Option<String>, LocioError> {
        match self.recv()? {
            Some(_) => self.last_message_str().map(|s| Some(s.to_owned())),
            None => Ok(None),
        }
    }

    pub fn last_message(&self) -> &[u8] { &self.last_message }

    pub fn last_message_str(&self) -> Result<&str, LocioError> {
        std::str::from_utf8(&self.last_message).map_err(|e| LocioError::new(LocioCode::Decode).ctx(e))
    }

    /// Release every descriptor and unlink the bound socket file. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let registry = self.poll.registry();
        for mut peer in self.peers.drain(..) {
            let _ = registry.deregister(&mut peer.stream);
        }
        if let Some(mut listener) = self.listener.take() {
            let _ = registry.deregister(&mut listener);
        }
        if let Some(path) = self.bound_path.take()
            && let Err(e) = fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "failed to remove socket file");
        }
        trace!(protocol = %self.protocol, url = ?self.url, "closed");
    }

    fn ensure_open(&self) -> Result<(), LocioError> {
        if self.closed {
            return Err(LocioError::new(LocioCode::Closed).ctx(self.protocol));
        }
        Ok(())
    }

    fn ensure_unattached(&self) -> Result<(), LocioError> {
        self.ensure_open()?;
        match &self.url {
            Some(url) => Err(LocioError::new(LocioCode::State).ctx(format_args!("socket already attached to {url}"))),
            None => Ok(()),
        }
    }

    fn add_peer(&mut self, mut stream: UnixStream) -> Result<(), LocioError> {
        self.next_token += 1;
        let token = Token(self.next_token);
        self.poll.registry().register(&mut stream, token, Interest::READABLE)?;
        self.peers.push(Peer::new(token, stream));
        Ok(())
    }

    fn accept_pending(&mut self) -> Result<(), LocioError> {
        let Some(listener) = self.listener.as_ref() else {
            return Ok(());
        };

        let mut accepted = Vec::new();
        loop {
            match listener.accept() {
                Ok((stream, _)) => accepted.push(stream),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(LocioError::io(e)),
            }
        }
        for stream in accepted {
            self.add_peer(stream)?;
            trace!(protocol = %self.protocol, peers = self.peers.len(), "accepted peer");
        }
        Ok(())
    }

    fn route(&mut self, frame: &[u8]) -> Result<(), LocioError> {
        match self.protocol {
            Protocol::Push => {
                let idx = self.pick_peer()?;
                self.write_or_drop(idx, frame)
            }
            Protocol::Request => {
                if self.awaiting_reply {
                    return Err(LocioError::new(LocioCode::State).ctx("previous request still awaiting reply"));
                }
                let idx = self.pick_peer()?;
                self.write_or_drop(idx, frame)?;
                self.awaiting_reply = true;
                Ok(())
            }
            Protocol::Publish => {
                for idx in (0..self.peers.len()).rev() {
                    match self.peers[idx].offer(frame) {
                        Ok(true) => {}
                        Ok(false) => trace!(token = ?self.peers[idx].token, "subscriber full, frame dropped"),
                        Err(e) => {
                            debug!(error = %e, "dropping subscriber");
                            self.drop_peer(idx);
                        }
                    }
                }
                Ok(())
            }
            Protocol::Reply => {
                let token = self
                    .reply_to
                    .take()
                    .ok_or_else(|| LocioError::new(LocioCode::State).ctx("reply without pending request"))?;
                match self.peers.iter().position(|p| p.token == token) {
                    Some(idx) => self.write_or_drop(idx, frame),
                    None => {
                        debug!("requester gone, reply dropped");
                        Ok(())
                    }
                }
            }
            Protocol::Pull | Protocol::Subscribe => Err(LocioError::unsupported("send", self.protocol)),
        }
    }

    fn pick_peer(&mut self) -> Result<usize, LocioError> {
        if self.peers.is_empty() {
            return Err(self.no_peer());
        }
        let idx = self.cursor % self.peers.len();
        self.cursor = idx + 1;
        Ok(idx)
    }

    fn no_peer(&self) -> LocioError {
        let url = self.url.as_deref().unwrap_or("<unattached>");
        if self.listener.is_some() {
            LocioError::new(LocioCode::Send).ctx(format_args!("no peer connected to {url}"))
        } else {
            LocioError::new(LocioCode::Disconnected).ctx(url)
        }
    }

    fn write_or_drop(&mut self, idx: usize, frame: &[u8]) -> Result<(), LocioError> {
        self.write_to(idx, frame).inspect_err(|_| self.drop_peer(idx))
    }

    fn write_to(&mut self, idx: usize, frame: &[u8]) -> Result<(), LocioError> {
        let mut written = 0;
        while written < frame.len() {
            match self.peers[idx].stream.write(&frame[written..]) {
                Ok(0) => return Err(LocioError::send(io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.await_writable(idx)?,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(LocioError::send(e)),
            }
        }
        Ok(())
    }

    /// Block until peer `idx` accepts more bytes or the send timeout expires.
    fn await_writable(&mut self, idx: usize) -> Result<(), LocioError> {
        let token = self.peers[idx].token;
        self.poll
            .registry()
            .reregister(&mut self.peers[idx].stream, token, Interest::READABLE | Interest::WRITABLE)?;

        let deadline = self.send_timeout.map(|t| Instant::now() + t);
        let outcome = loop {
            let wait = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if wait.is_some_and(|w| w.is_zero()) {
                break Err(LocioError::new(LocioCode::Timeout).ctx("peer not draining"));
            }
            match self.poll.poll(&mut self.events, wait) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(LocioError::io(e)),
            }
            if self.events.iter().any(|e| e.token() == token && e.is_writable()) {
                break Ok(());
            }
        };

        self.poll.registry().reregister(&mut self.peers[idx].stream, token, Interest::READABLE)?;
        // Readable events consumed above are lost; rescan everyone.
        for peer in &mut self.peers {
            peer.readable = true;
        }
        outcome
    }

    fn drop_peer(&mut self, idx: usize) {
        let mut peer = self.peers.remove(idx);
        let _ = self.poll.registry().deregister(&mut peer.stream);
    }

    /// Next complete frame from any peer, fair-queued.
    fn take_frame(&mut self) -> Result<Option<(Token, Vec<u8>)>, LocioError> {
        for peer in self.peers.iter_mut().filter(|p| p.readable && !p.hung_up) {
            if let Err(e) = peer.fill() {
                debug!(error = %e, "peer read failed");
                peer.hung_up = true;
            }
        }

        let cfg = self.frame_cfg;
        let count = self.peers.len();
        for step in 0..count {
            let idx = (self.cursor + step) % count;
            let peer = &mut self.peers[idx];
            match frame::take_frame(&mut peer.rx, &cfg) {
                Ok(Some(frame)) => {
                    let token = peer.token;
                    self.cursor = idx + 1;
                    return Ok(Some((token, frame)));
                }
                Ok(None) => {}
                Err(e) => {
                    // The stream is out of sync; nothing after this prefix can be trusted.
                    peer.rx.clear();
                    peer.hung_up = true;
                    return Err(e);
                }
            }
        }

        self.reap_hung_up()?;
        Ok(None)
    }

    /// Forget peers that hung up and have no complete frame left.
    fn reap_hung_up(&mut self) -> Result<(), LocioError> {
        let before = self.peers.len();
        let registry = self.poll.registry();
        self.peers.retain_mut(|peer| {
            if peer.hung_up {
                let _ = registry.deregister(&mut peer.stream);
                false
            } else {
                true
            }
        });

        if self.peers.len() < before {
            debug!(protocol = %self.protocol, url = ?self.url, gone = before - self.peers.len(), "peer hung up");
        }
        if self.listener.is_none() && self.peers.is_empty() {
            return Err(self.no_peer());
        }
        Ok(())
    }

    fn poll_once(&mut self, timeout: Option<Duration>) -> Result<(), LocioError> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(LocioError::io(e)),
        }
        for event in self.events.iter() {
            let token = event.token();
            if token == LISTENER {
                continue;
            }
            if let Some(peer) = self.peers.iter_mut().find(|p| p.token == token) {
                peer.readable = true;
            }
        }
        Ok(())
    }

    fn matches_subscription(&self, frame: &[u8]) -> bool {
        self.subscriptions.iter().any(|prefix| frame.starts_with(prefix))
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

impl FrameSink for Socket {
    type Error = LocioError;
    fn send_frame(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.send_bytes(bytes)
    }
}

impl FrameSource for Socket {
    type Error = LocioError;
    fn recv_frame(&mut self) -> Result<Option<usize>, Self::Error> {
        self.recv()
    }
    fn last_frame(&self) -> &[u8] {
        &self.last_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const WAIT: Option<Duration> = Some(Duration::from_secs(2));

    fn url(dir: &tempfile::TempDir, name: &str) -> String {
        format!("ipc://{}/{name}", dir.path().display())
    }

    fn pair(bind_as: Protocol, url: &str) -> (Socket, Socket) {
        let mut binder = Socket::new(bind_as).unwrap();
        binder.bind(url).unwrap();
        let mut connector = Socket::new(bind_as.opposite()).unwrap();
        connector.connect(url).unwrap();
        binder.set_recv_timeout(WAIT);
        connector.set_recv_timeout(WAIT);
        (binder, connector)
    }

    #[test]
    fn push_to_bound_pull() {
        let dir = tempdir().unwrap();
        let (mut pull, mut push) = pair(Protocol::Pull, &url(&dir, "p.pull"));

        assert_eq!(push.send("first").unwrap(), 5);
        push.send("second").unwrap();

        assert_eq!(pull.recv_string().unwrap().as_deref(), Some("first"));
        assert_eq!(pull.recv_string().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn pull_fair_queues_many_pushers() {
        let dir = tempdir().unwrap();
        let addr = url(&dir, "fan.pull");
        let mut pull = Socket::new(Protocol::Pull).unwrap();
        pull.bind(&addr).unwrap();
        pull.set_recv_timeout(WAIT);

        let mut pushers: Vec<Socket> = (0..3)
            .map(|_| {
                let mut s = Socket::new(Protocol::Push).unwrap();
                s.connect(&addr).unwrap();
                s
            })
            .collect();
        for (i, p) in pushers.iter_mut().enumerate() {
            p.send(&format!("from-{i}")).unwrap();
        }

        let mut got: Vec<String> = (0..3).map(|_| pull.recv_string().unwrap().unwrap()).collect();
        got.sort();
        assert_eq!(got, ["from-0", "from-1", "from-2"]);
    }

    #[test]
    fn recv_times_out_without_error() {
        let dir = tempdir().unwrap();
        let (mut pull, _push) = pair(Protocol::Pull, &url(&dir, "idle.pull"));

        pull.set_recv_timeout(Some(Duration::ZERO));
        assert_eq!(pull.recv().unwrap(), None);

        pull.set_recv_timeout(Some(Duration::from_millis(30)));
        let started = Instant::now();
        assert_eq!(pull.recv().unwrap(), None);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn subscriber_filters_by_prefix() {
        let dir = tempdir().unwrap();
        let (mut publisher, mut sub) = pair(Protocol::Publish, &url(&dir, "topic.pub"));
        sub.subscribe("md.").unwrap();

        publisher.send("td.order").unwrap();
        publisher.send("md.tick").unwrap();

        assert_eq!(sub.recv_string().unwrap().as_deref(), Some("md.tick"));
    }

    #[test]
    fn subscriber_without_subscription_receives_nothing() {
        let dir = tempdir().unwrap();
        let (mut publisher, mut sub) = pair(Protocol::Publish, &url(&dir, "none.pub"));
        sub.set_recv_timeout(Some(Duration::from_millis(50)));

        publisher.send("anything").unwrap();
        assert_eq!(sub.recv().unwrap(), None);
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let dir = tempdir().unwrap();
        let mut publisher = Socket::new(Protocol::Publish).unwrap();
        publisher.bind(&url(&dir, "empty.pub")).unwrap();
        assert_eq!(publisher.send("lost").unwrap(), 4);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let dir = tempdir().unwrap();
        let (mut publisher, mut sub) = pair(Protocol::Publish, &url(&dir, "unsub.pub"));
        sub.subscribe("").unwrap();
        sub.unsubscribe("").unwrap();
        sub.set_recv_timeout(Some(Duration::from_millis(50)));

        publisher.send("after unsubscribe").unwrap();
        assert_eq!(sub.recv().unwrap(), None);
    }

    #[test]
    fn idle_subscriber_never_blocks_publisher() {
        let dir = tempdir().unwrap();
        let (mut publisher, mut idle) = pair(Protocol::Publish, &url(&dir, "slow.pub"));
        idle.subscribe("").unwrap();
        let payload = vec![b'n'; 64 * 1024];

        let started = Instant::now();
        for _ in 0..200 {
            assert_eq!(publisher.send_bytes(&payload).unwrap(), payload.len());
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(publisher.peer_count(), 1);

        // Skipped frames leave no torn ones behind.
        idle.set_recv_timeout(Some(Duration::from_millis(200)));
        let mut received = 0;
        while let Some(len) = idle.recv().unwrap() {
            assert_eq!(len, payload.len());
            received += 1;
        }
        assert!(received > 0 && received < 200);
    }

    #[test]
    fn blocked_push_times_out() {
        let dir = tempdir().unwrap();
        let (_pull, mut push) = pair(Protocol::Pull, &url(&dir, "full.pull"));
        push.set_send_timeout(Some(Duration::from_millis(50)));
        let chunk = vec![0u8; 64 * 1024];

        let err = (0..1000).find_map(|_| push.send_bytes(&chunk).err()).unwrap();
        assert_eq!(err.code, LocioCode::Timeout);
    }

    #[test]
    fn request_reply_sequence() {
        let dir = tempdir().unwrap();
        let (mut rep, mut req) = pair(Protocol::Reply, &url(&dir, "svc.rep"));

        req.send("ping").unwrap();
        assert!(req.send("again").is_err_and(|e| e.code == LocioCode::State));

        assert_eq!(rep.recv_string().unwrap().as_deref(), Some("ping"));
        rep.send("pong").unwrap();
        assert!(rep.send("extra").is_err_and(|e| e.code == LocioCode::State));

        assert_eq!(req.recv_string().unwrap().as_deref(), Some("pong"));
    }

    #[test]
    fn wrong_direction_is_unsupported() {
        let dir = tempdir().unwrap();
        let (mut pull, mut push) = pair(Protocol::Pull, &url(&dir, "dir.pull"));

        assert_eq!(pull.send("x").unwrap_err().code, LocioCode::Unsupported);
        assert_eq!(push.recv().unwrap_err().code, LocioCode::Unsupported);
        assert_eq!(push.subscribe("").unwrap_err().code, LocioCode::Unsupported);
    }

    #[test]
    fn connect_without_binder_fails() {
        let dir = tempdir().unwrap();
        let mut push = Socket::new(Protocol::Push).unwrap();
        let err = push.connect(&url(&dir, "nobody.pull")).unwrap_err();
        assert_eq!(err.code, LocioCode::Connect);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let mut push = Socket::new(Protocol::Push).unwrap();
        assert_eq!(push.connect("tcp://localhost:1").unwrap_err().code, LocioCode::InvalidUrl);
    }

    #[test]
    fn bind_refuses_live_address_and_replaces_stale_one() {
        let dir = tempdir().unwrap();
        let addr = url(&dir, "nested/dir/x.pub");

        let mut first = Socket::new(Protocol::Publish).unwrap();
        first.bind(&addr).unwrap();

        let mut second = Socket::new(Protocol::Publish).unwrap();
        assert_eq!(second.bind(&addr).unwrap_err().code, LocioCode::Bind);

        // A leftover file nobody listens on
        let path = dir.path().join("stale.pub");
        drop(net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());
        let mut third = Socket::new(Protocol::Publish).unwrap();
        third.bind(&url(&dir, "stale.pub")).unwrap();
    }

    #[test]
    fn close_unlinks_bound_file_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.pull");
        let mut pull = Socket::new(Protocol::Pull).unwrap();
        pull.bind(&url(&dir, "gone.pull")).unwrap();
        assert!(path.exists());

        pull.close();
        pull.close();
        assert!(!path.exists());
        assert_eq!(pull.recv().unwrap_err().code, LocioCode::Closed);
    }

    #[test]
    fn connector_reports_lost_binder() {
        let dir = tempdir().unwrap();
        let (rep, mut req) = pair(Protocol::Reply, &url(&dir, "lost.rep"));
        req.send("hello").unwrap();
        drop(rep);

        assert_eq!(req.recv().unwrap_err().code, LocioCode::Disconnected);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let dir = tempdir().unwrap();
        let (mut pull, mut push) = pair(Protocol::Pull, &url(&dir, "big.pull"));
        pull.set_frame_config(FrameConfig { max_frame_len: 8 });

        push.send("far more than eight bytes").unwrap();
        assert_eq!(pull.recv().unwrap_err().code, LocioCode::FrameTooLarge);
    }

    #[test]
    fn large_frame_survives_partial_writes() {
        let dir = tempdir().unwrap();
        let (mut pull, mut push) = pair(Protocol::Pull, &url(&dir, "bulk.pull"));
        let payload = "x".repeat(512 * 1024);

        let reader = std::thread::spawn(move || {
            let len = pull.recv().unwrap();
            (len, pull.last_message().len())
        });
        push.send(&payload).unwrap();

        let (len, stored) = reader.join().unwrap();
        assert_eq!(len, Some(payload.len()));
        assert_eq!(stored, payload.len());
    }
}
