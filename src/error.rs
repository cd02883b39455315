use std::{fmt, io};

use liaise::{Liaise, RegisterErrors};

#[derive(RegisterErrors, Debug, Copy, Clone, PartialEq, Eq)]
#[error_prefix = "LOCIO"] // Sets the reporting prefix
pub enum LocioCode {
    Io = 1,
    FrameTooLarge = 2,
    InvalidUrl = 3,
    Connect = 4,
    Bind = 5,
    Send = 6,
    Timeout = 7,
    Disconnected = 8,
    Unsupported = 9,
    State = 10,
    Closed = 11,
    NoopPublish = 12,
    Decode = 13,
    Parse = 14,
    #[cfg(feature = "postcard")]
    PostcardEncode = 20,
    #[cfg(feature = "postcard")]
    PostcardDecode = 21,
    #[cfg(feature = "cbor")]
    CborEncode = 22,
    #[cfg(feature = "cbor")]
    CborDecode = 23,
}

impl Liaise for LocioCode {
    fn code_id(self) -> u16 { self as u16 }

    fn message(self) -> &'static str {
        match self {
            Self::Io => "I/O error",
            Self::FrameTooLarge => "Frame too large",
            Self::InvalidUrl => "Invalid socket url",
            Self::Connect => "Connect failed",
            Self::Bind => "Bind failed",
            Self::Send => "Send failed",
            Self::Timeout => "Timed out",
            Self::Disconnected => "Peer disconnected",
            Self::Unsupported => "Operation not supported by protocol",
            Self::State => "Request/reply out of sequence",
            Self::Closed => "Socket closed",
            Self::NoopPublish => "Noop publisher does not publish anything",
            Self::Decode => "Message is not valid UTF-8",
            Self::Parse => "Unknown name",
            #[cfg(feature = "postcard")]
            Self::PostcardEncode => "Postcard encode failed",
            #[cfg(feature = "postcard")]
            Self::PostcardDecode => "Postcard decode failed",
            #[cfg(feature = "cbor")]
            Self::CborEncode => "CBOR encode failed",
            #[cfg(feature = "cbor")]
            Self::CborDecode => "CBOR decode failed",
        }
    }
}

/// Concrete runtime error type for the crate.
/// Uses `liaise` for stable IDs + formatting; no `thiserror`.
#[derive(Debug)]
pub struct LocioError {
    pub code: LocioCode,
    pub ctx: Option<String>,
    pub source: Option<LocioSource>,
}

#[derive(Debug)]
pub enum LocioSource {
    Io(io::Error),
    #[cfg(feature = "postcard")]
    Postcard(postcard::Error),
    #[cfg(feature = "cbor")]
    Cbor(serde_cbor::Error),
}

impl LocioError {
    #[inline]
    pub fn new(code: LocioCode) -> Self {
        Self { code, ctx: None, source: None }
    }

    #[inline]
    pub fn ctx(mut self, ctx: impl fmt::Display) -> Self {
        self.ctx = Some(ctx.to_string());
        self
    }

    #[inline]
    pub fn io(err: io::Error) -> Self {
        Self::with_io(LocioCode::Io, err.to_string(), err)
    }

    fn with_io(code: LocioCode, ctx: String, err: io::Error) -> Self {
        Self { code, ctx: Some(ctx), source: Some(LocioSource::Io(err)) }
    }

    #[inline]
    pub fn frame_too_large(len: usize, max: usize) -> Self {
        Self::new(LocioCode::FrameTooLarge).ctx(format_args!("len {len} exceeds max {max}"))
    }

    #[inline]
    pub fn invalid_url(url: &str) -> Self {
        Self::new(LocioCode::InvalidUrl).ctx(url)
    }

    #[inline]
    pub fn connect(url: &str, err: io::Error) -> Self {
        Self::with_io(LocioCode::Connect, format!("{url}: {err}"), err)
    }

    #[inline]
    pub fn bind(url: &str, err: io::Error) -> Self {
        Self::with_io(LocioCode::Bind, format!("{url}: {err}"), err)
    }

    #[inline]
    pub fn send(err: io::Error) -> Self {
        Self::with_io(LocioCode::Send, err.to_string(), err)
    }

    #[inline]
    pub fn unsupported(op: &str, protocol: impl fmt::Display) -> Self {
        Self::new(LocioCode::Unsupported).ctx(format_args!("{op} on {protocol} socket"))
    }

    #[inline]
    pub fn parse(kind: &str, value: &str) -> Self {
        Self::new(LocioCode::Parse).ctx(format_args!("{kind} '{value}'"))
    }

    #[cfg(feature = "postcard")]
    #[inline]
    pub fn postcard_encode(err: postcard::Error) -> Self {
        Self {
            code: LocioCode::PostcardEncode,
            ctx: Some(err.to_string()),
            source: Some(LocioSource::Postcard(err)),
        }
    }

    #[cfg(feature = "postcard")]
    #[inline]
    pub fn postcard_decode(err: postcard::Error) -> Self {
        Self {
            code: LocioCode::PostcardDecode,
            ctx: Some(err.to_string()),
            source: Some(LocioSource::Postcard(err)),
        }
    }

    #[cfg(feature = "cbor")]
    #[inline]
    pub fn cbor_encode(err: serde_cbor::Error) -> Self {
        Self {
            code: LocioCode::CborEncode,
            ctx: Some(err.to_string()),
            source: Some(LocioSource::Cbor(err)),
        }
    }

    #[cfg(feature = "cbor")]
    #[inline]
    pub fn cbor_decode(err: serde_cbor::Error) -> Self {
        Self {
            code: LocioCode::CborDecode,
            ctx: Some(err.to_string()),
            source: Some(LocioSource::Cbor(err)),
        }
    }
}

impl fmt::Display for LocioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "[LOCIO0012] msg: ctx"
        let base = self.code.render();
        match &self.ctx {
            Some(ctx) => write!(f, "{base}: {ctx}"),
            None => write!(f, "{base}"),
        }
    }
}

impl std::error::Error for LocioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(LocioSource::Io(e)) => Some(e),
            #[cfg(feature = "postcard")]
            Some(LocioSource::Postcard(e)) => Some(e),
            #[cfg(feature = "cbor")]
            Some(LocioSource::Cbor(e)) => Some(e),
            None => None,
        }
    }
}

impl From<std::io::Error> for LocioError {
    #[inline]
    fn from(e: std::io::Error) -> Self {
        LocioError::io(e)
    }
}
