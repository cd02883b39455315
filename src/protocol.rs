use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LocioError;

/// One side of a two-party messaging pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Reply,
    Publish,
    Subscribe,
    Push,
    Pull,
    Request,
}

impl Protocol {
    pub const ALL: [Protocol; 6] = [
        Protocol::Reply,
        Protocol::Publish,
        Protocol::Subscribe,
        Protocol::Push,
        Protocol::Pull,
        Protocol::Request,
    ];

    /// Name used as the last component of a socket address.
    pub const fn name(self) -> &'static str {
        match self {
            Protocol::Reply => "rep",
            Protocol::Publish => "pub",
            Protocol::Subscribe => "sub",
            Protocol::Push => "push",
            Protocol::Pull => "pull",
            Protocol::Request => "req",
        }
    }

    /// The role a peer must take to talk to this one. Total and self-inverse.
    pub const fn opposite(self) -> Protocol {
        match self {
            Protocol::Reply => Protocol::Request,
            Protocol::Request => Protocol::Reply,
            Protocol::Publish => Protocol::Subscribe,
            Protocol::Subscribe => Protocol::Publish,
            Protocol::Push => Protocol::Pull,
            Protocol::Pull => Protocol::Push,
        }
    }

    pub const fn can_send(self) -> bool {
        matches!(self, Protocol::Push | Protocol::Publish | Protocol::Request | Protocol::Reply)
    }

    pub const fn can_recv(self) -> bool {
        matches!(self, Protocol::Pull | Protocol::Subscribe | Protocol::Request | Protocol::Reply)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = LocioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| LocioError::parse("protocol", s))
    }
}
