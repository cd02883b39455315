//! Deterministic socket addresses.
//!
//! A binder tags its address with its own protocol; a connector asks for the
//! address of its *own* role and gets the opposite role's tag substituted.
//! Both sides therefore compute the same string with no registry:
//! `bind_address(l, p) == connect_address(l, p.opposite())`.

use std::path::{Path, PathBuf};

use crate::{Location, Protocol};

/// Transport scheme prefix of every address.
pub const IPC_SCHEME: &str = "ipc://";

pub trait AddressResolver {
    fn bind_address(&self, location: &Location, protocol: Protocol) -> String;
    fn connect_address(&self, location: &Location, protocol: Protocol) -> String;
}

/// `ipc://<socket_dir>/<category>/<group>/<name>.<protocol>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcResolver {
    socket_dir: PathBuf,
}

impl IpcResolver {
    pub fn new(socket_dir: impl Into<PathBuf>) -> Self {
        Self { socket_dir: socket_dir.into() }
    }

    pub fn socket_dir(&self) -> &Path { &self.socket_dir }

    fn make_url(&self, location: &Location, protocol: Protocol) -> String {
        let dir = self.socket_dir.join(location.category().name()).join(location.group());
        format!("{IPC_SCHEME}{}/{}.{}", dir.display(), location.name(), protocol.name())
    }
}

impl AddressResolver for IpcResolver {
    fn bind_address(&self, location: &Location, protocol: Protocol) -> String {
        self.make_url(location, protocol)
    }

    fn connect_address(&self, location: &Location, protocol: Protocol) -> String {
        self.make_url(location, protocol.opposite())
    }
}

/// Filesystem path behind an `ipc://` address.
pub fn ipc_path(url: &str) -> Option<&Path> {
    url.strip_prefix(IPC_SCHEME).filter(|p| !p.is_empty()).map(Path::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Mode};

    fn resolver() -> IpcResolver {
        IpcResolver::new("/var/run/kf/socket")
    }

    #[test]
    fn bind_address_uses_own_protocol() {
        let loc = Location::new(Mode::Live, Category::Td, "xtp", "acc1");
        assert_eq!(
            resolver().bind_address(&loc, Protocol::Publish),
            "ipc:///var/run/kf/socket/td/xtp/acc1.pub"
        );
    }

    #[test]
    fn connect_address_uses_opposite_protocol() {
        let master = Location::master();
        assert_eq!(
            resolver().connect_address(&master, Protocol::Push),
            "ipc:///var/run/kf/socket/system/master/master.pull"
        );
        assert_eq!(
            resolver().connect_address(&master, Protocol::Request),
            "ipc:///var/run/kf/socket/system/master/master.rep"
        );
    }

    #[test]
    fn mode_does_not_enter_the_address() {
        let live = Location::new(Mode::Live, Category::Md, "ctp", "md");
        let replay = Location::new(Mode::Replay, Category::Md, "ctp", "md");
        assert_eq!(
            resolver().bind_address(&live, Protocol::Pull),
            resolver().bind_address(&replay, Protocol::Pull)
        );
    }

    #[test]
    fn ipc_path_strips_scheme() {
        assert_eq!(ipc_path("ipc:///tmp/a.pub"), Some(Path::new("/tmp/a.pub")));
        assert_eq!(ipc_path("tcp://127.0.0.1:1"), None);
        assert_eq!(ipc_path("ipc://"), None);
    }
}
