//! # LOCIO
//! Location-addressed IPC over Unix Domain Sockets.
//!
//! Every process in the system is named by a [`Location`]. Socket addresses
//! are derived from that name and a [`Protocol`] role, so a binder and any
//! number of connectors meet at the same address without a registry.
//!
//! ## Pieces
//! * **Addressing:** [`IpcResolver`] turns `(location, role)` into an
//!   `ipc://` url; connectors get the opposite role's tag substituted.
//! * **Notifications:** a [`Publisher`] pushes "new data" notices to the
//!   master, an [`Observer`] receives what the master broadcasts.
//! * **Master service:** [`MasterService`] is a blocking request/reply
//!   channel to the coordinator.
//! * **Devices:** [`IoDevice`] is the per-process composition root;
//!   [`IoDeviceClient`] adds the observer, the service and a live publisher.
//!

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod location;
pub mod master;
pub mod observer;
pub mod protocol;
pub mod publisher;
pub mod service;
pub mod socket;
pub mod traits;
pub mod url;

pub use config::*;
pub use device::*;
pub use error::*;
pub use location::*;
pub use master::Master;
pub use observer::{Observer, select_timeout};
pub use protocol::Protocol;
pub use publisher::{ActivePublisher, HEARTBEAT, Publisher};
pub use service::MasterService;
pub use socket::Socket;
pub use traits::*;
pub use url::{AddressResolver, IpcResolver};
