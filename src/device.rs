//! Per-process composition root.
//!
//! A process builds exactly one device at startup and keeps it for its whole
//! lifetime. Every socket it opens afterwards gets its address from the
//! device's resolver, and every writer shares the device's publisher.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    ActivePublisher, AddressResolver, IoConfig, IpcResolver, Location, LocioCode, LocioError, MasterService, Observer,
    Protocol, Publisher, Socket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Active,
    Closed,
}

/// Passive participant: resolves addresses, opens sockets, and holds a noop
/// publisher unless built as part of an [`IoDeviceClient`].
pub struct IoDevice {
    config: IoConfig,
    resolver: IpcResolver,
    publisher: Publisher,
    state: DeviceState,
}

impl IoDevice {
    pub fn new(config: IoConfig) -> Self {
        debug!(low_latency = config.low_latency, lazy = config.lazy, "creating io_device");
        let resolver = IpcResolver::new(config.socket_dir.clone());
        Self { config, resolver, publisher: Publisher::Noop, state: DeviceState::Active }
    }

    pub fn config(&self) -> &IoConfig { &self.config }
    pub fn resolver(&self) -> &IpcResolver { &self.resolver }
    pub fn is_low_latency(&self) -> bool { self.config.low_latency }
    pub fn is_lazy(&self) -> bool { self.config.lazy }
    pub fn state(&self) -> DeviceState { self.state }

    /// The process-wide publisher, lent out rather than duplicated.
    pub fn publisher(&mut self) -> &mut Publisher { &mut self.publisher }

    pub fn notify(&mut self) -> Result<(), LocioError> {
        self.ensure_active()?;
        self.publisher.notify()
    }

    pub fn publish(&mut self, message: &str) -> Result<(), LocioError> {
        self.ensure_active()?;
        self.publisher.publish(message)
    }

    /// Open a `protocol` socket connected to `location`.
    pub fn connect_socket(
        &self,
        location: &Location,
        protocol: Protocol,
        timeout: Option<Duration>,
    ) -> Result<Socket, LocioError> {
        self.ensure_active()?;
        let mut socket = Socket::new(protocol)?;
        let url = self.resolver.connect_address(location, protocol);
        socket.connect(&url)?;
        socket.set_recv_timeout(timeout);
        info!(%protocol, location = location.name(), %url, ?timeout, "connected socket");
        Ok(socket)
    }

    /// Open a `protocol` socket bound at `location`.
    pub fn bind_socket(
        &self,
        location: &Location,
        protocol: Protocol,
        timeout: Option<Duration>,
    ) -> Result<Socket, LocioError> {
        self.ensure_active()?;
        let mut socket = Socket::new(protocol)?;
        let url = self.resolver.bind_address(location, protocol);
        socket.bind(&url)?;
        socket.set_recv_timeout(timeout);
        info!(%protocol, location = location.name(), %url, ?timeout, "bound socket");
        Ok(socket)
    }

    /// Release the publisher's connection. Idempotent.
    pub fn close(&mut self) {
        if self.state == DeviceState::Closed {
            return;
        }
        self.publisher.close();
        self.state = DeviceState::Closed;
        debug!("io_device closed");
    }

    fn ensure_active(&self) -> Result<(), LocioError> {
        match self.state {
            DeviceState::Active => Ok(()),
            DeviceState::Closed => Err(LocioError::new(LocioCode::Closed).ctx("io_device")),
        }
    }
}

/// Active participant: watches the master's broadcasts, issues requests, and
/// publishes through a live connection.
///
/// Construction is all or nothing. If any of the three master connections
/// fails, the ones already opened are dropped and the error is returned.
pub struct IoDeviceClient {
    device: IoDevice,
    name: String,
    observer: Observer,
    service: MasterService,
}

impl IoDeviceClient {
    pub fn new(name: impl Into<String>, config: IoConfig) -> Result<Self, LocioError> {
        let name = name.into();
        debug!(%name, "creating io_device_client");

        let mut device = IoDevice::new(config);
        let master = Location::master();
        let low_latency = device.is_low_latency();

        let observer = Observer::connect(device.resolver(), &master, low_latency, device.config().notice_timeout)?;
        let service = MasterService::connect(device.resolver(), &master)?;
        device.publisher = Publisher::Active(ActivePublisher::connect(device.resolver(), &master, low_latency)?);

        Ok(Self { device, name, observer, service })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn observer(&mut self) -> &mut Observer { &mut self.observer }
    pub fn service(&mut self) -> &mut MasterService { &mut self.service }

    pub fn request(&mut self, message: &str) -> Result<String, LocioError> {
        self.device.ensure_active()?;
        self.service.request(message)
    }

    pub fn close(&mut self) {
        if self.device.state == DeviceState::Closed {
            return;
        }
        self.device.close();
        self.observer.close();
        self.service.close();
        debug!(name = %self.name, "io_device_client closed");
    }
}

impl Deref for IoDeviceClient {
    type Target = IoDevice;
    fn deref(&self) -> &IoDevice {
        &self.device
    }
}

impl DerefMut for IoDeviceClient {
    fn deref_mut(&mut self) -> &mut IoDevice {
        &mut self.device
    }
}
