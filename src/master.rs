//! The coordinator's side of the master channels.
//!
//! Binds the three endpoints every [`crate::IoDeviceClient`] connects to:
//! notice intake (PULL), broadcast (PUBLISH) and service (REPLY).

use std::time::Duration;

use tracing::{debug, info};

use crate::{IoDevice, Location, LocioError, Protocol, Socket};

pub struct Master {
    notices: Socket,
    broadcast: Socket,
    service: Socket,
}

impl Master {
    pub fn bind(device: &IoDevice) -> Result<Self, LocioError> {
        let location = Location::master();
        let notices = device.bind_socket(&location, Protocol::Pull, None)?;
        let broadcast = device.bind_socket(&location, Protocol::Publish, None)?;
        let service = device.bind_socket(&location, Protocol::Reply, None)?;
        info!(location = %location, "master channels bound");
        Ok(Self { notices, broadcast, service })
    }

    /// Forward pending notices to every observer.
    ///
    /// Waits up to `timeout` for the first notice, then drains whatever else
    /// is already queued. Returns how many were forwarded.
    pub fn relay(&mut self, timeout: Option<Duration>) -> Result<usize, LocioError> {
        let mut forwarded = 0;
        self.notices.set_recv_timeout(timeout);
        while self.notices.recv()?.is_some() {
            self.broadcast.send_bytes(self.notices.last_message())?;
            forwarded += 1;
            self.notices.set_recv_timeout(Some(Duration::ZERO));
        }
        if forwarded > 0 {
            debug!(forwarded, subscribers = self.broadcast.peer_count(), "relayed notices");
        }
        Ok(forwarded)
    }

    /// Answer at most one request with `handler`'s reply. `false` if none arrived in time.
    pub fn serve<F>(&mut self, timeout: Option<Duration>, handler: F) -> Result<bool, LocioError>
    where
        F: FnOnce(&str) -> String,
    {
        self.service.set_recv_timeout(timeout);
        let Some(request) = self.service.recv_string()? else {
            return Ok(false);
        };
        let reply = handler(&request);
        self.service.send(&reply)?;
        Ok(true)
    }

    pub fn close(&mut self) {
        self.notices.close();
        self.broadcast.close();
        self.service.close();
    }
}
