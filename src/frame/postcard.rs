#![cfg(feature = "postcard")]

use crate::{FrameSink, FrameSource, LocioError};

use serde::{Serialize, de::DeserializeOwned};

/// Encode `value` with postcard and send it as one frame.
pub fn send_postcard<S, T>(sink: &mut S, value: &T) -> Result<usize, LocioError>
where
    S: FrameSink<Error = LocioError>,
    T: Serialize,
{
    let encoded = ::postcard::to_allocvec(value).map_err(LocioError::postcard_encode)?;
    sink.send_frame(&encoded)
}

/// Receive one frame and decode it. `Ok(None)` when the wait expired.
pub fn recv_postcard<S, T>(source: &mut S) -> Result<Option<T>, LocioError>
where
    S: FrameSource<Error = LocioError>,
    T: DeserializeOwned,
{
    if source.recv_frame()?.is_none() {
        return Ok(None);
    }
    ::postcard::from_bytes(source.last_frame()).map(Some).map_err(LocioError::postcard_decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Location, LocioCode, Mode, Protocol, Socket};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    enum Command {
        Register(Location),
        Deregister { uid: u32 },
    }

    fn pipe(name: &str) -> (tempfile::TempDir, Socket, Socket) {
        let dir = tempdir().unwrap();
        let url = format!("ipc://{}/{name}", dir.path().display());
        let mut pull = Socket::new(Protocol::Pull).unwrap();
        pull.bind(&url).unwrap();
        pull.set_recv_timeout(Some(Duration::from_secs(2)));
        let mut push = Socket::new(Protocol::Push).unwrap();
        push.connect(&url).unwrap();
        (dir, push, pull)
    }

    #[test]
    fn postcard_commands_cross_the_socket() {
        let (_dir, mut push, mut pull) = pipe("pc.pull");

        let register = Command::Register(Location::new(Mode::Live, Category::Md, "ctp", "md1"));
        let deregister = Command::Deregister { uid: 7 };
        send_postcard(&mut push, &register).unwrap();
        send_postcard(&mut push, &deregister).unwrap();

        assert_eq!(recv_postcard::<_, Command>(&mut pull).unwrap(), Some(register));
        assert_eq!(recv_postcard::<_, Command>(&mut pull).unwrap(), Some(deregister));
    }

    #[test]
    fn postcard_decode_error() {
        let (_dir, mut push, mut pull) = pipe("bad.pull");
        push.send_bytes(&[0xFF, 0xFF, 0xFF]).unwrap();

        let err = recv_postcard::<_, String>(&mut pull).unwrap_err();
        assert_eq!(err.code, LocioCode::PostcardDecode);
    }
}
