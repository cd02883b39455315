#![cfg(feature = "cbor")]

use crate::{FrameSink, FrameSource, LocioError};
use {
    serde::{Serialize, de::DeserializeOwned},
};

pub fn send_cbor<S, T>(sink: &mut S, value: &T) -> Result<usize, LocioError>
where
    S: FrameSink<Error = LocioError>,
    T: Serialize,
{
    let encoded = ::serde_cbor::to_vec(value).map_err(LocioError::cbor_encode)?;
    sink.send_frame(&encoded)
}

pub fn recv_cbor<S, T>(source: &mut S) -> Result<Option<T>, LocioError>
where
    S: FrameSource<Error = LocioError>,
    T: DeserializeOwned,
{
    if source.recv_frame()?.is_none() {
        return Ok(None);
    }
    ::serde_cbor::from_slice(source.last_frame()).map(Some).map_err(LocioError::cbor_decode)
}
