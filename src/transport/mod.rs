//! Transport provider abstraction
//!
//! The codec core only depends on this narrow contract: a provider opens a
//! [`Session`], a session exchanges one encoded payload for a response, and
//! is closed afterwards. Timeouts and cancellation live here, never in the
//! codec.

mod loopback;
mod tcp;

pub use loopback::LoopbackProvider;
pub use tcp::TcpProvider;

use std::fmt;

use crate::codec::EncodingFormat;
use crate::config::SessionConfig;
use crate::error::Result;

/// Opens sessions to a target
pub trait TransportProvider: Send + Sync + fmt::Debug {
    /// Establish a session; fails with `CodecError::Connection`
    fn open(&self, config: &SessionConfig) -> Result<Box<dyn Session>>;
}

/// An open exchange with a target
pub trait Session: Send + fmt::Debug {
    /// Send one encoded payload and wait for the response payload.
    ///
    /// Fails with `CodecError::Timeout` or `CodecError::Refused`.
    fn request(&mut self, payload: &[u8], format: EncodingFormat) -> Result<Vec<u8>>;

    /// Release the session; further requests fail
    fn close(&mut self) -> Result<()>;
}
