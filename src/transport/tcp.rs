//! Plain TCP sessions with NETCONF 1.0 end-of-message framing
//!
//! Each payload is followed by `]]>]]>`; the response is everything the peer
//! sends up to the next marker. Connect, read and write all honour the
//! session timeout.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::codec::EncodingFormat;
use crate::config::SessionConfig;
use crate::error::{CodecError, Result};

use super::{Session, TransportProvider};

/// End-of-message delimiter
pub(crate) const EOM: &[u8] = b"]]>]]>";

/// Largest response accepted before the delimiter arrives
const DEFAULT_MAX_RESPONSE: usize = 16 * 1024 * 1024;

/// Provider opening one TCP connection per session
#[derive(Debug, Clone, Copy)]
pub struct TcpProvider {
    max_response: usize,
}

impl TcpProvider {
    pub fn new() -> Self {
        Self {
            max_response: DEFAULT_MAX_RESPONSE,
        }
    }

    /// Limit the bytes buffered while waiting for one response
    pub fn with_max_response(mut self, max_response: usize) -> Self {
        self.max_response = max_response;
        self
    }
}

impl Default for TcpProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(peer: SocketAddr, err: io::Error) -> CodecError {
    let err = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            CodecError::Timeout(format!("{}: {}", peer, err))
        }
        _ => CodecError::Refused(format!("{}: {}", peer, err)),
    };
    tracing::warn!(%peer, error = %err, "transport failure");
    err
}

impl TransportProvider for TcpProvider {
    fn open(&self, config: &SessionConfig) -> Result<Box<dyn Session>> {
        let target = format!("{}:{}", config.address, config.port);
        let addrs = (config.address.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| CodecError::Connection(format!("cannot resolve {}: {}", target, e)))?;
        let timeout = config.timeout();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    let configure = |stream: &TcpStream| -> io::Result<()> {
                        stream.set_read_timeout(Some(timeout))?;
                        stream.set_write_timeout(Some(timeout))?;
                        stream.set_nodelay(true)
                    };
                    configure(&stream)
                        .map_err(|e| CodecError::Connection(format!("{}: {}", addr, e)))?;
                    tracing::info!(peer = %addr, "session opened");
                    return Ok(Box::new(TcpSession {
                        stream,
                        peer: addr,
                        pending: Vec::new(),
                        max_response: self.max_response,
                        closed: false,
                    }));
                }
                Err(e) => {
                    tracing::debug!(peer = %addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(CodecError::Connection(match last_error {
            Some(e) => format!("cannot connect to {}: {}", target, e),
            None => format!("no addresses for {}", target),
        }))
    }
}

#[derive(Debug)]
struct TcpSession {
    stream: TcpStream,
    peer: SocketAddr,
    /// Bytes received past the last delimiter
    pending: Vec<u8>,
    max_response: usize,
    closed: bool,
}

impl TcpSession {
    fn take_message(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.windows(EOM.len()).position(|w| w == EOM)?;
        let message = self.pending[..pos].to_vec();
        self.pending.drain(..pos + EOM.len());
        Some(message)
    }
}

impl Session for TcpSession {
    fn request(&mut self, payload: &[u8], format: EncodingFormat) -> Result<Vec<u8>> {
        if self.closed {
            return Err(CodecError::Refused(format!("{}: session is closed", self.peer)));
        }
        if payload.windows(EOM.len()).any(|w| w == EOM) {
            return Err(CodecError::Malformed {
                format,
                message: "payload contains the end-of-message delimiter".into(),
            });
        }

        let peer = self.peer;
        self.stream
            .write_all(payload)
            .and_then(|()| self.stream.write_all(EOM))
            .and_then(|()| self.stream.flush())
            .map_err(|e| transport_error(peer, e))?;
        tracing::debug!(%peer, %format, len = payload.len(), "request sent");

        let mut chunk = [0u8; 4096];
        loop {
            if let Some(message) = self.take_message() {
                tracing::debug!(%peer, len = message.len(), "response received");
                return Ok(message);
            }
            let n = self
                .stream
                .read(&mut chunk)
                .map_err(|e| transport_error(peer, e))?;
            if n == 0 {
                return Err(transport_error(
                    peer,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed the session"),
                ));
            }
            self.pending.extend_from_slice(&chunk[..n]);
            // The delimiter may still complete within the next read
            if self.pending.len() > self.max_response + EOM.len() {
                tracing::warn!(%peer, limit = self.max_response, "response too large");
                self.pending.clear();
                return Err(CodecError::Refused(format!(
                    "{}: response exceeds {} bytes without end-of-message",
                    peer, self.max_response
                )));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::info!(peer = %self.peer, "session closed");
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(transport_error(self.peer, e)),
        }
    }
}
