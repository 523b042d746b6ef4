//! In-process provider that answers without any I/O

use crate::codec::EncodingFormat;
use crate::config::SessionConfig;
use crate::error::{CodecError, Result};

use super::{Session, TransportProvider};

/// Provider whose sessions echo each request, or reply with a fixed payload
#[derive(Debug, Clone, Default)]
pub struct LoopbackProvider {
    response: Option<Vec<u8>>,
}

impl LoopbackProvider {
    /// Echo every request back unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with `response`
    pub fn responding(response: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

impl TransportProvider for LoopbackProvider {
    fn open(&self, config: &SessionConfig) -> Result<Box<dyn Session>> {
        tracing::debug!(address = %config.address, "opening loopback session");
        Ok(Box::new(LoopbackSession {
            response: self.response.clone(),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct LoopbackSession {
    response: Option<Vec<u8>>,
    closed: bool,
}

impl Session for LoopbackSession {
    fn request(&mut self, payload: &[u8], _format: EncodingFormat) -> Result<Vec<u8>> {
        if self.closed {
            return Err(CodecError::Refused("loopback session is closed".into()));
        }
        Ok(self.response.clone().unwrap_or_else(|| payload.to_vec()))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
