//! Codec Service
//!
//! Orchestrates one encode or decode per call. The service holds a
//! [`CodecEngine`] and, optionally, a [`Remote`] target; all session state
//! lives in the transport provider, never here.

use std::sync::Arc;

use crate::codec::{CodecEngine, EncodingFormat};
use crate::config::SessionConfig;
use crate::error::{CodecError, Result};
use crate::object::ObjectNode;
use crate::transport::TransportProvider;

/// A provider paired with the session it should open
#[derive(Debug, Clone)]
pub struct Remote {
    pub provider: Arc<dyn TransportProvider>,
    pub config: SessionConfig,
}

impl Remote {
    pub fn new(provider: Arc<dyn TransportProvider>, config: SessionConfig) -> Self {
        Self { provider, config }
    }
}

/// One operation handed to [`CodecService::run`]
#[derive(Debug, Clone)]
pub enum CodecRequest {
    /// Serialize a tree; forwarded to the remote when one is attached
    Encode {
        tree: ObjectNode,
        format: EncodingFormat,
    },
    /// Parse a payload into a tree
    Decode {
        bytes: Vec<u8>,
        format: EncodingFormat,
    },
}

impl CodecRequest {
    pub fn encode(tree: ObjectNode, format: EncodingFormat) -> Self {
        CodecRequest::Encode { tree, format }
    }

    pub fn decode(bytes: impl Into<Vec<u8>>, format: EncodingFormat) -> Self {
        CodecRequest::Decode {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn format(&self) -> EncodingFormat {
        match self {
            CodecRequest::Encode { format, .. } | CodecRequest::Decode { format, .. } => *format,
        }
    }
}

/// Outcome of a successful [`CodecRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum CodecResult {
    Encoded(Vec<u8>),
    Decoded(ObjectNode),
}

impl CodecResult {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            CodecResult::Encoded(bytes) => Some(bytes),
            CodecResult::Decoded(_) => None,
        }
    }

    pub fn into_tree(self) -> Option<ObjectNode> {
        match self {
            CodecResult::Encoded(_) => None,
            CodecResult::Decoded(tree) => Some(tree),
        }
    }
}

/// Stateless front end over a codec engine and an optional remote target
///
/// # Example
/// ```ignore
/// let service = CodecService::new(engine, None);
/// let bytes = service.run(CodecRequest::encode(tree, EncodingFormat::Json))?;
/// ```
#[derive(Debug, Clone)]
pub struct CodecService {
    engine: CodecEngine,
    remote: Option<Remote>,
}

impl CodecService {
    pub fn new(engine: CodecEngine, remote: Option<Remote>) -> Self {
        Self { engine, remote }
    }

    pub fn engine(&self) -> &CodecEngine {
        &self.engine
    }

    pub fn remote(&self) -> Option<&Remote> {
        self.remote.as_ref()
    }

    /// Execute one request
    pub fn run(&self, request: CodecRequest) -> Result<CodecResult> {
        match request {
            CodecRequest::Encode { tree, format } => {
                if !self.engine.schema().is_root(tree.schema()) {
                    return Err(CodecError::RootMismatch(tree.schema().path().to_string()));
                }
                let bytes = self.engine.encode(&tree, format)?;
                match &self.remote {
                    Some(remote) => self.forward(remote, &bytes, format).map(CodecResult::Decoded),
                    None => Ok(CodecResult::Encoded(bytes)),
                }
            }
            CodecRequest::Decode { bytes, format } => {
                self.engine.decode(&bytes, format).map(CodecResult::Decoded)
            }
        }
    }

    /// Exchange an encoded payload and decode the reply
    fn forward(&self, remote: &Remote, payload: &[u8], format: EncodingFormat) -> Result<ObjectNode> {
        let mut session = remote.provider.open(&remote.config)?;
        tracing::debug!(
            address = %remote.config.address,
            port = remote.config.port,
            %format,
            "forwarding payload"
        );

        let reply = session.request(payload, format);
        let closed = session.close();
        let reply = reply?;
        if let Err(e) = closed {
            tracing::warn!(error = %e, "failed to close session");
        }

        self.engine.decode(&reply, format)
    }
}
