//! rust-yangcodec - schema-driven YANG configuration codec
//!
//! This library converts typed configuration trees between XML and JSON,
//! driven by a schema of containers, lists and leafs, and can forward encoded
//! payloads to a remote device through a pluggable transport provider.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_yangcodec::{CodecEngine, CodecRequest, CodecService, EncodingFormat, SchemaTree};
//!
//! // Load the schema descriptor once at startup
//! let schema = Arc::new(SchemaTree::from_file("isis.schema.json").unwrap());
//!
//! // Populate a tree
//! let mut tree = schema.create("Isis").unwrap();
//! tree.set_leaf("enabled", true).unwrap();
//!
//! // Encode it without any transport attached
//! let service = CodecService::new(CodecEngine::new(schema), None);
//! let result = service.run(CodecRequest::encode(tree, EncodingFormat::Json)).unwrap();
//! ```

pub mod codec;
pub mod config;
mod error;
mod object;
mod schema;
pub mod service;
pub mod transport;
mod types;

pub use codec::{CodecEngine, EncodingFormat};
pub use config::SessionConfig;
pub use error::{CodecError, ErrorKind, Result};
pub use object::ObjectNode;
pub use schema::{NodeKind, SchemaNode, SchemaTree};
pub use service::{CodecRequest, CodecResult, CodecService, Remote};
pub use transport::{LoopbackProvider, Session, TcpProvider, TransportProvider};
pub use types::{Decimal64, EnumMember, Scalar, YangType};
