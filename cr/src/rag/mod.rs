//! Vector database settings
//!
//! Stores how to reach the vector database (embedded directory, self-hosted
//! server or cloud), validates candidate local directories and probes a
//! configuration before it is saved. Nothing here embeds or queries documents.

mod config;
mod connection;
mod error;
mod paths;

pub use config::{
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, PortValue, RagConfig, RagConfigInput, RagConfigStore, RagMode,
    merge_with_defaults,
};
pub use connection::{ApiKeyStatus, ChromaProbe, ConnectionReport, mask_api_key};
pub use error::RagError;
pub use paths::{PathDetails, PathValidation, validate_local_path};
