//! # Stellar Infrastructure
//!
//! I/O side of the Stellar API client: everything that touches the network,
//! the filesystem or the process environment.
//!
//! This crate contains:
//! - The resilient request executor ([`ApiClient`])
//! - The OAuth client used to obtain and refresh credentials
//! - The reqwest-backed HTTP transport
//! - Config loading from environment variables and files
//! - File-backed credential storage
//!
//! ## Architecture
//! - Policy (classification, retry, token lifecycle) lives in `stellar-common`
//! - This crate wires that policy to reqwest, tokio and the filesystem

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, OAuthClient, OAuthEndpoints};
pub use config::{ClientConfig, ConfigError};
pub use errors::InfraError;
pub use http::HttpClient;
pub use storage::FileTokenStorage;
