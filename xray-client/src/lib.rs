//! # Xray API Client
//!
//! HTTP client for the Xray REST API in both of its endpoint families
//! (Cloud and Server/Data Center), and the factory that builds a client for
//! one capability from a resolved credential.

mod client;
pub mod consts;
mod endpoints;
pub mod error;
pub mod factory;
pub mod format;

// Re-export the client
pub use client::{ApiFamily, XrayClient};
pub use error::ClientError;
pub use factory::{Capability, ClientFactory, ConnectionTester, FeatureExporter, FeatureImporter, ResultImporter};
pub use format::{QueryParameter, ResultFormat, ResultsPayload};
