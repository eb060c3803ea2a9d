//! # Xray API Endpoints
//!
//! Endpoint implementations grouped by capability: result import, feature
//! import and export, and the connection check.

pub mod connection;
pub mod export;
pub mod feature;
pub mod import;
