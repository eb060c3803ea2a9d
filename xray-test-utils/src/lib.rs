//! Test utilities shared across the xray-bridge workspace
//!
//! This crate provides common testing infrastructure including:
//! - XDG directory isolation ([`EnvTestGuard`])
//! - Temporary build workspaces ([`WorkspaceGuard`])
//! - Settings and credential files ([`ConfigFilesGuard`])
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod config;
pub mod env;
pub mod workspace;

// Re-export commonly used items
pub use config::ConfigFilesGuard;
pub use env::EnvTestGuard;
pub use workspace::WorkspaceGuard;
