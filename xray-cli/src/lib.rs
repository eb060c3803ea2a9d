//! # Xray CLI Library
//!
//! Command definitions and the build host for the xray command-line tool.

pub mod cli;
pub mod host;
