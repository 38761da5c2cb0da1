//! `webreader` crate (library surface).
//!
//! The primary entrypoint is the `webreader` binary (HTTP server + CLI). The router is
//! exposed here so it can be embedded or exercised in-process.

pub mod http;

pub use webreader_core as core;
pub use webreader_local as local;
