//! API module
//!
//! This module provides the HTTP surface for the planboard engine: the
//! axum server translating routes into commands, and the client used by
//! the CLI and other hosts.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError, CoreClient, HttpClient};
pub use server::{router, serve, ServerConfig};
