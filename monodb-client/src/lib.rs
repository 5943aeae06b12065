//! # monodb-client
//!
//! A thin TCP client for the line-oriented query front-end in
//! `monodb-server`: send one statement, read back one reply line. No
//! framing beyond newlines, no retries, no TLS — the protocol this crate
//! speaks is intentionally as shallow as the server that answers it.

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
