//! # monodb-server
//!
//! A networked, stream-oriented front-end for the table-mutation language:
//! it accepts line-oriented TCP connections, hands each line to
//! [`monodb_query::parse`], and writes back the resulting AST (or a parse
//! error) to the client. It does not touch storage — per the purpose and
//! scope this workspace's WAL is judged against, this crate stays a thin
//! external collaborator, not a query engine.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::ServerError;
pub use handler::LineHandler;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::Session;
