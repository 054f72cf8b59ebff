//! # herd-node: Engine composition, notifications, RPC.
//!
//! Composes the herd-core pieces into a running service:
//! - [`engine::HerdEngine`]: the single serialized mutation domain
//! - [`emitter`]: channel-backed notification delivery
//! - [`scheduler`]: background daily reset
//! - [`rpc`]: JSON-RPC server for external access
//! - [`config::HerdConfig`]: service configuration

pub mod config;
pub mod emitter;
pub mod engine;
pub mod rpc;
pub mod scheduler;

pub use config::HerdConfig;
pub use engine::{HerdEngine, HerdStatus};
pub use rpc::start_rpc_server;
