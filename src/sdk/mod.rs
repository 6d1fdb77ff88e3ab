//! Client facade
//!
//! A small stateless surface over the load balancer: `chat`, `generate`,
//! `embed`, `batch` and a stats snapshot, plus a blocking twin for
//! synchronous callers.

pub mod client;
pub mod sync;

pub use client::{CallOptions, Client};
pub use sync::BlockingClient;
