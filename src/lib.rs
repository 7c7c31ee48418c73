#![forbid(unsafe_code)]

//! Stream long-running agent job progress over chunked HTTP and reassemble
//! it on the client.
//!
//! The server side ([`server`], [`emitter`]) runs a job through an
//! [`agent::AgentCollaborator`] and writes one event-stream frame per step.
//! The client side ([`client`]) picks a reception strategy, turns unaligned
//! body fragments back into [`models::progress::ProgressUpdate`]s and tracks
//! each run in a [`client::JobSession`].

pub mod agent;
pub mod client;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod frame;
pub mod models;
pub mod server;
pub mod tools;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
