#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Shared HTTP client abstractions for aidevkit provider clients
//!
//! This crate provides the plumbing every provider client is built on: the
//! route builder, the request dispatcher, content-type aware response
//! conversion, the Server-Sent-Events parser and stream handler, and the
//! generic CRUD object provider.

pub mod audio;
pub mod convert;
pub mod crud;
pub mod error;
pub mod request_builder;
pub mod route;
pub mod sse;
pub mod streaming;

pub use crud::{ObjectProvider, OpError, OpResult};
pub use error::RequestError;
pub use request_builder::{AuthMethod, Endpoint, HttpMethod, RequestBuilder, RequestConfig};
pub use route::{PathParam, RouteBuilder};
pub use sse::{SseField, SseLine, SseParser};
pub use streaming::{StreamChunk, StreamHandler};

/// Re-export common types for convenience
pub use async_trait::async_trait;
pub use futures_util::stream::BoxStream;
pub use serde::{Deserialize, Serialize};
