// codegen-core/src/lib.rs

//! Code-Generation Tuning Coordinator - Core Library
//!
//! This crate provides the building blocks of the code-generation
//! dispatch coordinator: the length-prefixed message codec, endpoint
//! descriptors, worker registry parsing, the point replay cache, and
//! the coordinator's own configuration and error types.

pub mod cache;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod registry;
pub mod retry;

// Re-export commonly used types for convenience
pub use cache::PointCache;
pub use config::CoordinatorConfig;
pub use endpoint::{Endpoint, Scheme};
pub use error::{CoordinatorError, Result};
pub use message::{Message, MessageBody, MessageStatus, PointMessage, PointValue, SessionInit};
pub use registry::{parse_host_spec, WorkerSlot};
pub use retry::RetryConfig;
