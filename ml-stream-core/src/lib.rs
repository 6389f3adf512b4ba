//! Core traits, handoff protocol and vector types for streaming ML features
//!
//! This crate moves examples from a parser running on a background thread
//! to an online learning loop, one example at a time. Byte sources decode
//! vectors; a stream binds the matching reader functions once, starts the
//! parser, and lets the caller fetch, inspect and release examples in a
//! strict cycle.

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod example;
pub mod parser;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod stream;
pub mod vector;

// Re-export key types for convenience
pub use batch::{FeatureMatrix, FeatureMatrixSource};
pub use config::StreamConfig;
pub use error::{Error, Result, UsageError};
pub use example::Example;
pub use registry::ReaderBindings;
pub use snapshot::{DuplicateStream, Materialized, StreamSnapshot};
pub use source::{ByteSource, VectorSource};
pub use stream::{ExampleStream, StreamState, StreamingFeatures};
pub use vector::{DenseVector, FeatureType, FeatureVector, SparseEntry, SparseVector, VectorKind};
