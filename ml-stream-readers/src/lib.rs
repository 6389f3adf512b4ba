//! Byte source implementations for streaming ML features
//!
//! This crate provides readers that decode examples from text inputs so
//! they can be driven by a [`StreamingFeatures`] stream.

#![warn(missing_docs)]

pub mod common;
pub mod text;

pub use common::{AsciiReaderOptions, Delimiter, LabelPosition};
pub use text::{AsciiReader, LineInput, LineParser, MappedInput, StreamInput};

// Re-export core types
pub use ml_stream_core::{
    ByteSource, DenseVector, Error, Result, SparseVector, StreamConfig, StreamingFeatures, VectorSource,
};
