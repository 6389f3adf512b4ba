//! Byte source traits consumed by the background parser

use crate::error::{Error, Result};
use crate::vector::FeatureVector;

/// An input that examples are decoded from
///
/// The source is shared between a stream and its parser thread, so it must
/// be `Send` and own all of its data.
pub trait ByteSource: Send + 'static {
    /// Whether the source can be rewound and replayed from the beginning
    fn is_seekable(&self) -> bool {
        false
    }

    /// Rewind the source to its first record
    fn rewind(&mut self) -> Result<()> {
        Err(Error::NotImplemented(
            "rewind is not supported by this source".into(),
        ))
    }
}

/// A byte source that can decode vectors of representation `V`
///
/// Both methods return `Ok(None)` once the input is exhausted.
pub trait VectorSource<V: FeatureVector>: ByteSource {
    /// Decode the next vector
    fn read_vector(&mut self) -> Result<Option<V>>;

    /// Decode the next vector together with its label
    fn read_vector_and_label(&mut self) -> Result<Option<(V, f64)>>;
}
