//! Optional stream capabilities: bulk snapshots and duplication

use crate::batch::FeatureMatrix;
use crate::error::{Error, Result, UsageError};
use crate::stream::{self, ExampleStream, StreamState, StreamingFeatures};
use crate::source::ByteSource;
use crate::vector::FeatureVector;

/// The outcome of [`StreamSnapshot::materialize`]
#[derive(Debug)]
pub struct Materialized<V> {
    /// The examples that were collected
    pub batch: FeatureMatrix<V>,

    /// How many examples were asked for
    pub requested: usize,

    /// The decode error that ended collection early, if any
    ///
    /// Examples fetched before the failure are kept in `batch`.
    pub error: Option<Error>,
}

impl<V: FeatureVector> Materialized<V> {
    /// How many examples were actually collected
    pub fn actual_count(&self) -> usize {
        self.batch.len()
    }

    /// Whether the stream ran out before `requested` examples were collected
    pub fn is_short(&self) -> bool {
        self.actual_count() < self.requested
    }
}

/// Streams that can copy a prefix of themselves into a [`FeatureMatrix`]
pub trait StreamSnapshot: ExampleStream {
    /// Fetch up to `count` examples into a batch collection
    ///
    /// Stopping early because the stream ran out is not an error: the
    /// returned batch is shorter and a warning is logged. A decode failure
    /// also stops collection; it is returned in [`Materialized::error`]
    /// together with the examples fetched before it.
    fn materialize(&mut self, count: usize) -> Result<Materialized<Self::Vector>>;
}

/// Streams that can produce a fresh, independently positioned copy of themselves
pub trait DuplicateStream: ExampleStream + Sized {
    /// Create a copy that starts from the beginning of the same source
    fn duplicate(&self) -> Result<Self>;
}

impl<S: ByteSource, V: FeatureVector> StreamSnapshot for StreamingFeatures<S, V> {
    fn materialize(&mut self, count: usize) -> Result<Materialized<V>> {
        match self.state() {
            StreamState::Running | StreamState::Exhausted => {}
            StreamState::Holding => return Err(UsageError::AlreadyHolding.into()),
            StreamState::Unstarted | StreamState::Stopped => return Err(UsageError::NotRunning.into()),
        }

        let mut batch = FeatureMatrix::with_capacity(count, self.has_labels());
        let mut error = None;

        while batch.len() < count {
            match self.fetch_next() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) if err.is_usage() => return Err(err),
                Err(err) => {
                    error = Some(err);
                    break;
                }
            }

            let example = self.current_example()?.clone();
            self.release_current()?;
            batch.push(example)?;
        }

        if let Some(err) = &error {
            tracing::warn!(
                requested = count,
                actual = batch.len(),
                error = %err,
                "decode failure ended the snapshot early"
            );
        } else if batch.len() < count {
            tracing::warn!(
                requested = count,
                actual = batch.len(),
                representation = %V::representation(),
                "stream ended before the requested number of examples was read"
            );
        }

        Ok(Materialized {
            batch,
            requested: count,
            error,
        })
    }
}

impl<S, V> DuplicateStream for StreamingFeatures<S, V>
where
    S: ByteSource + Clone,
    V: FeatureVector,
{
    fn duplicate(&self) -> Result<Self> {
        if !self.is_seekable() {
            return Err(Error::NotImplemented(format!(
                "duplicate() of a {} stream over a non-seekable source",
                V::representation()
            )));
        }

        let mut source = S::clone(&stream::shared_source(self).lock());
        source.rewind()?;
        Ok(stream::duplicate_of(self, source))
    }
}
