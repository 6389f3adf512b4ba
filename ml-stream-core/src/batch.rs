//! Non-streaming feature collections and a replayable source over them

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::example::Example;
use crate::source::{ByteSource, VectorSource};
use crate::vector::FeatureVector;

/// A randomly indexable collection of feature vectors with optional labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix<V> {
    /// The vectors, in insertion order
    vectors: Vec<V>,

    /// One label per vector, if the collection is labeled
    labels: Option<Vec<f64>>,
}

impl<V: FeatureVector> FeatureMatrix<V> {
    /// Create an empty collection
    pub fn new(has_labels: bool) -> Self {
        Self::with_capacity(0, has_labels)
    }

    /// Create an empty collection with room for `capacity` vectors
    pub fn with_capacity(capacity: usize, has_labels: bool) -> Self {
        Self {
            vectors: Vec::with_capacity(capacity),
            labels: has_labels.then(|| Vec::with_capacity(capacity)),
        }
    }

    /// Create an unlabeled collection from vectors
    pub fn from_vectors(vectors: Vec<V>) -> Self {
        Self { vectors, labels: None }
    }

    /// Create a labeled collection from vectors and labels of equal length
    pub fn from_labeled(vectors: Vec<V>, labels: Vec<f64>) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }

        Ok(Self {
            vectors,
            labels: Some(labels),
        })
    }

    /// Append an example; its label must match the collection's labeling
    pub fn push(&mut self, example: Example<V>) -> Result<()> {
        let (vector, label) = example.into_parts();

        match (&mut self.labels, label) {
            (Some(labels), Some(label)) => labels.push(label),
            (None, None) => {}
            (Some(_), None) => {
                return Err(Error::InvalidArgument(
                    "unlabeled example pushed into a labeled collection".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidArgument(
                    "labeled example pushed into an unlabeled collection".into(),
                ))
            }
        }

        self.vectors.push(vector);
        Ok(())
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Whether the collection carries labels
    pub fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    /// Get the vector at `index`
    pub fn get(&self, index: usize) -> Option<&V> {
        self.vectors.get(index)
    }

    /// Get the label at `index`
    pub fn label(&self, index: usize) -> Option<f64> {
        self.labels.as_ref().and_then(|labels| labels.get(index).copied())
    }

    /// Get the example at `index`
    pub fn example(&self, index: usize) -> Option<Example<V>> {
        self.get(index)
            .map(|vector| Example::new(vector.clone(), self.label(index)))
    }

    /// All vectors
    pub fn vectors(&self) -> &[V] {
        &self.vectors
    }

    /// All labels
    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// Iterate over `(vector, label)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&V, Option<f64>)> + '_ {
        self.vectors
            .iter()
            .enumerate()
            .map(move |(index, vector)| (vector, self.label(index)))
    }

    /// Largest feature count over all vectors
    pub fn num_features(&self) -> usize {
        self.vectors
            .iter()
            .map(FeatureVector::num_features)
            .max()
            .unwrap_or(0)
    }
}

impl<V: FeatureVector + Serialize> FeatureMatrix<V> {
    /// Serialize the collection to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

impl<V: FeatureVector + DeserializeOwned> FeatureMatrix<V> {
    /// Deserialize a collection written by [`FeatureMatrix::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let matrix: Self = bincode::deserialize(bytes)?;

        if let Some(labels) = &matrix.labels {
            if labels.len() != matrix.vectors.len() {
                return Err(Error::InvalidArgument(
                    "serialized collection has mismatched label count".into(),
                ));
            }
        }

        Ok(matrix)
    }
}

/// A seekable byte source that replays a shared [`FeatureMatrix`]
///
/// Clones share the underlying collection but keep their own cursor.
#[derive(Debug, Clone)]
pub struct FeatureMatrixSource<V> {
    /// The collection being replayed
    matrix: Arc<FeatureMatrix<V>>,

    /// Index of the next vector to hand out
    cursor: usize,
}

impl<V: FeatureVector> FeatureMatrixSource<V> {
    /// Create a source positioned at the first vector
    pub fn new(matrix: FeatureMatrix<V>) -> Self {
        Self::from_shared(Arc::new(matrix))
    }

    /// Create a source over an already shared collection
    pub fn from_shared(matrix: Arc<FeatureMatrix<V>>) -> Self {
        Self { matrix, cursor: 0 }
    }

    /// The collection being replayed
    pub fn matrix(&self) -> &Arc<FeatureMatrix<V>> {
        &self.matrix
    }

    /// Index of the next vector to hand out
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<V: FeatureVector> ByteSource for FeatureMatrixSource<V> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

impl<V: FeatureVector> VectorSource<V> for FeatureMatrixSource<V> {
    fn read_vector(&mut self) -> Result<Option<V>> {
        let vector = self.matrix.get(self.cursor).cloned();
        if vector.is_some() {
            self.cursor += 1;
        }
        Ok(vector)
    }

    fn read_vector_and_label(&mut self) -> Result<Option<(V, f64)>> {
        if !self.matrix.has_labels() {
            return Err(Error::Source("feature collection has no labels".into()));
        }

        let Some(vector) = self.matrix.get(self.cursor).cloned() else {
            return Ok(None);
        };
        let label = self
            .matrix
            .label(self.cursor)
            .ok_or_else(|| Error::Source(format!("missing label for vector {}", self.cursor)))?;

        self.cursor += 1;
        Ok(Some((vector, label)))
    }
}
