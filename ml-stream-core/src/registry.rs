//! Reader bindings selected once per vector representation

use std::fmt;

use crate::error::{Result, UsageError};
use crate::example::Example;
use crate::vector::FeatureVector;

/// Reads one vector from a source
pub type VectorReadFn<S, V> = fn(&mut S) -> Result<Option<V>>;

/// Reads one vector and its label from a source
pub type LabeledReadFn<S, V> = fn(&mut S) -> Result<Option<(V, f64)>>;

/// The two reader functions a stream hands to its parser
///
/// Bindings can be replaced until the stream starts parsing. From then on
/// they are frozen: the parser thread captured a copy at spawn time.
pub struct ReaderBindings<S, V> {
    vector: Option<VectorReadFn<S, V>>,
    labeled: Option<LabeledReadFn<S, V>>,
    frozen: bool,
}

impl<S, V: FeatureVector> ReaderBindings<S, V> {
    /// Create empty bindings
    pub fn new() -> Self {
        Self {
            vector: None,
            labeled: None,
            frozen: false,
        }
    }

    /// Bind the function used to read unlabeled examples
    pub fn bind_vector_reader(&mut self, reader: VectorReadFn<S, V>) -> Result<()> {
        self.ensure_unfrozen()?;
        self.vector = Some(reader);
        Ok(())
    }

    /// Bind the function used to read labeled examples
    pub fn bind_vector_and_label_reader(&mut self, reader: LabeledReadFn<S, V>) -> Result<()> {
        self.ensure_unfrozen()?;
        self.labeled = Some(reader);
        Ok(())
    }

    /// The bound vector reader
    pub fn vector_reader(&self) -> Option<VectorReadFn<S, V>> {
        self.vector
    }

    /// The bound vector-and-label reader
    pub fn vector_and_label_reader(&self) -> Option<LabeledReadFn<S, V>> {
        self.labeled
    }

    /// Whether the bindings are frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Pick the reader matching the labeling mode
    pub(crate) fn resolve(&self, has_labels: bool) -> Result<ExampleReader<S, V>> {
        let reader = if has_labels {
            self.labeled.map(ExampleReader::Labeled)
        } else {
            self.vector.map(ExampleReader::Unlabeled)
        };

        reader.ok_or_else(|| UsageError::ReaderNotBound { labeled: has_labels }.into())
    }

    fn ensure_unfrozen(&self) -> Result<()> {
        if self.frozen {
            return Err(UsageError::ReadersFrozen.into());
        }
        Ok(())
    }
}

impl<S, V: FeatureVector> Default for ReaderBindings<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, V> Clone for ReaderBindings<S, V> {
    fn clone(&self) -> Self {
        Self {
            vector: self.vector,
            labeled: self.labeled,
            frozen: self.frozen,
        }
    }
}

impl<S, V> fmt::Debug for ReaderBindings<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderBindings")
            .field("vector", &self.vector.is_some())
            .field("labeled", &self.labeled.is_some())
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// The single reader a running parser decodes with
pub enum ExampleReader<S, V> {
    /// Decode vectors only
    Unlabeled(VectorReadFn<S, V>),
    /// Decode vectors and labels
    Labeled(LabeledReadFn<S, V>),
}

impl<S, V: FeatureVector> ExampleReader<S, V> {
    /// Decode the next example, `None` at end of input
    pub fn read(&self, source: &mut S) -> Result<Option<Example<V>>> {
        Ok(match self {
            ExampleReader::Unlabeled(read) => read(source)?.map(Example::unlabeled),
            ExampleReader::Labeled(read) => {
                read(source)?.map(|(vector, label)| Example::labeled(vector, label))
            }
        })
    }
}

impl<S, V> Clone for ExampleReader<S, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, V> Copy for ExampleReader<S, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::vector::DenseVector;

    struct Counter(u32);

    fn read_count(source: &mut Counter) -> Result<Option<DenseVector<u32>>> {
        source.0 += 1;
        Ok(Some(DenseVector::new(vec![source.0])))
    }

    fn read_count_labeled(source: &mut Counter) -> Result<Option<(DenseVector<u32>, f64)>> {
        source.0 += 1;
        Ok(Some((DenseVector::new(vec![source.0]), f64::from(source.0) * 10.0)))
    }

    #[test]
    fn test_resolve_requires_matching_binding() {
        let mut bindings = ReaderBindings::<Counter, DenseVector<u32>>::new();
        bindings.bind_vector_reader(read_count).unwrap();

        assert!(bindings.resolve(false).is_ok());
        let err = bindings.resolve(true).err().unwrap();
        assert_eq!(err.usage(), Some(&UsageError::ReaderNotBound { labeled: true }));
    }

    #[test]
    fn test_frozen_bindings_reject_rebinding() {
        let mut bindings = ReaderBindings::<Counter, DenseVector<u32>>::new();
        bindings.bind_vector_reader(read_count).unwrap();
        bindings.freeze();

        let err = bindings.bind_vector_and_label_reader(read_count_labeled).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::ReadersFrozen)));

        bindings.unfreeze();
        assert!(bindings.bind_vector_and_label_reader(read_count_labeled).is_ok());
    }

    #[test]
    fn test_example_reader_attaches_labels() {
        let mut bindings = ReaderBindings::<Counter, DenseVector<u32>>::new();
        bindings.bind_vector_reader(read_count).unwrap();
        bindings.bind_vector_and_label_reader(read_count_labeled).unwrap();
        let mut source = Counter(0);

        let unlabeled = bindings.resolve(false).unwrap().read(&mut source).unwrap().unwrap();
        assert_eq!(unlabeled.label(), None);

        let labeled = bindings.resolve(true).unwrap().read(&mut source).unwrap().unwrap();
        assert_eq!(labeled.label(), Some(20.0));
        assert_eq!(labeled.features().as_slice(), &[2]);
    }
}
