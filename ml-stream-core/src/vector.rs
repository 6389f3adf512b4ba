//! Feature vector representations carried by streamed examples

use std::fmt;
use std::str::FromStr;

use bytemuck::Pod;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Trait for numeric types that can be used as feature values
pub trait FeatureType: Pod + Default + PartialEq + FromStr + fmt::Debug + Send + Sync + 'static {
    /// Name used in diagnostics
    const NAME: &'static str;
}

macro_rules! impl_feature_type {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FeatureType for $ty {
                const NAME: &'static str = $name;
            }
        )*
    };
}

impl_feature_type! {
    u8 => "uint8",
    i8 => "int8",
    u16 => "uint16",
    i16 => "int16",
    u32 => "uint32",
    i32 => "int32",
    u64 => "uint64",
    i64 => "int64",
    f32 => "float32",
    f64 => "float64",
}

/// Storage layout of a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    /// Every feature is stored
    Dense,
    /// Only non-zero features are stored, with their indices
    Sparse,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorKind::Dense => f.write_str("dense"),
            VectorKind::Sparse => f.write_str("sparse"),
        }
    }
}

/// A feature vector representation that can travel through a stream
pub trait FeatureVector: Clone + fmt::Debug + Send + Sync + 'static {
    /// Element type of the stored values
    type Element: FeatureType;

    /// Storage layout
    const KIND: VectorKind;

    /// Number of features (dimension) of this vector
    fn num_features(&self) -> usize;

    /// Number of explicitly stored values
    fn nnz(&self) -> usize;

    /// Human-readable representation tag, e.g. `dense<float32>`
    fn representation() -> String {
        format!("{}<{}>", Self::KIND, <Self::Element as FeatureType>::NAME)
    }
}

/// A dense feature vector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DenseVector<T> {
    values: Vec<T>,
}

impl<T: FeatureType> DenseVector<T> {
    /// Create a dense vector from its values
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    /// Create a dense vector of `len` zeros
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![T::default(); len],
        }
    }

    /// Get the values as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Get the value at `index`
    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take ownership of the values
    pub fn into_vec(self) -> Vec<T> {
        self.values
    }
}

impl<T: FeatureType> From<Vec<T>> for DenseVector<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl<T: FeatureType> FeatureVector for DenseVector<T> {
    type Element = T;

    const KIND: VectorKind = VectorKind::Dense;

    fn num_features(&self) -> usize {
        self.values.len()
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// One stored value of a sparse vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseEntry<T> {
    /// 0-based feature index
    pub index: usize,
    /// Feature value
    pub value: T,
}

impl<T> SparseEntry<T> {
    /// Create a sparse entry
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }
}

/// A sparse feature vector with strictly increasing indices
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SparseVector<T> {
    entries: Vec<SparseEntry<T>>,
}

/// Indices must strictly increase and leave room for a feature count
fn check_indices<T>(entries: &[SparseEntry<T>]) -> Result<()> {
    if let Some(pair) = entries.windows(2).find(|pair| pair[0].index >= pair[1].index) {
        return Err(Error::InvalidArgument(format!(
            "sparse indices must be strictly increasing, got {} then {}",
            pair[0].index, pair[1].index
        )));
    }

    if entries.last().is_some_and(|entry| entry.index == usize::MAX) {
        return Err(Error::InvalidArgument(format!(
            "sparse index {} is out of range",
            usize::MAX
        )));
    }

    Ok(())
}

impl<T: FeatureType> SparseVector<T> {
    /// Create a sparse vector, checking that indices strictly increase
    pub fn new(entries: Vec<SparseEntry<T>>) -> Result<Self> {
        check_indices(&entries)?;
        Ok(Self { entries })
    }

    /// Create a sparse vector from `(index, value)` pairs
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, T)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(index, value)| SparseEntry::new(index, value))
                .collect(),
        )
    }

    /// Get the stored entries
    pub fn entries(&self) -> &[SparseEntry<T>] {
        &self.entries
    }

    /// Get the value at `index`, zero when not stored
    pub fn get(&self, index: usize) -> T {
        self.entries
            .binary_search_by_key(&index, |entry| entry.index)
            .map(|pos| self.entries[pos].value)
            .unwrap_or_default()
    }

    /// Iterate over `(index, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.iter().map(|entry| (entry.index, entry.value))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SparseVector<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename = "SparseVector")]
        struct Unchecked<T> {
            entries: Vec<SparseEntry<T>>,
        }

        let Unchecked { entries } = Unchecked::deserialize(deserializer)?;
        check_indices(&entries).map_err(serde::de::Error::custom)?;
        Ok(Self { entries })
    }
}

impl<T: FeatureType> FeatureVector for SparseVector<T> {
    type Element = T;

    const KIND: VectorKind = VectorKind::Sparse;

    fn num_features(&self) -> usize {
        self.entries.last().map_or(0, |entry| entry.index + 1)
    }

    fn nnz(&self) -> usize {
        self.entries.len()
    }
}
