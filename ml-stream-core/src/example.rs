//! A single streamed example

use serde::{Deserialize, Serialize};

use crate::vector::FeatureVector;

/// One feature vector plus an optional label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example<V> {
    features: V,
    label: Option<f64>,
}

impl<V: FeatureVector> Example<V> {
    /// Create an example
    pub fn new(features: V, label: Option<f64>) -> Self {
        Self { features, label }
    }

    /// Create an unlabeled example
    pub fn unlabeled(features: V) -> Self {
        Self::new(features, None)
    }

    /// Create a labeled example
    pub fn labeled(features: V, label: f64) -> Self {
        Self::new(features, Some(label))
    }

    /// The feature vector
    pub fn features(&self) -> &V {
        &self.features
    }

    /// The label, if the example carries one
    pub fn label(&self) -> Option<f64> {
        self.label
    }

    /// Number of features of the vector
    pub fn num_features(&self) -> usize {
        self.features.num_features()
    }

    /// Split into vector and label
    pub fn into_parts(self) -> (V, Option<f64>) {
        (self.features, self.label)
    }
}
