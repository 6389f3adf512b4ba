//! Stream configuration

/// Configuration for a streaming feature source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Whether examples carry labels
    pub has_labels: bool,

    /// Number of decoded examples the parser may hold ahead of the consumer
    /// (0 makes every handoff a rendezvous)
    pub buffer_depth: usize,

    /// Name given to the parser thread
    pub thread_name: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            has_labels: false,
            buffer_depth: 1,
            thread_name: "example-parser".to_string(),
        }
    }
}

impl StreamConfig {
    /// Configuration for a labeled stream
    pub fn labeled() -> Self {
        Self {
            has_labels: true,
            ..Self::default()
        }
    }

    /// Configuration for an unlabeled stream
    pub fn unlabeled() -> Self {
        Self::default()
    }

    /// Set whether examples carry labels
    #[must_use]
    pub fn with_labels(mut self, has_labels: bool) -> Self {
        self.has_labels = has_labels;
        self
    }

    /// Set the parser read-ahead depth
    #[must_use]
    pub fn with_buffer_depth(mut self, depth: usize) -> Self {
        self.buffer_depth = depth;
        self
    }

    /// Set the parser thread name
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
