//! Streaming features: the example handoff state machine
//!
//! A [`StreamingFeatures`] hands examples from a background parser to the
//! caller one at a time. The caller drives a strict cycle:
//!
//! ```text
//! start_parsing
//! while fetch_next()? {
//!     current_vector / current_label / current_feature_count
//!     release_current
//! }
//! end_parsing
//! ```
//!
//! Exactly one example is held at a time. Fetching while holding, or
//! touching the current example while not holding one, is rejected with a
//! [`UsageError`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::batch::{FeatureMatrix, FeatureMatrixSource};
use crate::config::StreamConfig;
use crate::error::{Result, UsageError};
use crate::example::Example;
use crate::parser::{InputParser, SharedSource};
use crate::registry::{LabeledReadFn, ReaderBindings, VectorReadFn};
use crate::source::{ByteSource, VectorSource};
use crate::vector::FeatureVector;

/// Lifecycle state of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// Readers may be (re)bound; no parser thread
    Unstarted,
    /// Parser running, no example held
    Running,
    /// Parser running, the caller holds the current example
    Holding,
    /// The source ran out; every fetch returns `false`
    Exhausted,
    /// Parser stopped and joined
    Stopped,
}

impl StreamState {
    /// Whether a parser thread is attached in this state
    pub fn is_started(self) -> bool {
        matches!(self, StreamState::Running | StreamState::Holding | StreamState::Exhausted)
    }
}

/// The operations every example stream offers to a learning loop
pub trait ExampleStream {
    /// Vector representation of the streamed examples
    type Vector: FeatureVector;

    /// Spawn the background parser
    fn start_parsing(&mut self) -> Result<()>;

    /// Stop the background parser and wait for it to exit
    fn end_parsing(&mut self) -> Result<()>;

    /// Block until the next example is held (`true`) or the stream is exhausted (`false`)
    fn fetch_next(&mut self) -> Result<bool>;

    /// Give up the current example
    fn release_current(&mut self) -> Result<()>;

    /// Label of the current example
    fn current_label(&self) -> Result<f64>;

    /// Number of features of the current example
    fn current_feature_count(&self) -> Result<usize>;

    /// Feature vector of the current example
    fn current_vector(&self) -> Result<&Self::Vector>;

    /// Whether examples carry labels
    fn has_labels(&self) -> bool;

    /// Whether the stream can be reset and replayed
    fn is_seekable(&self) -> bool {
        false
    }

    /// Rewind the stream to its first example
    fn reset_stream(&mut self) -> Result<()> {
        Err(UsageError::NotSeekable.into())
    }
}

/// A stream of examples decoded from a byte source on a background thread
pub struct StreamingFeatures<S, V> {
    /// Configuration
    config: StreamConfig,

    /// Byte source, shared with the parser while it runs
    source: SharedSource<S>,

    /// Whether the source can be rewound
    seekable: bool,

    /// Reader functions handed to the parser
    bindings: ReaderBindings<S, V>,

    /// The running parser, if any
    parser: Option<InputParser<V>>,

    /// Examples decoded by a previous parser but never fetched
    backlog: VecDeque<Example<V>>,

    /// The example currently held by the caller
    current: Option<Example<V>>,

    /// Lifecycle state
    state: StreamState,

    /// Examples fetched since construction or the last reset
    fetched: u64,
}

impl<S: ByteSource, V: FeatureVector> StreamingFeatures<S, V> {
    /// Create a stream over `source` without any reader bound
    pub fn new(source: S, config: StreamConfig) -> Self {
        let seekable = source.is_seekable();
        Self::with_shared_source(Arc::new(Mutex::new(source)), seekable, config, ReaderBindings::new())
    }

    fn with_shared_source(
        source: SharedSource<S>,
        seekable: bool,
        config: StreamConfig,
        bindings: ReaderBindings<S, V>,
    ) -> Self {
        Self {
            config,
            source,
            seekable,
            bindings,
            parser: None,
            backlog: VecDeque::new(),
            current: None,
            state: StreamState::Unstarted,
            fetched: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Reader bindings
    pub fn bindings(&self) -> &ReaderBindings<S, V> {
        &self.bindings
    }

    /// Number of examples fetched since construction or the last reset
    pub fn examples_fetched(&self) -> u64 {
        self.fetched
    }

    /// Change the labeling mode; only allowed while no parser is attached
    pub fn set_has_labels(&mut self, has_labels: bool) -> Result<()> {
        if self.state.is_started() {
            return Err(UsageError::LabelModeLocked.into());
        }
        self.config.has_labels = has_labels;
        Ok(())
    }

    /// Bind a custom function for reading unlabeled examples
    pub fn bind_vector_reader_with(&mut self, reader: VectorReadFn<S, V>) -> Result<()> {
        self.bindings.bind_vector_reader(reader)
    }

    /// Bind a custom function for reading labeled examples
    pub fn bind_vector_and_label_reader_with(&mut self, reader: LabeledReadFn<S, V>) -> Result<()> {
        self.bindings.bind_vector_and_label_reader(reader)
    }

    /// The example currently held
    pub fn current_example(&self) -> Result<&Example<V>> {
        self.current.as_ref().ok_or_else(|| UsageError::NotHolding.into())
    }

    fn halt_parser(&mut self) -> Result<()> {
        if let Some(parser) = self.parser.take() {
            let leftover = parser.request_stop_and_join()?;
            self.backlog.extend(leftover);
        }
        Ok(())
    }
}

impl<S, V> StreamingFeatures<S, V>
where
    S: VectorSource<V>,
    V: FeatureVector,
{
    /// Bind the source's own vector reader for this representation
    pub fn bind_vector_reader(&mut self) -> Result<()> {
        self.bindings.bind_vector_reader(<S as VectorSource<V>>::read_vector)
    }

    /// Bind the source's own vector-and-label reader for this representation
    pub fn bind_vector_and_label_reader(&mut self) -> Result<()> {
        self.bindings
            .bind_vector_and_label_reader(<S as VectorSource<V>>::read_vector_and_label)
    }

    /// Bind both readers
    pub fn set_read_functions(&mut self) -> Result<()> {
        self.bind_vector_reader()?;
        self.bind_vector_and_label_reader()
    }

    /// Create a stream over `source` with both readers bound
    pub fn bound(source: S, config: StreamConfig) -> Result<Self> {
        let mut stream = Self::new(source, config);
        stream.set_read_functions()?;
        Ok(stream)
    }
}

impl<V: FeatureVector> StreamingFeatures<FeatureMatrixSource<V>, V> {
    /// Stream the examples of an in-memory collection
    ///
    /// The stream is labeled iff the collection carries labels.
    pub fn from_matrix(matrix: FeatureMatrix<V>, config: StreamConfig) -> Result<Self> {
        let config = config.with_labels(matrix.has_labels());
        Self::bound(FeatureMatrixSource::new(matrix), config)
    }
}

impl<S: ByteSource, V: FeatureVector> ExampleStream for StreamingFeatures<S, V> {
    type Vector = V;

    fn start_parsing(&mut self) -> Result<()> {
        if self.state.is_started() {
            return Err(UsageError::AlreadyStarted.into());
        }

        let reader = self.bindings.resolve(self.config.has_labels)?;
        let parser = InputParser::begin(Arc::clone(&self.source), reader, &self.config)?;

        self.bindings.freeze();
        self.parser = Some(parser);
        self.state = StreamState::Running;
        Ok(())
    }

    fn end_parsing(&mut self) -> Result<()> {
        self.current = None;
        self.state = StreamState::Stopped;
        self.halt_parser()
    }

    fn fetch_next(&mut self) -> Result<bool> {
        match self.state {
            StreamState::Running => {}
            StreamState::Holding => return Err(UsageError::AlreadyHolding.into()),
            StreamState::Exhausted => return Ok(false),
            StreamState::Unstarted | StreamState::Stopped => {
                return Err(UsageError::NotRunning.into())
            }
        }

        let next = match self.backlog.pop_front() {
            Some(example) => Some(example),
            None => match self.parser.as_mut() {
                Some(parser) => parser.pop_one().map_err(|err| {
                    self.state = StreamState::Exhausted;
                    err
                })?,
                None => None,
            },
        };

        match next {
            Some(example) => {
                self.current = Some(example);
                self.state = StreamState::Holding;
                self.fetched += 1;
                Ok(true)
            }
            None => {
                self.state = StreamState::Exhausted;
                Ok(false)
            }
        }
    }

    fn release_current(&mut self) -> Result<()> {
        if self.state != StreamState::Holding {
            return Err(UsageError::NotHolding.into());
        }
        self.current = None;
        self.state = StreamState::Running;
        Ok(())
    }

    fn current_label(&self) -> Result<f64> {
        if !self.config.has_labels {
            return Err(UsageError::Unlabeled.into());
        }
        self.current_example()?
            .label()
            .ok_or_else(|| UsageError::Unlabeled.into())
    }

    fn current_feature_count(&self) -> Result<usize> {
        Ok(self.current_example()?.num_features())
    }

    fn current_vector(&self) -> Result<&V> {
        Ok(self.current_example()?.features())
    }

    fn has_labels(&self) -> bool {
        self.config.has_labels
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn reset_stream(&mut self) -> Result<()> {
        if !self.seekable {
            return Err(UsageError::NotSeekable.into());
        }

        self.current = None;
        self.state = StreamState::Stopped;
        self.halt_parser()?;
        self.backlog.clear();
        self.source.lock().rewind()?;

        self.bindings.unfreeze();
        self.state = StreamState::Unstarted;
        self.fetched = 0;

        tracing::debug!(representation = %V::representation(), "stream reset");
        Ok(())
    }
}

impl<S, V> fmt::Debug for StreamingFeatures<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingFeatures")
            .field("state", &self.state)
            .field("has_labels", &self.config.has_labels)
            .field("seekable", &self.seekable)
            .field("bindings", &self.bindings)
            .field("backlog", &self.backlog.len())
            .field("fetched", &self.fetched)
            .finish_non_exhaustive()
    }
}

pub(crate) fn duplicate_of<S, V>(stream: &StreamingFeatures<S, V>, source: S) -> StreamingFeatures<S, V>
where
    S: ByteSource,
    V: FeatureVector,
{
    let mut bindings = stream.bindings.clone();
    bindings.unfreeze();
    StreamingFeatures::with_shared_source(
        Arc::new(Mutex::new(source)),
        stream.seekable,
        stream.config.clone(),
        bindings,
    )
}

pub(crate) fn shared_source<S, V>(stream: &StreamingFeatures<S, V>) -> &SharedSource<S> {
    &stream.source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::vector::{DenseVector, SparseVector};
    use proptest::prelude::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn dense_matrix(values: &[f32], labels: Option<&[f64]>) -> FeatureMatrix<DenseVector<f32>> {
        let mut matrix = FeatureMatrix::new(labels.is_some());
        for (i, value) in values.iter().enumerate() {
            let example = Example::new(DenseVector::new(vec![*value, *value * 2.0]), labels.map(|l| l[i]));
            matrix.push(example).unwrap();
        }
        matrix
    }

    fn drain<E: ExampleStream<Vector = DenseVector<f32>>>(stream: &mut E) -> Vec<f32> {
        let mut seen = Vec::new();
        while stream.fetch_next().unwrap() {
            seen.push(stream.current_vector().unwrap().as_slice()[0]);
            stream.release_current().unwrap();
        }
        seen
    }

    /// A live, non-seekable source that counts down.
    struct Ticker(u32);

    impl ByteSource for Ticker {}

    impl VectorSource<SparseVector<f64>> for Ticker {
        fn read_vector(&mut self) -> Result<Option<SparseVector<f64>>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            SparseVector::from_pairs(vec![(self.0 as usize, 1.0)]).map(Some)
        }

        fn read_vector_and_label(&mut self) -> Result<Option<(SparseVector<f64>, f64)>> {
            Ok(self.read_vector()?.map(|vector| (vector, 1.0)))
        }
    }

    struct Jammed(u32);

    impl ByteSource for Jammed {
        fn is_seekable(&self) -> bool {
            true
        }

        fn rewind(&mut self) -> Result<()> {
            Err(Error::Source("rewind failed".into()))
        }
    }

    impl VectorSource<SparseVector<f64>> for Jammed {
        fn read_vector(&mut self) -> Result<Option<SparseVector<f64>>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            SparseVector::from_pairs(vec![(self.0 as usize, 1.0)]).map(Some)
        }

        fn read_vector_and_label(&mut self) -> Result<Option<(SparseVector<f64>, f64)>> {
            Ok(self.read_vector()?.map(|vector| (vector, 1.0)))
        }
    }

    #[test]
    fn test_failed_rewind_leaves_stream_stopped() {
        let mut stream =
            StreamingFeatures::<Jammed, SparseVector<f64>>::bound(Jammed(4), StreamConfig::unlabeled()).unwrap();
        stream.start_parsing().unwrap();
        assert!(stream.fetch_next().unwrap());
        stream.release_current().unwrap();

        assert!(matches!(stream.reset_stream(), Err(Error::Source(_))));
        assert_eq!(stream.state(), StreamState::Stopped);

        let err = stream.fetch_next().unwrap_err();
        assert_eq!(err.usage(), Some(&UsageError::NotRunning));

        stream.start_parsing().unwrap();
        assert!(stream.fetch_next().unwrap());
        stream.end_parsing().unwrap();
    }

    #[test]
    fn test_fetch_release_cycle_preserves_order() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0, 2.0, 3.0], None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();

        assert_eq!(drain(&mut stream), vec![1.0, 2.0, 3.0]);
        assert_eq!(stream.examples_fetched(), 3);
        stream.end_parsing().unwrap();
    }

    #[test]
    fn test_fetch_while_holding_is_rejected() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0, 2.0], None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();

        assert!(stream.fetch_next().unwrap());
        let err = stream.fetch_next().unwrap_err();
        assert_eq!(err.usage(), Some(&UsageError::AlreadyHolding));

        // The held example survives the rejected call.
        assert_eq!(stream.current_vector().unwrap().as_slice(), &[1.0, 2.0]);
        stream.release_current().unwrap();
        assert!(stream.fetch_next().unwrap());
        assert_eq!(stream.current_vector().unwrap().as_slice(), &[2.0, 4.0]);
    }

    #[test]
    fn test_release_and_access_without_holding_are_rejected() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0], None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();

        assert_eq!(stream.release_current().unwrap_err().usage(), Some(&UsageError::NotHolding));
        assert_eq!(stream.current_feature_count().unwrap_err().usage(), Some(&UsageError::NotHolding));
        assert!(stream.current_vector().is_err());
    }

    #[test]
    fn test_exhaustion_is_monotonic() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0], None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();

        assert!(stream.fetch_next().unwrap());
        stream.release_current().unwrap();
        for _ in 0..3 {
            assert!(!stream.fetch_next().unwrap());
            assert_eq!(stream.state(), StreamState::Exhausted);
        }
    }

    #[test]
    fn test_label_gating() {
        let labeled = dense_matrix(&[1.0, 2.0], Some(&[-1.0, 1.0]));
        let mut stream = StreamingFeatures::from_matrix(labeled, StreamConfig::default()).unwrap();
        assert!(stream.has_labels());
        stream.start_parsing().unwrap();
        assert!(stream.fetch_next().unwrap());
        assert_eq!(stream.current_label().unwrap(), -1.0);
        assert_eq!(stream.current_feature_count().unwrap(), 2);
        stream.release_current().unwrap();
        assert!(stream.fetch_next().unwrap());
        assert_eq!(stream.current_label().unwrap(), 1.0);

        let mut unlabeled =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0], None), StreamConfig::default()).unwrap();
        unlabeled.start_parsing().unwrap();
        assert!(unlabeled.fetch_next().unwrap());
        assert_eq!(unlabeled.current_label().unwrap_err().usage(), Some(&UsageError::Unlabeled));
    }

    #[test]
    fn test_lifecycle_misuse() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0], None), StreamConfig::default()).unwrap();

        assert_eq!(stream.fetch_next().unwrap_err().usage(), Some(&UsageError::NotRunning));

        stream.start_parsing().unwrap();
        assert_eq!(stream.start_parsing().unwrap_err().usage(), Some(&UsageError::AlreadyStarted));
        assert_eq!(stream.set_has_labels(true).unwrap_err().usage(), Some(&UsageError::LabelModeLocked));
        assert_eq!(stream.bind_vector_reader().unwrap_err().usage(), Some(&UsageError::ReadersFrozen));

        stream.end_parsing().unwrap();
        stream.end_parsing().unwrap();
        assert_eq!(stream.state(), StreamState::Stopped);
        assert_eq!(stream.fetch_next().unwrap_err().usage(), Some(&UsageError::NotRunning));
    }

    #[test]
    fn test_start_without_reader_is_rejected() {
        let source = FeatureMatrixSource::new(dense_matrix(&[1.0], None));
        let mut stream = StreamingFeatures::<_, DenseVector<f32>>::new(source, StreamConfig::default());

        let err = stream.start_parsing().unwrap_err();
        assert_eq!(err.usage(), Some(&UsageError::ReaderNotBound { labeled: false }));
        assert_eq!(stream.state(), StreamState::Unstarted);
    }

    #[test]
    fn test_reset_replays_identical_sequence() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[4.0, 5.0, 6.0], None), StreamConfig::default()).unwrap();
        assert!(stream.is_seekable());

        stream.start_parsing().unwrap();
        let first = drain(&mut stream);
        stream.reset_stream().unwrap();
        assert_eq!(stream.state(), StreamState::Unstarted);
        assert_eq!(stream.examples_fetched(), 0);

        stream.start_parsing().unwrap();
        let second = drain(&mut stream);
        assert_eq!(first, second);
        assert_eq!(second, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_reset_mid_stream_starts_over() {
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&[1.0, 2.0, 3.0], None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();
        assert!(stream.fetch_next().unwrap());

        stream.reset_stream().unwrap();
        stream.start_parsing().unwrap();
        assert_eq!(drain(&mut stream), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_non_seekable_stream_cannot_reset() {
        let mut stream =
            StreamingFeatures::<Ticker, SparseVector<f64>>::bound(Ticker(3), StreamConfig::default()).unwrap();
        assert!(!stream.is_seekable());

        let err = stream.reset_stream().unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::NotSeekable)));

        stream.start_parsing().unwrap();
        let mut counts = Vec::new();
        while stream.fetch_next().unwrap() {
            counts.push(stream.current_feature_count().unwrap());
            stream.release_current().unwrap();
        }
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_end_while_producer_blocked_then_resume_without_loss() {
        let values: Vec<f32> = (0..100u16).map(f32::from).collect();
        let mut stream =
            StreamingFeatures::from_matrix(dense_matrix(&values, None), StreamConfig::default()).unwrap();
        stream.start_parsing().unwrap();

        let mut seen = Vec::new();
        for _ in 0..10 {
            assert!(stream.fetch_next().unwrap());
            seen.push(stream.current_vector().unwrap().as_slice()[0]);
            stream.release_current().unwrap();
        }

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        stream.end_parsing().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        stream.start_parsing().unwrap();
        seen.extend(drain(&mut stream));
        assert_eq!(seen, values);
    }

    #[test]
    fn test_decode_failure_surfaces_once_then_exhausts() {
        fn broken(_: &mut FeatureMatrixSource<DenseVector<f32>>) -> Result<Option<DenseVector<f32>>> {
            Err(Error::Source("unreadable".into()))
        }

        let source = FeatureMatrixSource::new(dense_matrix(&[1.0], None));
        let mut stream = StreamingFeatures::new(source, StreamConfig::default());
        stream.bind_vector_reader_with(broken).unwrap();
        stream.start_parsing().unwrap();

        assert!(matches!(stream.fetch_next(), Err(Error::Source(_))));
        assert!(!stream.fetch_next().unwrap());
    }

    proptest! {
        #[test]
        fn prop_order_matches_source(values in proptest::collection::vec(-1.0e6f32..1.0e6, 0..40), depth in 0usize..4) {
            let config = StreamConfig::default().with_buffer_depth(depth);
            let mut stream = StreamingFeatures::from_matrix(dense_matrix(&values, None), config).unwrap();
            stream.start_parsing().unwrap();
            prop_assert_eq!(drain(&mut stream), values);
            stream.end_parsing().unwrap();
        }
    }
}
