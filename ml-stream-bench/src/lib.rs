//! Throughput benchmarks for the example handoff

use std::fmt::Write as _;
use std::path::Path;
use std::time::{Duration, Instant};

use ml_stream_core::{
    DenseVector, Error, Example, ExampleStream, FeatureMatrix, Result, SparseVector, StreamConfig, StreamingFeatures,
};
use ml_stream_readers::{AsciiReader, AsciiReaderOptions};

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of measured iterations
    pub iterations: usize,

    /// Warmup iterations
    pub warmup_iterations: usize,

    /// Examples per synthetic data set
    pub num_examples: usize,

    /// Features per synthetic example
    pub num_features: usize,

    /// Examples the parser may decode ahead of the consumer
    pub buffer_depth: usize,

    /// Whether examples carry labels
    pub labeled: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            warmup_iterations: 1,
            num_examples: 100_000,
            num_features: 32,
            buffer_depth: 1,
            labeled: true,
        }
    }
}

impl BenchConfig {
    fn stream_config(&self) -> StreamConfig {
        StreamConfig::default()
            .with_labels(self.labeled)
            .with_buffer_depth(self.buffer_depth)
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Name of the benchmark
    pub name: String,

    /// Total time taken
    pub total_time: Duration,

    /// Average time per iteration
    pub avg_time: Duration,

    /// Min time per iteration
    pub min_time: Duration,

    /// Max time per iteration
    pub max_time: Duration,

    /// Examples consumed over all measured iterations
    pub examples: usize,

    /// Throughput (examples/second)
    pub throughput: f64,
}

/// Run a benchmark; `func` returns the number of examples it consumed
pub fn run_benchmark<F>(name: &str, config: &BenchConfig, mut func: F) -> Result<BenchResult>
where
    F: FnMut() -> Result<usize>,
{
    if config.iterations == 0 {
        return Err(Error::InvalidArgument("benchmark needs at least one iteration".into()));
    }

    for _ in 0..config.warmup_iterations {
        func()?;
    }

    let mut times = Vec::with_capacity(config.iterations);
    let mut examples = 0;
    let start_total = Instant::now();

    for _ in 0..config.iterations {
        let start = Instant::now();
        examples += func()?;
        times.push(start.elapsed());
    }

    let total_time = start_total.elapsed();
    let avg_time = times.iter().sum::<Duration>() / u32::try_from(times.len()).unwrap_or(u32::MAX);
    let min_time = times.iter().min().copied().unwrap_or_default();
    let max_time = times.iter().max().copied().unwrap_or_default();

    #[allow(clippy::cast_precision_loss)]
    let throughput = examples as f64 / total_time.as_secs_f64().max(f64::EPSILON);

    tracing::info!(name, examples, ?total_time, throughput, "benchmark finished");

    Ok(BenchResult {
        name: name.to_string(),
        total_time,
        avg_time,
        min_time,
        max_time,
        examples,
        throughput,
    })
}

/// Fetch and release every example of a stream, then stop it
pub fn drain<St: ExampleStream>(stream: &mut St) -> Result<usize> {
    stream.start_parsing()?;

    let mut count = 0;
    while stream.fetch_next()? {
        count += 1;
        stream.release_current()?;
    }

    stream.end_parsing()?;
    Ok(count)
}

/// A dense collection with deterministic values
pub fn synthetic_matrix(config: &BenchConfig) -> Result<FeatureMatrix<DenseVector<f32>>> {
    let mut matrix = FeatureMatrix::with_capacity(config.num_examples, config.labeled);

    for row in 0..config.num_examples {
        #[allow(clippy::cast_precision_loss)]
        let values = (0..config.num_features)
            .map(|col| ((row * 31 + col * 7) % 97) as f32 / 97.0)
            .collect();
        let label = config.labeled.then(|| if row % 2 == 0 { 1.0 } else { -1.0 });
        matrix.push(Example::new(DenseVector::new(values), label))?;
    }

    Ok(matrix)
}

/// SVMLight text with every third feature present
pub fn synthetic_svmlight(config: &BenchConfig) -> String {
    let mut text = String::new();

    for row in 0..config.num_examples {
        if config.labeled {
            text.push_str(if row % 2 == 0 { "+1" } else { "-1" });
        }
        for col in (0..config.num_features).step_by(3) {
            let value = (row + col) % 11;
            let _ = write!(text, " {}:{value}", col + 1);
        }
        text.push('\n');
    }

    text
}

/// Stream an in-memory dense collection
pub fn bench_matrix_stream(config: &BenchConfig) -> Result<BenchResult> {
    let matrix = synthetic_matrix(config)?;
    let mut stream = StreamingFeatures::from_matrix(matrix, config.stream_config())?;

    run_benchmark("FeatureMatrix stream", config, || {
        let count = drain(&mut stream)?;
        stream.reset_stream()?;
        Ok(count)
    })
}

/// Parse and stream SVMLight text held in memory
pub fn bench_text_stream(config: &BenchConfig) -> Result<BenchResult> {
    let text = synthetic_svmlight(config).into_bytes();
    let reader = AsciiReader::from_bytes(text, AsciiReaderOptions::default());
    let mut stream = StreamingFeatures::<_, SparseVector<f64>>::bound(reader, config.stream_config())?;

    run_benchmark("SVMLight text stream", config, || {
        let count = drain(&mut stream)?;
        stream.reset_stream()?;
        Ok(count)
    })
}

/// Parse and stream an SVMLight file from disk
pub fn bench_file_stream<P: AsRef<Path>>(path: P, config: &BenchConfig) -> Result<BenchResult> {
    let reader = AsciiReader::open(path, AsciiReaderOptions::default())?;
    let mut stream = StreamingFeatures::<_, SparseVector<f64>>::bound(reader, config.stream_config())?;

    run_benchmark("SVMLight file stream", config, || {
        let count = drain(&mut stream)?;
        stream.reset_stream()?;
        Ok(count)
    })
}

/// Compare handoff throughput across parser buffer depths
pub fn compare_buffer_depths(config: &BenchConfig, depths: &[usize]) -> Result<Vec<BenchResult>> {
    depths
        .iter()
        .map(|&depth| {
            let config = BenchConfig {
                buffer_depth: depth,
                ..config.clone()
            };
            let mut result = bench_matrix_stream(&config)?;
            result.name = format!("FeatureMatrix stream, depth {depth}");
            Ok(result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small() -> BenchConfig {
        BenchConfig {
            iterations: 2,
            warmup_iterations: 1,
            num_examples: 50,
            num_features: 7,
            buffer_depth: 2,
            labeled: true,
        }
    }

    #[test]
    fn test_matrix_stream_counts_every_example() {
        let result = bench_matrix_stream(&small()).unwrap();
        assert_eq!(result.examples, 100);
        assert!(result.min_time <= result.max_time);
    }

    #[test]
    fn test_text_stream_counts_every_example() {
        let config = BenchConfig {
            labeled: false,
            ..small()
        };
        let result = bench_text_stream(&config).unwrap();
        assert_eq!(result.examples, 100);
    }

    #[test]
    fn test_file_stream() {
        let config = small();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(synthetic_svmlight(&config).as_bytes()).unwrap();

        let result = bench_file_stream(file.path(), &config).unwrap();
        assert_eq!(result.examples, 100);
    }

    #[test]
    fn test_buffer_depths_are_named() {
        let results = compare_buffer_depths(&small(), &[0, 4]).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].name.ends_with("depth 0"));
    }

    #[test]
    fn test_zero_iterations_is_rejected() {
        let config = BenchConfig {
            iterations: 0,
            ..small()
        };
        assert!(run_benchmark("empty", &config, || Ok(0)).is_err());
    }

    #[test]
    fn test_svmlight_layout() {
        let config = BenchConfig {
            num_examples: 2,
            num_features: 4,
            ..small()
        };
        assert_eq!(synthetic_svmlight(&config), "+1 1:0 4:3\n-1 1:1 4:4\n");
    }
}
