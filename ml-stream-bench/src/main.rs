//! Benchmark runner for the streaming example handoff

use anyhow::Context;
use ml_stream_bench::{bench_file_stream, bench_matrix_stream, bench_text_stream, compare_buffer_depths, BenchConfig, BenchResult};

fn print_result(result: &BenchResult) {
    println!("\nBenchmark: {}", result.name);
    println!("  Total time:   {:?}", result.total_time);
    println!("  Average time: {:?}", result.avg_time);
    println!("  Min time:     {:?}", result.min_time);
    println!("  Max time:     {:?}", result.max_time);
    println!("  Examples:     {}", result.examples);
    println!("  Throughput:   {:.2} examples/sec", result.throughput);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    println!("=== Streaming Example Handoff Benchmarks ===");

    let config = BenchConfig::default();

    print_result(&bench_matrix_stream(&config).context("in-memory stream benchmark failed")?);
    print_result(&bench_text_stream(&config).context("text stream benchmark failed")?);

    // An SVMLight file given on the command line is streamed from disk
    if let Some(path) = std::env::args().nth(1) {
        let result = bench_file_stream(&path, &config).with_context(|| format!("failed to stream {path}"))?;
        print_result(&result);
    }

    println!("\n=== Parser Buffer Depth ===");
    for result in compare_buffer_depths(&config, &[0, 1, 4, 64])? {
        println!("\n{}", result.name);
        println!("  Average time: {:?}", result.avg_time);
        println!("  Throughput:   {:.2} examples/sec", result.throughput);
    }

    Ok(())
}
