use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::thread;

use anyhow::Result;
use clap::Parser;
use docalign_core::align::{self, AlignConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "docalign")]
#[command(
    about = "Pair machine-translated documents with their target-language counterparts",
    long_about = None
)]
struct Cli {
    /// Base64 one-document-per-line file: the machine-translated corpus
    translated_tokens: PathBuf,
    /// Base64 one-document-per-line file: the target-language corpus
    target_tokens: PathBuf,
    /// Token n-gram size
    #[arg(short = 'n', long = "ngram_size", default_value_t = 2)]
    ngram_size: usize,
    /// Distinct n-grams held in memory per document frequency pass
    #[arg(short = 'b', long = "batch_size", default_value_t = 50_000_000)]
    batch_size: usize,
    /// Worker threads per pool (default: all hardware threads)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
    /// Minimum cosine score for a pair to qualify
    #[arg(long, default_value_t = 0.1)]
    threshold: f32,
    /// Minimum number of documents an n-gram must appear in to be counted
    #[arg(long = "min_count", default_value_t = 2)]
    min_count: usize,
    /// Maximum number of documents an n-gram may appear in before it is
    /// pruned from the index
    #[arg(long = "max_count", default_value_t = 1000)]
    max_count: usize,
    /// Print all qualifying scores, not only the best one-to-one pairs
    #[arg(long)]
    all: bool,
    /// Show progress and queue diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(1);
    });

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let jobs = match cli.jobs {
        Some(jobs) => jobs,
        None => thread::available_parallelism().map_or(1, |n| n.get()),
    };

    let config = AlignConfig {
        translated_tokens: cli.translated_tokens,
        target_tokens: cli.target_tokens,
        ngram_size: cli.ngram_size,
        batch_size: cli.batch_size,
        jobs,
        threshold: cli.threshold,
        min_count: cli.min_count,
        max_count: cli.max_count,
        print_all: cli.all,
    };

    align::run(&config, BufWriter::new(io::stdout()))
}
