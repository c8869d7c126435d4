//! CLI command definitions for sas-subset.
//!
//! `select` runs augmentation similarity selection over a partitioned
//! collection described by JSON files; `random` draws a uniform baseline
//! subset of the same shape.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use ndarray::Array2;
use serde::Serialize;
use tracing::info;

use crate::config::SelectionConfig;
use crate::selection::{
    EncodedDistances, HashingTextEncoder, LatentClassPartition, PartitionId, PrecomputedDistances,
    PrecomputedEncoder,
};
use crate::subset::{save_indices, SubsetDataset};

/// Subset selection for training data by augmentation similarity.
#[derive(Parser)]
#[command(name = "sas-subset")]
#[command(about = "Select a representative training subset per latent class")]
#[command(version)]
#[command(
    long_about = "sas-subset ranks the members of every latent class by how well they cover their class under an augmentation similarity matrix, and keeps the top fraction of each class.\n\nExample usage:\n  sas-subset select --partition partition.json --embeddings embeddings.json --fraction 0.3 --output subset.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Select a subset by augmentation similarity coverage.
    Select(SelectArgs),

    /// Draw a uniform random subset.
    Random(RandomArgs),
}

/// Arguments for `sas-subset select`.
#[derive(Parser, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["distances", "embeddings", "texts"])
))]
pub struct SelectArgs {
    /// JSON object mapping class id to member indices.
    #[arg(short = 'p', long)]
    pub partition: PathBuf,

    /// JSON object mapping class id to its precomputed similarity matrix.
    #[arg(long)]
    pub distances: Option<PathBuf>,

    /// JSON array of precomputed vectors, one per collection item.
    #[arg(long)]
    pub embeddings: Option<PathBuf>,

    /// JSON array of texts, encoded with feature hashing.
    #[arg(long)]
    pub texts: Option<PathBuf>,

    /// YAML configuration file. Without it, SAS_* environment variables apply.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Fraction of each class to keep, in (0, 1].
    #[arg(short = 'f', long)]
    pub fraction: Option<f64>,

    /// Minimum similarity counted as coverage.
    #[arg(short = 't', long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Block size for pairwise similarity and encoding batches.
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Number of selection runs requested.
    #[arg(long)]
    pub num_runs: Option<usize>,

    /// Dimension of hashed text vectors.
    #[arg(long, default_value = "128")]
    pub text_dimension: usize,

    /// Report per-class progress.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Output file for the selected index list.
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Print a JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `sas-subset random`.
#[derive(Parser, Debug)]
pub struct RandomArgs {
    /// Number of items in the collection.
    #[arg(short = 'n', long)]
    pub size: usize,

    /// Fraction of the collection to keep, in (0, 1].
    #[arg(short = 'f', long)]
    pub fraction: f64,

    /// Seed for a reproducible sample.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Output file for the selected index list.
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Print a JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Summary printed with `--json`.
#[derive(Debug, Serialize)]
struct SubsetSummary {
    output: String,
    subset_size: usize,
    discarded: usize,
    subset_fraction: f64,
}

/// Parse command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For control over logging initialization, use `parse_cli()` and
/// `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Select(args) => run_select_command(args).await,
        Commands::Random(args) => run_random_command(args).await,
    }
}

// ============================================================================
// Select
// ============================================================================

async fn run_select_command(args: SelectArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let partition = load_partition(&args.partition)?;

    info!(
        classes = partition.len(),
        members = partition.total_members(),
        fraction = config.subset_fraction,
        threshold = config.threshold,
        num_runs = config.num_runs,
        "Starting subset selection"
    );

    let source = if let Some(path) = &args.distances {
        SelectionInput::Distances(load_distances(path)?)
    } else if let Some(path) = &args.embeddings {
        SelectionInput::Embeddings(read_json(path)?)
    } else if let Some(path) = &args.texts {
        SelectionInput::Texts(read_json(path)?)
    } else {
        anyhow::bail!("One of --distances, --embeddings or --texts is required");
    };

    let text_dimension = args.text_dimension;
    let selection_config = config.clone();
    let (indices, discarded) = tokio::task::spawn_blocking(move || {
        source.select(&partition, &selection_config, text_dimension)
    })
    .await
    .context("Selection task panicked")??;

    save_indices(&args.output, &indices)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        subset_size = indices.len(),
        discarded,
        output = %args.output.display(),
        "Subset selection complete"
    );

    if args.json {
        print_summary(&SubsetSummary {
            output: args.output.display().to_string(),
            subset_size: indices.len(),
            discarded,
            subset_fraction: config.subset_fraction,
        })?;
    }

    Ok(())
}

/// File, then environment, then flags.
fn resolve_config(args: &SelectArgs) -> anyhow::Result<SelectionConfig> {
    let mut config = match &args.config {
        Some(path) => SelectionConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SelectionConfig::from_env().context("Invalid SAS_* environment")?,
    };

    if let Some(fraction) = args.fraction {
        config = config.with_subset_fraction(fraction);
    }
    if let Some(threshold) = args.threshold {
        config = config.with_threshold(threshold);
    }
    if let Some(block_size) = args.block_size {
        config = config.with_block_size(block_size);
    }
    if let Some(num_runs) = args.num_runs {
        config = config.with_num_runs(num_runs);
    }
    if args.verbose {
        config = config.with_verbose(true);
    }

    config.validate()?;
    Ok(config)
}

/// Where the similarity matrices come from.
enum SelectionInput {
    Distances(PrecomputedDistances),
    Embeddings(Vec<Vec<f64>>),
    Texts(Vec<String>),
}

impl SelectionInput {
    fn select(
        self,
        partition: &LatentClassPartition,
        config: &SelectionConfig,
        text_dimension: usize,
    ) -> anyhow::Result<(Vec<usize>, usize)> {
        match self {
            SelectionInput::Distances(distances) => {
                let size = partition
                    .iter()
                    .flat_map(|(_, members)| members.iter().copied())
                    .max()
                    .map_or(0, |max| max + 1);
                let subset = SubsetDataset::sas(0..size, partition, &distances, config)?;
                Ok((subset.indices().to_vec(), subset.discarded()))
            }
            SelectionInput::Embeddings(vectors) => {
                let dimension = vectors.first().map_or(0, Vec::len);
                let source = EncodedDistances::new(PrecomputedEncoder::new(dimension));
                let subset = SubsetDataset::sas(vectors, partition, &source, config)?;
                Ok((subset.indices().to_vec(), subset.discarded()))
            }
            SelectionInput::Texts(texts) => {
                let source = EncodedDistances::new(HashingTextEncoder::new(text_dimension));
                let subset = SubsetDataset::sas(texts, partition, &source, config)?;
                Ok((subset.indices().to_vec(), subset.discarded()))
            }
        }
    }
}

fn load_partition(path: &Path) -> anyhow::Result<LatentClassPartition> {
    read_json(path)
}

/// Reads `{"<id>": [[...], ...]}` into one matrix per class.
fn load_distances(path: &Path) -> anyhow::Result<PrecomputedDistances> {
    let raw: BTreeMap<PartitionId, Vec<Vec<f64>>> = read_json(path)?;
    let mut distances = PrecomputedDistances::default();
    for (id, rows) in raw {
        let matrix = rows_to_matrix(rows)
            .with_context(|| format!("Invalid distance matrix for class {}", id))?;
        distances.insert(id, matrix);
    }
    Ok(distances)
}

fn rows_to_matrix(rows: Vec<Vec<f64>>) -> anyhow::Result<Array2<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != ncols) {
        anyhow::bail!("Ragged rows: expected {} columns, found {}", ncols, row.len());
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((nrows, ncols), flat)?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
}

fn print_summary(summary: &SubsetSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// Random
// ============================================================================

async fn run_random_command(args: RandomArgs) -> anyhow::Result<()> {
    let subset = SubsetDataset::random(0..args.size, args.fraction, args.seed)?;
    subset
        .save_indices(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        subset_size = subset.len(),
        discarded = subset.discarded(),
        output = %args.output.display(),
        "Random subset complete"
    );

    if args.json {
        print_summary(&SubsetSummary {
            output: args.output.display().to_string(),
            subset_size: subset.len(),
            discarded: subset.discarded(),
            subset_fraction: subset.subset_fraction(),
        })?;
    }

    Ok(())
}
