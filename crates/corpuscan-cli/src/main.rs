//! corpuscan CLI — extract image quality metrics and analyze the corpus table.

use clap::{Args, Parser, Subcommand};
use corpuscan_core::analyze::{AnalysisReport, Corpus, DEFAULT_METRICS};
use corpuscan_core::extract::ExtractConfig;
use corpuscan_core::record::{Metric, HEADER};
use corpuscan_core::scan::scan_corpus;
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "corpuscan")]
#[command(
    about = "Extract per-image quality/texture/geometry metrics from patient image folders and analyze the resulting table"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a corpus root and append one metric record per image to a CSV table.
    Extract(CliExtractArgs),

    /// Analyze an extracted table: summaries, outliers, correlations, palette.
    Analyze(CliAnalyzeArgs),

    /// Print the table column schema.
    Schema,
}

#[derive(Debug, Clone, Args)]
struct CliExtractArgs {
    /// Root directory holding one subdirectory per patient case.
    #[arg(long)]
    root: PathBuf,

    /// Path of the CSV table to write (recreated from scratch each run).
    #[arg(long)]
    out: PathBuf,

    /// Seed for the per-image dominant-color clustering.
    #[arg(long, default_value = "0")]
    color_seed: u64,

    /// Gaussian sigma of the denoised reference for the noise metric.
    #[arg(long, default_value = "1.5")]
    denoise_sigma: f32,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path of the extracted CSV table.
    #[arg(long)]
    table: PathBuf,

    /// Comma-separated metric columns to analyze
    /// (default: Brightness, Contrast, Sharpness, Texture Contrast).
    #[arg(long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Metric pair for the Pearson/Spearman test, as "X:Y".
    #[arg(long, default_value = "Brightness:Texture Contrast")]
    pair: String,

    /// Number of palette clusters over the first dominant color.
    #[arg(long, default_value = "5")]
    clusters: usize,

    /// Seed for the palette clustering.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Also write the full report as pretty JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => run_extract(&args),
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Schema => run_schema(),
    }
}

// ── extract ────────────────────────────────────────────────────────────────

fn run_extract(args: &CliExtractArgs) -> CliResult<()> {
    tracing::info!("Scanning corpus root: {}", args.root.display());

    let config = ExtractConfig {
        color_seed: args.color_seed,
        denoise_sigma: args.denoise_sigma,
        ..Default::default()
    };
    let summary = scan_corpus(&args.root, &args.out, &config)?;

    tracing::info!(
        "Extraction complete: {} records from {} folders ({} skipped)",
        summary.images_written,
        summary.patient_folders,
        summary.images_skipped,
    );
    println!("corpuscan extraction summary");
    println!("  patient folders:  {}", summary.patient_folders);
    println!("  records written:  {}", summary.images_written);
    println!("  images skipped:   {}", summary.images_skipped);
    println!("  table:            {}", args.out.display());

    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let metrics = parse_metrics(&args.metrics)?;
    let pair = parse_pair(&args.pair)?;

    tracing::info!("Loading table: {}", args.table.display());
    let corpus = Corpus::load(&args.table)?;
    tracing::info!("Loaded {} records", corpus.len());

    let report = corpus.report(&metrics, pair, args.clusters, args.seed)?;
    print_report(&report);

    if let Some(json_path) = &args.json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(json_path, &json)?;
        tracing::info!("Report written to {}", json_path.display());
    }

    Ok(())
}

fn parse_metrics(names: &[String]) -> CliResult<Vec<Metric>> {
    if names.is_empty() {
        return Ok(DEFAULT_METRICS.to_vec());
    }
    names
        .iter()
        .map(|name| name.parse::<Metric>().map_err(CliError::from))
        .collect()
}

fn parse_pair(spec: &str) -> CliResult<(Metric, Metric)> {
    let (x, y) = spec
        .split_once(':')
        .ok_or_else(|| -> CliError { format!("expected \"X:Y\", got {:?}", spec).into() })?;
    Ok((x.parse::<Metric>()?, y.parse::<Metric>()?))
}

fn print_report(report: &AnalysisReport) {
    println!("corpuscan analysis ({} records)", report.n_records);

    println!("\nDescriptive statistics:");
    println!(
        "  {:<22} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "metric", "count", "mean", "std", "min", "q25", "median", "q75", "max"
    );
    for row in &report.summary {
        let s = &row.stats;
        println!(
            "  {:<22} {:>6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            row.metric, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        );
    }

    println!("\nIQR outlier counts:");
    for row in &report.outlier_counts {
        println!("  {:<22} {}", row.metric, row.count);
    }

    println!("\nPearson correlation matrix:");
    print!("  {:<22}", "");
    for name in &report.correlation.metrics {
        print!(" {:>20}", name);
    }
    println!();
    for (name, row) in report
        .correlation
        .metrics
        .iter()
        .zip(&report.correlation.pearson)
    {
        print!("  {:<22}", name);
        for r in row {
            print!(" {:>20.3}", r);
        }
        println!();
    }

    println!(
        "\nCorrelation {} vs {}: pearson={:.3} spearman={:.3}",
        report.pair.x, report.pair.y, report.pair.pearson, report.pair.spearman
    );

    println!("\nMost common dominant colors:");
    for hex in &report.palette {
        println!("  {}", hex);
    }
}

// ── schema ─────────────────────────────────────────────────────────────────

fn run_schema() -> CliResult<()> {
    println!("corpuscan table schema");
    for (i, column) in HEADER.iter().enumerate() {
        println!("  {:>2}  {}", i + 1, column);
    }
    Ok(())
}
