use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bfsi_core::{
    evaluate_routes, load_documents, ChunkStore, EmbeddingProvider, HashEmbeddingProvider,
    MiniLmEmbeddingProvider, Pipeline, PipelineConfig, RouteCase,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bfsi")]
#[command(about = "BFSI assistant query resolution pipeline")]
struct Cli {
    /// Path to the all-MiniLM-L6-v2 safetensors weights. Uses the
    /// deterministic hash embedder when absent.
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    /// Path to tokenizer.json. Required when --model-path is set.
    #[arg(long, global = true)]
    tokenizer_path: Option<PathBuf>,

    /// Optional pipeline configuration JSON; defaults apply otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the vector store artifact from the document corpus.
    BuildStore {
        /// Directory holding the .txt/.md/.pdf corpus.
        #[arg(long)]
        data_dir: PathBuf,
        /// Artifact path to (over)write.
        #[arg(long)]
        output: PathBuf,
    },
    /// Resolve one query through the full pipeline.
    Query {
        /// Curated answer artifact (alpaca JSON array).
        #[arg(long)]
        dataset: PathBuf,
        /// Document corpus directory, used only if the store is missing.
        #[arg(long)]
        data_dir: PathBuf,
        /// Vector store artifact path.
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        question: String,
    },
    /// Run end-to-end routing cases and report pass/fail.
    Eval {
        #[arg(long)]
        dataset: PathBuf,
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        store: PathBuf,
        /// Routing cases (JSON array of RouteCase).
        #[arg(long)]
        cases: PathBuf,
    },
}

fn make_embedder(
    cli: &Cli,
    config: &PipelineConfig,
) -> Result<Box<dyn EmbeddingProvider + Send + Sync>> {
    match (&cli.model_path, &cli.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            eprintln!("Loading model from {} ...", model.display());
            let provider = MiniLmEmbeddingProvider::load(model, tokenizer)?;
            eprintln!("Model loaded.");
            Ok(Box::new(provider))
        }
        (None, None) => Ok(Box::new(HashEmbeddingProvider::new(config.embedding_dim))),
        _ => bail!("--model-path and --tokenizer-path must both be provided"),
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    match &cli.config {
        Some(path) => Ok(PipelineConfig::from_json_file(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_route_cases(path: &Path) -> Result<Vec<RouteCase>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let cases: Vec<RouteCase> =
        serde_json::from_reader(file).context("parse routing cases json")?;
    Ok(cases)
}

fn load_pipeline(
    cli: &Cli,
    dataset: &Path,
    data_dir: &Path,
    store: &Path,
) -> Result<Pipeline> {
    let config = load_config(cli)?;
    let embedder = make_embedder(cli, &config)?;
    Ok(Pipeline::load(embedder, dataset, data_dir, store, config)?)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::BuildStore { data_dir, output } => {
            let config = load_config(&cli)?;
            let embedder = make_embedder(&cli, &config)?;

            let documents = load_documents(data_dir)?;
            if documents.is_empty() {
                bail!("no usable documents in {}", data_dir.display());
            }
            let store = ChunkStore::build(&documents, &config, &embedder)?;
            store.save_artifact(output, config.embedding_dim)?;

            println!(
                "documents={} chunks={} output={}",
                documents.len(),
                store.len(),
                output.display()
            );
        }
        Commands::Query {
            dataset,
            data_dir,
            store,
            question,
        } => {
            let pipeline = load_pipeline(&cli, dataset, data_dir, store)?;
            let answer = pipeline.resolve(question);

            println!(
                "source={} confidence={}",
                answer.source,
                answer
                    .confidence
                    .map(|c| format!("{c:.4}"))
                    .unwrap_or_else(|| "null".to_string())
            );
            println!("{}", answer.rendered());
        }
        Commands::Eval {
            dataset,
            data_dir,
            store,
            cases,
        } => {
            let pipeline = load_pipeline(&cli, dataset, data_dir, store)?;
            let cases = read_route_cases(cases)?;
            let summary = evaluate_routes(&pipeline, &cases);

            for outcome in &summary.outcomes {
                println!(
                    "case={} passed={} source={} confidence={} latency={:.1}ms",
                    outcome.case_id,
                    outcome.passed,
                    outcome.actual_source,
                    outcome
                        .confidence
                        .map(|c| format!("{c:.4}"))
                        .unwrap_or_else(|| "null".to_string()),
                    outcome.latency_ms
                );
            }
            println!(
                "total={} passed={} failed={} pass_rate={:.4}",
                summary.total, summary.passed, summary.failed, summary.pass_rate
            );
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
