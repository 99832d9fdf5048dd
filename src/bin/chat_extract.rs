//! chat-extract: select dataset entries from a natural-language instruction, or score
//! an algorithm against a catalog of test prompts.
//!
//! Usage:
//!   chat-extract select --dataset fruits.yaml "the red ones"
//!   chat-extract eval --catalog catalog.yaml --algorithm json

use ai_chat_extract::eval::{run_catalog, Catalog, Summary};
use ai_chat_extract::selection::{select_entries, Algorithm, Dataset, SelectionOptions};
use ai_chat_extract::ChatEngineBuilder;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-extract", version)]
#[command(about = "Extract validated ID selections from a local language model")]
struct Cli {
    /// Engine config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model service base URL (overrides config and OLLAMA_HOST)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SelectionArgs {
    /// Model id
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// How to steer the model: grammar or json
    #[arg(short, long, global = true, default_value = "grammar")]
    algorithm: Algorithm,

    /// Repair attempts after the first answer
    #[arg(short, long, global = true)]
    retries: Option<u32>,

    /// Abort an answer longer than this many characters
    #[arg(long, global = true)]
    max_length: Option<usize>,

    #[arg(short, long, global = true)]
    temperature: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Select entries for one instruction
    Select {
        /// Dataset file: a YAML/JSON list of labels or {label, description} objects
        #[arg(short, long)]
        dataset: PathBuf,

        /// Natural-language instruction
        instruction: String,
    },

    /// Run a test catalog and report scores
    Eval {
        /// Catalog file (YAML)
        #[arg(long)]
        catalog: PathBuf,

        /// Print per-case reports as JSON
        #[arg(long)]
        json: bool,
    },
}

impl SelectionArgs {
    fn options(&self) -> SelectionOptions {
        SelectionOptions {
            algorithm: self.algorithm,
            examples: Vec::new(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_length: self.max_length,
            retries: self.retries,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = ChatEngineBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.with_config_path(path);
    }
    if let Some(url) = &cli.base_url {
        builder = builder.base_url_override(url);
    }
    let engine = builder.build().context("failed to build chat engine")?;
    let options = cli.selection.options();

    match cli.command {
        Command::Select {
            dataset,
            instruction,
        } => {
            let dataset = Dataset::load(&dataset)
                .with_context(|| format!("failed to load dataset {}", dataset.display()))?;
            let (selected, stats) = select_entries(&engine, &dataset, &instruction, &options).await?;
            for s in &selected {
                println!("{}: {}", s.id, s.entry.label);
            }
            eprintln!(
                "{} entries in {} attempt(s), {} ms",
                selected.len(),
                stats.attempts,
                stats.duration_ms
            );
        }
        Command::Eval { catalog, json } => {
            let catalog = Catalog::load(&catalog)
                .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
            let reports = run_catalog(&engine, &catalog, &options).await;
            let summary = Summary::from_reports(&reports);

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for r in &reports {
                    let status = match (&r.error, r.exact) {
                        (Some(_), _) => "FAIL",
                        (None, true) => "PASS",
                        (None, false) => "PART",
                    };
                    println!(
                        "{status} {:<24} f1={:.2} attempts={}{}",
                        r.name,
                        r.f1,
                        r.attempts,
                        r.error.as_deref().map(|e| format!("  ({e})")).unwrap_or_default()
                    );
                }
            }
            println!(
                "\n{}/{} exact, {} failed, mean f1 {:.3}",
                summary.exact, summary.cases, summary.failed, summary.mean_f1
            );
        }
    }

    Ok(())
}
