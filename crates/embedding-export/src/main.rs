//! embedding-export: extract a model's token-embedding table as compact
//! bf16 artifacts for in-browser vocabulary and analogy demos.
//!
//! Writes `public/embeddings.bin` and `public/metadata.json` under the
//! output root.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod download;

use config::Config;
use download::{download_model, ModelRequest};
use token_embeddings::{export, CompactEmbeddings, ModelSource, DEFAULT_MODEL};

#[derive(Parser, Debug)]
#[command(name = "embedding-export")]
#[command(about = "Export a filtered bf16 token-embedding table")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the model (if needed) and write the artifacts
    Export {
        /// Hugging Face model repository
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Repository revision (branch, tag or commit)
        #[arg(long, default_value = "main")]
        revision: String,

        /// Use an existing local snapshot instead of downloading
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Directory under which `public/` is written
        #[arg(long, default_value = ".")]
        output_root: PathBuf,
    },

    /// Show the nearest neighbours of a token in exported artifacts
    Inspect {
        /// Token to look up (a leading space marker is added if needed)
        token: String,

        /// Number of neighbours to show
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Directory containing `public/`
        #[arg(long, default_value = ".")]
        output_root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "info,embedding_export=debug,token_embeddings=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Export {
            model,
            revision,
            model_dir,
            output_root,
        } => run_export(&model, &revision, model_dir, output_root).await,
        Command::Inspect {
            token,
            top_k,
            output_root,
        } => run_inspect(&token, top_k, &output_root),
    }
}

async fn run_export(
    model: &str,
    revision: &str,
    model_dir: Option<PathBuf>,
    output_root: PathBuf,
) -> Result<()> {
    info!("Starting embedding extraction process...");

    let model_dir = match model_dir {
        Some(dir) => {
            info!("Using local model snapshot: {}", dir.display());
            dir
        }
        None => {
            let config = Config::from_env()?;
            let request = ModelRequest {
                repo: model,
                revision,
                token: config.hf_token.as_deref(),
            };
            download_model(&request, &config.model_dir(model, revision))
                .await
                .context("Failed to fetch model")?
        }
    };

    let source = ModelSource::new(model_dir, model);
    let model = model.to_string();
    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let inputs = source
            .get()
            .with_context(|| format!("Failed to load {}", model))?;
        export(inputs, &output_root).context("Failed to write embedding artifacts")
    })
    .await??;

    info!(
        "Embedding extraction complete! {} of {} tokens kept ({} bytes)",
        report.vocab_size, report.original_vocab_size, report.bytes_written
    );
    Ok(())
}

fn run_inspect(token: &str, top_k: usize, output_root: &Path) -> Result<()> {
    let embeddings = CompactEmbeddings::open(output_root).context("Failed to open artifacts")?;
    let metadata = embeddings.metadata();
    info!(
        "Loaded {} tokens x {} dims from {}",
        metadata.vocab_size, metadata.embedding_dim, metadata.original_model
    );

    let neighbours = embeddings.most_similar(token, top_k)?;
    if neighbours.is_empty() {
        anyhow::bail!("{:?} is not in the exported vocabulary", token);
    }

    for (neighbour, similarity) in neighbours {
        println!("{:>8.4}  {}", similarity, neighbour);
    }
    Ok(())
}
