//! Model downloading from Hugging Face.
//!
//! Only the files needed to read the token-embedding table are fetched:
//! config, tokenizer, special-token map and the one weight shard holding
//! `model.embed_tokens.weight`. Files already on disk are reused.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use token_embeddings::{shard_for_tensor, EMBED_TOKENS_TENSOR};

const HF_BASE_URL: &str = "https://huggingface.co";

/// Files every snapshot needs.
const REQUIRED_FILES: &[&str] = &["config.json", "tokenizer.json"];

/// Files fetched when the repository has them.
const OPTIONAL_FILES: &[&str] = &["special_tokens_map.json"];

const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";
const SINGLE_WEIGHTS_FILE: &str = "model.safetensors";

/// Where and how to fetch a model snapshot.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub repo: &'a str,
    pub revision: &'a str,
    pub token: Option<&'a str>,
}

impl ModelRequest<'_> {
    fn url(&self, file: &str) -> String {
        format!("{}/{}/resolve/{}/{}", HF_BASE_URL, self.repo, self.revision, file)
    }
}

enum Fetched {
    Downloaded,
    Cached,
    NotFound,
}

/// Download the files needed for embedding export into `model_dir`.
///
/// Returns the path to the model directory.
pub async fn download_model(request: &ModelRequest<'_>, model_dir: &Path) -> Result<PathBuf> {
    // Create model directory if needed
    if !model_dir.exists() {
        fs::create_dir_all(model_dir).await?;
        tracing::info!("Created model directory: {}", model_dir.display());
    }

    let client = build_client(request.token)?;
    tracing::info!("Fetching {} ({}) from Hugging Face...", request.repo, request.revision);

    for file in REQUIRED_FILES {
        match fetch(&client, request, file, model_dir).await? {
            Fetched::NotFound => anyhow::bail!("{} has no {}", request.repo, file),
            Fetched::Downloaded | Fetched::Cached => {}
        }
    }

    for file in OPTIONAL_FILES {
        if let Fetched::NotFound = fetch(&client, request, file, model_dir).await? {
            tracing::debug!("{} not present in {}", file, request.repo);
        }
    }

    // Sharded checkpoints: fetch only the shard with the embedding table.
    let weights_file = match fetch(&client, request, WEIGHTS_INDEX_FILE, model_dir).await? {
        Fetched::NotFound => SINGLE_WEIGHTS_FILE.to_string(),
        Fetched::Downloaded | Fetched::Cached => {
            let index = fs::read_to_string(model_dir.join(WEIGHTS_INDEX_FILE)).await?;
            shard_for_tensor(&index, EMBED_TOKENS_TENSOR)?
        }
    };

    match fetch(&client, request, &weights_file, model_dir).await? {
        Fetched::NotFound => anyhow::bail!("{} has no {}", request.repo, weights_file),
        Fetched::Downloaded => tracing::info!("Model download complete!"),
        Fetched::Cached => tracing::info!("Model already downloaded"),
    }

    Ok(model_dir.to_path_buf())
}

fn build_client(token: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = token {
        let value: reqwest::header::HeaderValue = format!("Bearer {}", token)
            .parse()
            .context("HF_TOKEN is not a valid header value")?;
        headers.insert(reqwest::header::AUTHORIZATION, value);
    }

    Ok(reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers(headers)
        .build()?)
}

/// Files at or below this size are treated as failed downloads.
const MIN_CACHED_SIZE: u64 = 100;

/// Check whether a previously downloaded file can be reused.
async fn is_cached(path: &Path) -> bool {
    matches!(
        fs::metadata(path).await,
        Ok(meta) if meta.is_file() && meta.len() > MIN_CACHED_SIZE
    )
}

async fn fetch(
    client: &reqwest::Client,
    request: &ModelRequest<'_>,
    file: &str,
    model_dir: &Path,
) -> Result<Fetched> {
    let dest = model_dir.join(file);
    if is_cached(&dest).await {
        tracing::debug!("{} already exists, skipping", file);
        return Ok(Fetched::Cached);
    }

    let url = request.url(file);
    tracing::info!("Downloading {}...", file);
    download_file(client, &url, &dest)
        .await
        .with_context(|| format!("Failed to download {}", file))
}

/// Stream a single file to `dest`, via a `.part` file so an interrupted
/// download is never mistaken for a cached one.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<Fetched> {
    let response = client.get(url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(Fetched::NotFound);
    }
    let response = response
        .error_for_status()
        .with_context(|| format!("HTTP error downloading {}", url))?;

    let total_size = response.content_length();
    let mut stream = response.bytes_stream();

    let partial = partial_path(dest);
    let mut file = File::create(&partial).await?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        // Log progress for large files
        if let Some(total) = total_size {
            if total > 1_000_000 && downloaded % 100_000_000 < chunk.len() as u64 {
                let percent = (downloaded as f64 / total as f64) * 100.0;
                tracing::info!("  Progress: {:.1}%", percent);
            }
        }
    }

    file.flush().await?;
    drop(file);
    fs::rename(&partial, dest).await?;
    Ok(Fetched::Downloaded)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
