//! Loading the tokenizer vocabulary and token-embedding table from a
//! Hugging Face model snapshot.

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::matrix::EmbeddingMatrix;
use crate::metadata::SpecialTokens;
use crate::{Vocabulary, SPACE_MARKER};

/// Name of the token-embedding weight in Llama/Mistral checkpoints.
pub const EMBED_TOKENS_TENSOR: &str = "model.embed_tokens.weight";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const SPECIAL_TOKENS_FILE: &str = "special_tokens_map.json";
const SINGLE_WEIGHTS_FILE: &str = "model.safetensors";
const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";

/// Everything the export needs from the upstream model.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub vocabulary: Vocabulary,
    pub special_tokens: SpecialTokens,
    pub embedding: EmbeddingMatrix,
    pub space_marker: char,
    /// Provenance recorded in the metadata, e.g. `mistralai/Mistral-7B-v0.1`.
    pub model_name: String,
}

/// The subset of `config.json` used to shape the embedding tensor.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    vocab_size: usize,
    hidden_size: usize,
}

#[derive(Debug, Deserialize)]
struct WeightsIndex {
    weight_map: HashMap<String, String>,
}

/// Load-once handle over a model directory.
///
/// The first `get()` reads the snapshot; later calls return the same
/// inputs. There is no invalidation.
pub struct ModelSource {
    model_dir: PathBuf,
    model_name: String,
    inputs: OnceCell<ModelInputs>,
}

impl ModelSource {
    pub fn new(model_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Self {
        Self {
            model_dir: model_dir.into(),
            model_name: model_name.into(),
            inputs: OnceCell::new(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn is_loaded(&self) -> bool {
        self.inputs.get().is_some()
    }

    /// Load the model on first use and return the cached inputs.
    pub fn get(&self) -> Result<&ModelInputs> {
        self.inputs
            .get_or_try_init(|| load_model_inputs(&self.model_dir, &self.model_name))
    }
}

/// Read vocabulary, special tokens and the embedding table from `model_dir`.
///
/// # Expected files
/// - `config.json` - provides `vocab_size` and `hidden_size`
/// - `tokenizer.json` - tokenizer with the vocabulary
/// - `special_tokens_map.json` - optional role → token mapping
/// - `model.safetensors`, or `model.safetensors.index.json` plus the shard
///   holding `model.embed_tokens.weight`
pub fn load_model_inputs(model_dir: &Path, model_name: &str) -> Result<ModelInputs> {
    tracing::info!("Loading tokenizer from {}", model_dir.display());
    let vocabulary = load_vocabulary(&model_dir.join(TOKENIZER_FILE))?;
    let special_tokens = load_special_tokens(&model_dir.join(SPECIAL_TOKENS_FILE))?;

    tracing::info!("Loading token embeddings...");
    let embedding = load_embedding(model_dir)?;
    tracing::debug!(
        "Embedding table: {} rows x {} dims",
        embedding.rows(),
        embedding.dim()
    );

    Ok(ModelInputs {
        vocabulary,
        special_tokens,
        embedding,
        space_marker: SPACE_MARKER,
        model_name: model_name.to_string(),
    })
}

fn load_vocabulary(path: &Path) -> Result<Vocabulary> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    let tokenizer = tokenizers::Tokenizer::from_file(path)
        .map_err(|e| Error::Tokenizer(e.to_string()))?;
    Ok(tokenizer.get_vocab(true))
}

fn load_special_tokens(path: &Path) -> Result<SpecialTokens> {
    if !path.exists() {
        tracing::debug!("No {} found, recording no special tokens", SPECIAL_TOKENS_FILE);
        return Ok(SpecialTokens::new());
    }
    let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_special_tokens(&json)
}

/// Parse `special_tokens_map.json`.
///
/// Values are either plain strings or `{ "content": ... }` objects; list
/// roles such as `additional_special_tokens` are skipped.
pub(crate) fn parse_special_tokens(json: &str) -> Result<SpecialTokens> {
    let map: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut special = SpecialTokens::new();
    for (role, value) in map {
        let token = match &value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(obj) => obj
                .get("content")
                .and_then(|c| c.as_str())
                .map(str::to_string),
            _ => None,
        };
        match token {
            Some(token) => {
                special.insert(role, token);
            }
            None => tracing::debug!("Skipping special token role {}", role),
        }
    }
    Ok(special)
}

/// Find the file holding `tensor` in a sharded checkpoint's index.
pub fn shard_for_tensor(index_json: &str, tensor: &str) -> Result<String> {
    let index: WeightsIndex = serde_json::from_str(index_json)?;
    index.weight_map.get(tensor).cloned().ok_or_else(|| {
        Error::InvalidMetadata(format!("{} not listed in {}", tensor, WEIGHTS_INDEX_FILE))
    })
}

fn weights_path(model_dir: &Path) -> Result<PathBuf> {
    let single = model_dir.join(SINGLE_WEIGHTS_FILE);
    if single.exists() {
        return Ok(single);
    }

    let index_path = model_dir.join(WEIGHTS_INDEX_FILE);
    if !index_path.exists() {
        return Err(Error::MissingFile(single));
    }
    let index_json = fs::read_to_string(&index_path).map_err(|e| Error::io(&index_path, e))?;
    let shard = model_dir.join(shard_for_tensor(&index_json, EMBED_TOKENS_TENSOR)?);
    if !shard.exists() {
        return Err(Error::MissingFile(shard));
    }
    Ok(shard)
}

fn load_embedding(model_dir: &Path) -> Result<EmbeddingMatrix> {
    let config_path = model_dir.join(CONFIG_FILE);
    let config_json = fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
    let config: ModelConfig = serde_json::from_str(&config_json)?;

    let weights = weights_path(model_dir)?;
    tracing::debug!("Reading {} from {}", EMBED_TOKENS_TENSOR, weights.display());

    // Checkpoints are usually bf16 on disk; VarBuilder widens to F32.
    // SAFETY: the file is not modified while mapped.
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &Device::Cpu)? };
    let tensor = vb.get((config.vocab_size, config.hidden_size), EMBED_TOKENS_TENSOR)?;
    let data = tensor.flatten_all()?.to_vec1::<f32>()?;

    EmbeddingMatrix::new(data, config.vocab_size, config.hidden_size)
}
