#![allow(dead_code)]

use candle_core::{DType, Device, Tensor};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use token_embeddings::{EmbeddingMatrix, ModelInputs, SpecialTokens, Vocabulary, SPACE_MARKER};

/// Toy vocabulary: one special token, two words, one numeric token.
pub const TOY_VOCAB: &[(&str, u32)] = &[("<s>", 0), ("▁cat", 1), ("3x", 2), ("dog", 3)];

pub const TOY_ROWS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, -1.0], [9.0, 9.0], [0.5, 2.0]];

pub fn toy_vocab() -> Vocabulary {
    TOY_VOCAB.iter().map(|(t, id)| (t.to_string(), *id)).collect()
}

pub fn toy_inputs() -> ModelInputs {
    ModelInputs {
        vocabulary: toy_vocab(),
        special_tokens: SpecialTokens::from([("bos_token".to_string(), "<s>".to_string())]),
        embedding: EmbeddingMatrix::from_rows(TOY_ROWS.iter().map(|r| r.to_vec()).collect())
            .expect("Failed to build toy matrix"),
        space_marker: SPACE_MARKER,
        model_name: "toy/model".to_string(),
    }
}

// Shared model snapshot written once for all tests
pub static TOY_MODEL_DIR: Lazy<TempDir> = Lazy::new(|| {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_toy_model(dir.path());
    dir
});

/// Write a minimal Hugging Face style snapshot of the toy model to `dir`.
///
/// Weights are stored as bf16, as real checkpoints are.
pub fn write_toy_model(dir: &Path) {
    let vocab: serde_json::Map<String, serde_json::Value> = TOY_VOCAB
        .iter()
        .map(|(t, id)| (t.to_string(), serde_json::json!(id)))
        .collect();
    let tokenizer = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": null,
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "<s>"
        }
    });
    fs::write(dir.join("tokenizer.json"), tokenizer.to_string()).expect("Failed to write tokenizer.json");

    let config = serde_json::json!({ "vocab_size": 4, "hidden_size": 2, "model_type": "mistral" });
    fs::write(dir.join("config.json"), config.to_string()).expect("Failed to write config.json");

    let special = serde_json::json!({
        "bos_token": "<s>",
        "eos_token": { "content": "</s>", "lstrip": false }
    });
    fs::write(dir.join("special_tokens_map.json"), special.to_string())
        .expect("Failed to write special_tokens_map.json");

    let flat: Vec<f32> = TOY_ROWS.iter().flatten().copied().collect();
    let weights = Tensor::from_vec(flat, (4, 2), &Device::Cpu)
        .and_then(|t| t.to_dtype(DType::BF16))
        .expect("Failed to build weight tensor");
    let tensors = HashMap::from([("model.embed_tokens.weight".to_string(), weights)]);
    candle_core::safetensors::save(&tensors, dir.join("model.safetensors"))
        .expect("Failed to write model.safetensors");
}
