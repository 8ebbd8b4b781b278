//! Sentence embeddings for rule chunks.
//!
//! [`BertEmbedder`] runs all-MiniLM-L6-v2 (a BERT encoder) with candle from a
//! local model directory; vectors are mean pooled over the attention mask and
//! L2-normalized so cosine similarity reduces to a dot product.
//! [`FakeEmbedder`] is a deterministic hash embedder for tests and dry runs
//! (`APP_USE_FAKE_EMBEDDINGS=1` or `embedding.use_fake = true`).
//!
//! Model loading is expensive, so callers go through [`shared_embedder`], which
//! loads once per process and hands out the same handle afterwards.
use anyhow::{anyhow, Context};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use ruleseer_core::config::{expand_path, EmbeddingSettings};
use ruleseer_core::error::{Error, Result};
use ruleseer_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch_on_device;

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    pad_id: u32,
}

impl BertEmbedder {
    /// Load tokenizer, config and weights (`model.safetensors` or `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize, batch_size: usize) -> anyhow::Result<Self> {
        let device = device::select_device();
        info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let json: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = json["hidden_size"].as_u64().ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let max_positions = json["max_position_embeddings"].as_u64().unwrap_or(512) as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;

        let model_name = model_dir.file_name().map_or_else(|| DEFAULT_MODEL_NAME.to_string(), |n| n.to_string_lossy().to_string());
        info!(dim, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            id: format!("bert:{model_name}:d{dim}"),
            dim,
            max_len: max_len.min(max_positions),
            batch_size: batch_size.max(1),
            pad_id,
        })
    }

    fn forward_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_batch_on_device(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for sub_batch in texts.chunks(self.batch_size) {
            let vectors = self.forward_batch(sub_batch).map_err(Error::Embedding)?;
            out.extend(vectors);
            if texts.len() > self.batch_size {
                info!("embedded {}/{} texts", out.len(), texts.len());
            }
        }
        check_vectors(texts.len(), self.dim, &out)?;
        Ok(out)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.is_file() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.is_file() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Deterministic bag-of-tokens embedder. Each lowercased token is hashed into
/// one dimension, so texts sharing words land close together.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("fake:xxhash64:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty());
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        if v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Guard against a model that returns the wrong number or shape of vectors.
pub fn check_vectors(expected: usize, dim: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(Error::Embedding(anyhow!("embedder returned {} vectors for {} inputs", vectors.len(), expected)));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::Embedding(anyhow!("dim mismatch: got {} expected {}", bad.len(), dim)));
    }
    Ok(())
}

static SHARED: OnceCell<Arc<dyn Embedder>> = OnceCell::new();

/// Process-wide embedder, constructed on first successful call and reused for
/// the lifetime of the process. A failed load is returned and may be retried.
pub fn shared_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    SHARED.get_or_try_init(|| load_embedder(settings)).map(Arc::clone)
}

/// Build a fresh embedder without touching the shared handle.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_requested(settings) {
        info!("using FakeEmbedder (d{})", settings.fake_dim);
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings).map_err(Error::Embedding)?;
    let embedder = BertEmbedder::load(&model_dir, settings.max_len, settings.batch_size).map_err(Error::Embedding)?;
    Ok(Arc::new(embedder))
}

fn use_fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        warn!("configured model_dir {} does not exist", p.display());
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                info!("using {}: {}", var, p.display());
                return Ok(p);
            }
        }
    }
    for candidate in [format!("models/{DEFAULT_MODEL_NAME}"), format!("../models/{DEFAULT_MODEL_NAME}")] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(anyhow!("Could not locate the {DEFAULT_MODEL_NAME} model directory; set embedding.model_dir or APP_MODEL_DIR"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_dir_is_an_embedding_error() {
        let settings = EmbeddingSettings {
            model_dir: Some("/nonexistent/ruleseer-model".to_string()),
            ..EmbeddingSettings::default()
        };
        if std::env::var("APP_MODEL_DIR").is_ok() || std::env::var("MODEL_DIR").is_ok() || use_fake_requested(&settings) {
            return;
        }
        match load_embedder(&settings) {
            Err(Error::Embedding(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => assert!(Path::new("models").join(DEFAULT_MODEL_NAME).exists(), "loaded without a model dir"),
        }
    }

    #[test]
    fn check_vectors_rejects_short_output() {
        let err = check_vectors(2, 3, &[vec![0.0; 3]]).expect_err("count mismatch");
        assert!(matches!(err, Error::Embedding(_)));
        let err = check_vectors(1, 3, &[vec![0.0; 2]]).expect_err("dim mismatch");
        assert!(err.to_string().contains("dim mismatch"));
    }
}
