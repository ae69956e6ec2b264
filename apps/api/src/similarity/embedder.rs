//! Sentence embedding with candle and a BERT-family encoder (default: all-MiniLM-L6-v2).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::similarity::{cosine_score, l2_normalize, mean_pool, SimilarityError, SimilarityScorer};

/// Used when `config.json` does not carry `max_position_embeddings`.
const FALLBACK_MAX_SEQUENCE_LENGTH: usize = 512;

pub struct Embedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl Embedder {
    /// Loads the encoder from the Hugging Face hub, downloading it if not cached.
    pub fn from_hf(repo_id: &str) -> Result<Self> {
        info!("Loading embedding model from hub: {repo_id}");
        let api = Api::new().context("Failed to create HuggingFace API")?;
        let repo = api.model(repo_id.to_string());

        let files = ModelFiles {
            config: repo.get("config.json").context("Failed to get config.json")?,
            tokenizer: repo
                .get("tokenizer.json")
                .context("Failed to get tokenizer.json")?,
            weights: repo
                .get("model.safetensors")
                .context("Failed to get model.safetensors")?,
        };
        Self::load(files)
    }

    /// Loads the encoder from a local directory.
    pub fn from_path(model_dir: &Path) -> Result<Self> {
        info!("Loading embedding model from {}", model_dir.display());
        Self::load(ModelFiles {
            config: model_dir.join("config.json"),
            tokenizer: model_dir.join("tokenizer.json"),
            weights: model_dir.join("model.safetensors"),
        })
    }

    fn load(files: ModelFiles) -> Result<Self> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("Failed to read {}", files.config.display()))?;
        let config: Config =
            serde_json::from_str(&raw_config).context("Failed to parse config.json")?;
        let max_length = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("max_position_embeddings")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(FALLBACK_MAX_SEQUENCE_LENGTH);

        let mut tokenizer =
            Tokenizer::from_file(&files.tokenizer).map_err(|e| anyhow::anyhow!("{}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Invalid truncation config: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DTYPE, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &config).context("Failed to load BERT model")?;

        info!(max_length, "Embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Mean-pooled, L2-normalised embeddings for a batch of texts.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SimilarityError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| SimilarityError::Tokenizer(e.to_string()))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let flatten = |field: fn(&Encoding) -> &[u32]| -> Vec<u32> {
            encodings.iter().flat_map(|e| field(e).iter().copied()).collect()
        };

        let input_ids =
            Tensor::new(flatten(Encoding::get_ids), &self.device)?.reshape((batch_size, seq_len))?;
        let token_type_ids = Tensor::new(flatten(Encoding::get_type_ids), &self.device)?
            .reshape((batch_size, seq_len))?;
        let attention_mask = Tensor::new(flatten(Encoding::get_attention_mask), &self.device)?
            .reshape((batch_size, seq_len))?;

        let start = std::time::Instant::now();
        let token_embeddings =
            self.model
                .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = mean_pool(&token_embeddings, &attention_mask)?;
        let normalized = l2_normalize(&pooled)?.to_dtype(DType::F32)?;
        let rows: Vec<Vec<f32>> = normalized.to_vec2()?;

        debug!(
            batch_size,
            seq_len,
            elapsed_ms = start.elapsed().as_millis(),
            "Batch embedding complete"
        );

        Ok(rows)
    }
}

impl SimilarityScorer for Embedder {
    fn score(&self, a: &str, b: &str) -> Result<f32, SimilarityError> {
        let embeddings = self.embed_batch(&[a, b])?;
        match embeddings.as_slice() {
            [first, second] => Ok(cosine_score(first, second)),
            other => Err(SimilarityError::BatchSize {
                expected: 2,
                actual: other.len(),
            }),
        }
    }
}
