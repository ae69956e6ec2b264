//! Similarity Scorer: ATS score as the cosine similarity of mean-pooled sentence embeddings.
//!
//! The encoder is loaded once at startup and shared read-only across requests
//! (`Arc<dyn SimilarityScorer>` in `AppState`). Forward passes are CPU-bound and
//! must be called from `tokio::task::spawn_blocking`.

use candle_core::Tensor;
use thiserror::Error;

pub mod embedder;

pub use embedder::Embedder;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    BatchSize { expected: usize, actual: usize },
}

/// Scores how closely two texts match. Implementations must be safe for concurrent use.
pub trait SimilarityScorer: Send + Sync {
    /// Returns a score in `[0, 1]`; `score(a, b) == score(b, a)`.
    fn score(&self, a: &str, b: &str) -> Result<f32, SimilarityError>;
}

/// Masked mean over the token axis.
///
/// `token_embeddings`: `(batch, seq, hidden)`; `attention_mask`: `(batch, seq)`, 1 for real tokens.
pub fn mean_pool(token_embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor, SimilarityError> {
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .to_dtype(token_embeddings.dtype())?
        .broadcast_as(token_embeddings.shape())?;

    let sum_embeddings = (token_embeddings * &mask_expanded)?.sum(1)?;
    let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok((sum_embeddings / sum_mask)?)
}

/// Row-wise L2 normalisation of a `(batch, hidden)` tensor.
pub fn l2_normalize(embeddings: &Tensor) -> Result<Tensor, SimilarityError> {
    let norms = embeddings
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::MAX)?;
    Ok(embeddings.broadcast_div(&norms)?)
}

/// Dot product of two already-normalised vectors, clamped into `[0, 1]`.
pub fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    if dot.is_nan() {
        return 0.0;
    }
    dot.clamp(0.0, 1.0)
}
