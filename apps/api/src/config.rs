use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

/// Environment variable names of the provider API keys.
pub const PROVIDER_SECRET_NAMES: [&str; 4] = [
    "GROQ_API_KEY",
    "TOGETHER_API_KEY",
    "OPENROUTER_API_KEY",
    "HUGGINGFACE_API_KEY",
];

const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Upper bound on `LLM_MAX_ATTEMPTS`.
pub const MAX_LLM_ATTEMPTS: u32 = 10;

/// A required secret is absent (or blank) in the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not set in the environment")]
pub struct MissingSecret(pub String);

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory holding uploads and rewritten resumes. Never cleaned by this service.
    pub upload_dir: PathBuf,
    pub embedding_model: String,
    /// Local directory with `config.json`, `tokenizer.json` and `model.safetensors`.
    /// When unset the model is fetched from the Hugging Face hub.
    pub embedding_model_dir: Option<PathBuf>,
    pub default_provider: String,
    pub default_model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_attempts: u32,
    /// Gateway that receives every provider's requests instead of the public endpoints.
    pub llm_base_url: Option<String>,
    pub secrets: Secrets,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_model_dir: optional_env("EMBEDDING_MODEL_DIR").map(PathBuf::from),
            default_provider: optional_env("DEFAULT_PROVIDER").unwrap_or_else(|| "groq".to_string()),
            default_model: optional_env("DEFAULT_MODEL")
                .unwrap_or_else(|| "llama3-70b-8192".to_string()),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|| "120".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            llm_max_attempts: parse_max_attempts(
                &optional_env("LLM_MAX_ATTEMPTS").unwrap_or_else(|| "3".to_string()),
            )?,
            llm_base_url: optional_env("LLM_BASE_URL"),
            secrets: Secrets::from_env(),
        })
    }
}

/// Parses `LLM_MAX_ATTEMPTS`, clamped to `1..=MAX_LLM_ATTEMPTS`.
fn parse_max_attempts(raw: &str) -> Result<u32> {
    let attempts = raw
        .trim()
        .parse::<u32>()
        .context("LLM_MAX_ATTEMPTS must be a positive integer")?;
    Ok(attempts.clamp(1, MAX_LLM_ATTEMPTS))
}

/// Reads a named secret from the process environment.
///
/// Secrets are looked up by their variable NAME (e.g. `GROQ_API_KEY`), never by value.
pub fn get_api_key(name: &str) -> Result<String, MissingSecret> {
    optional_env(name).ok_or_else(|| MissingSecret(name.to_string()))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Snapshot of the provider secrets, taken once at startup.
///
/// Absence is only reported when a provider is actually used, so a deployment
/// that never calls HuggingFace does not need `HUGGINGFACE_API_KEY`.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let values = PROVIDER_SECRET_NAMES
            .iter()
            .filter_map(|name| get_api_key(name).ok().map(|v| (name.to_string(), v)))
            .collect();
        Self { values }
    }

    #[cfg(test)]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(_, v)| !v.trim().is_empty())
                .collect(),
        }
    }

    pub fn require(&self, name: &str) -> Result<&str, MissingSecret> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MissingSecret(name.to_string()))
    }
}

// Never print secret values.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Secrets").field("present", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_unset_variable_is_missing_secret() {
        let err = get_api_key("TAILOR_API_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert_eq!(err, MissingSecret("TAILOR_API_TEST_SURELY_UNSET_KEY".to_string()));
        assert!(err.to_string().contains("TAILOR_API_TEST_SURELY_UNSET_KEY"));
    }

    #[test]
    fn test_max_attempts_is_clamped() {
        assert_eq!(parse_max_attempts("3").unwrap(), 3);
        assert_eq!(parse_max_attempts("0").unwrap(), 1);
        assert_eq!(parse_max_attempts("64").unwrap(), MAX_LLM_ATTEMPTS);
        assert!(parse_max_attempts("many").is_err());
    }

    #[test]
    fn test_secrets_require_present_value() {
        let secrets = Secrets::from_pairs([("GROQ_API_KEY", "gsk-test")]);
        assert_eq!(secrets.require("GROQ_API_KEY").unwrap(), "gsk-test");
    }

    #[test]
    fn test_secrets_blank_value_counts_as_missing() {
        let secrets = Secrets::from_pairs([("TOGETHER_API_KEY", "   ")]);
        assert!(secrets.require("TOGETHER_API_KEY").is_err());
    }

    #[test]
    fn test_secrets_debug_hides_values() {
        let secrets = Secrets::from_pairs([("OPENROUTER_API_KEY", "sk-or-very-secret")]);
        let debug = format!("{secrets:?}");
        assert!(debug.contains("OPENROUTER_API_KEY"));
        assert!(!debug.contains("sk-or-very-secret"));
    }
}
