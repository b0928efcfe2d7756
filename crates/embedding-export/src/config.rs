use std::path::PathBuf;

/// Export configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root for downloaded model snapshots
    pub cache_dir: PathBuf,
    /// Hugging Face access token (needed for gated models such as Mistral)
    pub hf_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `EMBEDDING_EXPORT_CACHE_DIR`: where model files are cached (supports ~ for home directory).
    ///   Defaults to `<platform cache dir>/embedding-export`.
    /// - `HF_TOKEN`: Hugging Face access token
    pub fn from_env() -> Result<Self, ConfigError> {
        let cache_dir = match std::env::var("EMBEDDING_EXPORT_CACHE_DIR") {
            Ok(path) if !path.is_empty() => expand_tilde(&path),
            _ => dirs::cache_dir()
                .ok_or(ConfigError::NoCacheDir)?
                .join("embedding-export"),
        };

        let hf_token = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            cache_dir,
            hf_token,
        })
    }

    /// Directory holding the snapshot of `repo` at `revision`.
    pub fn model_dir(&self, repo: &str, revision: &str) -> PathBuf {
        self.cache_dir
            .join("models")
            .join(repo.replace('/', "--"))
            .join(revision)
    }
}

/// Expand ~ or ~/ prefix to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No platform cache directory; set EMBEDDING_EXPORT_CACHE_DIR")]
    NoCacheDir,
}
