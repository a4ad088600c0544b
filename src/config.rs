use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Values commonly left in checked-in sample configs. Treated as absent so
/// the app degrades to fallbacks instead of sending junk credentials.
const PLACEHOLDER_VALUES: [&str; 4] = ["your-api-key", "your-api-key-here", "changeme", "xxx"];

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || PLACEHOLDER_VALUES.contains(&value.to_ascii_lowercase().as_str())
        || value.to_ascii_lowercase().starts_with("your-")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_freshness_window_secs() -> i64 {
    crate::seed::DEFAULT_FRESHNESS_WINDOW_SECS
}

fn default_remote_timeout_secs() -> u64 {
    10
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Seeding policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Profiles synced within this window are not re-seeded. Arbitrary
    /// policy constant; see the orchestrator.
    pub freshness_window_secs: i64,

    /// Per-request timeout for remote source calls. The upstream sandbox
    /// has no server-side timeout of its own.
    pub remote_timeout_secs: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: default_freshness_window_secs(),
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// Nessie sandbox credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NessieConfig {
    pub api_key: Option<String>,
    /// Pin a sandbox customer instead of taking the first one.
    pub customer_id: Option<String>,
}

/// LLM narrative generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
        }
    }
}

/// Text-to-speech credentials. Recognized for parity with the hosted app;
/// playback happens in the presentation layer, so nothing here consumes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub api_key: Option<String>,
}

/// Application configuration.
///
/// Every capability degrades when its key is absent or a placeholder:
/// missing Nessie key means the chain starts at the sample source, missing
/// LLM key means templated insights. Nothing throws at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the file-backed store. If relative, resolved from the
    /// config file location.
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub seed: SeedConfig,

    #[serde(default)]
    pub nessie: NessieConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub tts: TtsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            listen_addr: default_listen_addr(),
            seed: SeedConfig::default(),
            nessie: NessieConfig::default(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return defaults if it doesn't exist.
    /// Environment overrides are applied either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Apply environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("NESSIE_API_KEY") {
            self.nessie.api_key = Some(value);
        }
        if let Ok(value) = std::env::var("NESSIE_CUSTOMER_ID") {
            self.nessie.customer_id = Some(value);
        }
        if let Ok(value) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(value);
        }
        if let Ok(value) = std::env::var("ELEVENLABS_API_KEY") {
            self.tts.api_key = Some(value);
        }
        if let Ok(value) = std::env::var("RETROVAULT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var("RETROVAULT_LISTEN_ADDR") {
            self.listen_addr = value;
        }
        self
    }

    /// Nessie API key, with placeholders treated as absent.
    pub fn nessie_api_key(&self) -> Option<SecretString> {
        self.nessie
            .api_key
            .as_deref()
            .filter(|k| !is_placeholder(k))
            .map(SecretString::from)
    }

    /// LLM API key, with placeholders treated as absent.
    pub fn llm_api_key(&self) -> Option<SecretString> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !is_placeholder(k))
            .map(SecretString::from)
    }

    /// Resolve the data directory relative to the config file's directory,
    /// defaulting to `<config dir>/data`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => config_dir.join(dir),
            None => config_dir.join("data"),
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./retrovault.toml` if it exists in the current directory
/// 2. `~/.local/share/retrovault/retrovault.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("retrovault.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("retrovault").join("retrovault.toml");
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn placeholder_keys_are_treated_as_absent() {
        let mut config = Config::default();
        assert!(config.nessie_api_key().is_none());

        config.nessie.api_key = Some("your-api-key-here".to_string());
        assert!(config.nessie_api_key().is_none());

        config.nessie.api_key = Some("  ".to_string());
        assert!(config.nessie_api_key().is_none());

        config.nessie.api_key = Some("a1b2c3".to_string());
        assert!(config.nessie_api_key().is_some());
    }

    #[test]
    fn load_applies_section_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("retrovault.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[seed]")?;
        writeln!(file, "freshness_window_secs = 60")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.seed.freshness_window_secs, 60);
        assert_eq!(config.seed.remote_timeout_secs, 10);
        assert_eq!(config.listen_addr, "127.0.0.1:8787");

        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_or_default(&dir.path().join("missing.toml"))?;
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(
            config.seed.freshness_window_secs,
            crate::seed::DEFAULT_FRESHNESS_WINDOW_SECS
        );
        Ok(())
    }

    #[test]
    fn data_dir_resolution() {
        let config_dir = Path::new("/home/user/retrovault");

        let config = Config::default();
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/retrovault/data")
        );

        let config = Config {
            data_dir: Some(PathBuf::from("store")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/retrovault/store")
        );

        let config = Config {
            data_dir: Some(PathBuf::from("/var/retrovault")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/var/retrovault")
        );
    }
}
