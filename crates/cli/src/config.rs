use crate::command::QueryFilter;
use crate::history::{DEFAULT_HISTORY_CHARS, DEFAULT_HISTORY_TURNS};
use anyhow::{anyhow, bail, Context, Result};
use meeting_vector_store::{
    config_path, DEFAULT_DATA_DIR_NAME, DEFAULT_HASH_DIMENSION, DEFAULT_OLLAMA_URL,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG: &str = "MEETING_AGENT_CONFIG";
pub const ENV_DATA_DIR: &str = "MEETING_AGENT_DATA_DIR";
pub const ENV_SEED_FILE: &str = "MEETING_AGENT_SEED_FILE";
pub const ENV_EMBED_MODE: &str = "MEETING_AGENT_EMBED_MODE";
pub const ENV_EMBED_MODEL: &str = "MEETING_AGENT_EMBED_MODEL";
pub const ENV_CLASSIFIER: &str = "MEETING_AGENT_CLASSIFIER";
pub const ENV_LLM_MODEL: &str = "MEETING_AGENT_LLM_MODEL";
pub const ENV_OLLAMA_URL: &str = "MEETING_AGENT_OLLAMA_URL";
pub const ENV_VERBOSE: &str = "MEETING_AGENT_VERBOSE";

pub const DEFAULT_SEED_FILE: &str = "fake-notes/meetings.json";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_LLM_MODEL: &str = "qwen2.5:14b";
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_QUERY_TOP_K: usize = 5;
pub const DEFAULT_MIN_SCORE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// Offline hashing bag-of-words vectors
    Hash,
    Ollama,
}

impl FromStr for EmbedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!(
                "Unknown embed mode '{other}' (expected 'hash' or 'ollama')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Rules,
    Llm,
}

impl FromStr for ClassifierMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "llm" => Ok(Self::Llm),
            other => Err(anyhow!(
                "Unknown classifier '{other}' (expected 'rules' or 'llm')"
            )),
        }
    }
}

/// Settings resolved once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub data_dir: PathBuf,
    /// None disables seeding
    pub seed_file: Option<PathBuf>,
    pub embed_mode: EmbedMode,
    pub embed_model: String,
    pub classifier: ClassifierMode,
    pub llm_model: String,
    pub ollama_url: String,
    pub embed_timeout: Duration,
    pub llm_timeout: Duration,
    pub query_top_k: usize,
    /// Similarity a hit must exceed to be reported
    pub min_score: f32,
    pub hash_dimension: usize,
    /// Earlier turns shown to the chat model; 0 disables memory
    pub history_turns: usize,
    pub history_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR_NAME),
            seed_file: Some(PathBuf::from(DEFAULT_SEED_FILE)),
            embed_mode: EmbedMode::Hash,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            classifier: ClassifierMode::Rules,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embed_timeout: Duration::from_millis(DEFAULT_EMBED_TIMEOUT_MS),
            llm_timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
            query_top_k: DEFAULT_QUERY_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            hash_dimension: DEFAULT_HASH_DIMENSION,
            history_turns: DEFAULT_HISTORY_TURNS,
            history_chars: DEFAULT_HISTORY_CHARS,
        }
    }
}

/// Optional `config.json`; every key may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    seed_file: Option<PathBuf>,
    embed_mode: Option<String>,
    embed_model: Option<String>,
    classifier: Option<String>,
    llm_model: Option<String>,
    ollama_url: Option<String>,
    embed_timeout_ms: Option<u64>,
    llm_timeout_ms: Option<u64>,
    query_top_k: Option<usize>,
    min_score: Option<f32>,
    hash_dimension: Option<usize>,
    history_turns: Option<usize>,
    history_chars: Option<usize>,
}

impl AgentConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Environment overrides the config file, which overrides defaults.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let defaults = Self::default();

        let env_data_dir = env(ENV_DATA_DIR).filter(|v| !v.is_empty()).map(PathBuf::from);
        let file = match env(ENV_CONFIG).filter(|v| !v.is_empty()) {
            Some(path) => load_config_file(Path::new(&path))?,
            None => {
                let data_dir = env_data_dir.as_deref().unwrap_or(defaults.data_dir.as_path());
                let path = config_path(data_dir);
                if path.is_file() {
                    load_config_file(&path)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let data_dir = env_data_dir
            .or(file.data_dir)
            .unwrap_or(defaults.data_dir);
        let seed_file = match env(ENV_SEED_FILE) {
            Some(raw) if raw.is_empty() => None,
            Some(raw) => Some(PathBuf::from(raw)),
            None => file.seed_file.or(defaults.seed_file),
        };
        let embed_mode = match env(ENV_EMBED_MODE).or(file.embed_mode) {
            Some(raw) => raw.parse()?,
            None => defaults.embed_mode,
        };
        let classifier = match env(ENV_CLASSIFIER).or(file.classifier) {
            Some(raw) => raw.parse()?,
            None => defaults.classifier,
        };

        let config = Self {
            data_dir,
            seed_file,
            embed_mode,
            embed_model: env(ENV_EMBED_MODEL)
                .or(file.embed_model)
                .unwrap_or(defaults.embed_model),
            classifier,
            llm_model: env(ENV_LLM_MODEL)
                .or(file.llm_model)
                .unwrap_or(defaults.llm_model),
            ollama_url: env(ENV_OLLAMA_URL)
                .or(file.ollama_url)
                .unwrap_or(defaults.ollama_url),
            embed_timeout: file
                .embed_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.embed_timeout),
            llm_timeout: file
                .llm_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.llm_timeout),
            query_top_k: file.query_top_k.unwrap_or(defaults.query_top_k),
            min_score: file.min_score.unwrap_or(defaults.min_score),
            hash_dimension: file.hash_dimension.unwrap_or(defaults.hash_dimension),
            history_turns: file.history_turns.unwrap_or(defaults.history_turns),
            history_chars: file.history_chars.unwrap_or(defaults.history_chars),
        };
        config.validate()?;
        Ok(config)
    }

    /// Lexical embeddings score unrelated text above zero through hash
    /// collisions, so their hits must also share a word with the query.
    pub fn query_filter(&self) -> QueryFilter {
        QueryFilter {
            min_score: self.min_score,
            require_term_match: self.embed_mode == EmbedMode::Hash,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.query_top_k == 0 {
            bail!("query_top_k must be at least 1");
        }
        if !(-1.0..1.0).contains(&self.min_score) {
            bail!("min_score must be in [-1, 1)");
        }
        if self.hash_dimension == 0 {
            bail!("hash_dimension must be at least 1");
        }
        if self.embed_timeout.is_zero() || self.llm_timeout.is_zero() {
            bail!("timeouts must be positive");
        }
        if self.ollama_url.is_empty() {
            bail!("ollama_url must not be empty");
        }
        Ok(())
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn resolve(vars: &[(&str, &str)]) -> Result<AgentConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::resolve(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env_or_file() {
        let temp = TempDir::new().expect("tempdir");
        let data_dir = temp.path().join("data");
        let config =
            resolve(&[(ENV_DATA_DIR, data_dir.to_str().expect("utf8 path"))]).expect("config");
        assert_eq!(config, AgentConfig::with_data_dir(&data_dir));
    }

    #[test]
    fn env_overrides_file_and_file_overrides_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("agent.json");
        std::fs::write(
            &file,
            r#"{"embed_model":"from-file","query_top_k":3,"classifier":"llm","llm_timeout_ms":1500}"#,
        )
        .expect("write config");

        let config = resolve(&[
            (ENV_CONFIG, file.to_str().expect("utf8 path")),
            (ENV_EMBED_MODEL, "from-env"),
            (ENV_SEED_FILE, ""),
        ])
        .expect("config");
        assert_eq!(config.embed_model, "from-env");
        assert_eq!(config.query_top_k, 3);
        assert_eq!(config.classifier, ClassifierMode::Llm);
        assert_eq!(config.llm_timeout, Duration::from_millis(1500));
        assert_eq!(config.seed_file, None);
    }

    #[test]
    fn config_json_in_data_dir_is_picked_up() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::write(temp.path().join("config.json"), r#"{"hash_dimension":64,"history_turns":4}"#)
            .expect("write config");
        let config =
            resolve(&[(ENV_DATA_DIR, temp.path().to_str().expect("utf8 path"))]).expect("config");
        assert_eq!(config.hash_dimension, 64);
        assert_eq!(config.history_turns, 4);
        assert_eq!(config.history_chars, DEFAULT_HISTORY_CHARS);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().to_str().expect("utf8 path");
        assert!(resolve(&[(ENV_DATA_DIR, dir), (ENV_EMBED_MODE, "gpu")]).is_err());
        assert!(resolve(&[(ENV_DATA_DIR, dir), (ENV_CLASSIFIER, "magic")]).is_err());

        let file = temp.path().join("zero.json");
        std::fs::write(&file, r#"{"query_top_k":0}"#).expect("write config");
        assert!(resolve(&[(ENV_CONFIG, file.to_str().expect("utf8 path"))]).is_err());

        std::fs::write(&file, r#"{"query_top_k":"five"}"#).expect("write config");
        assert!(resolve(&[(ENV_CONFIG, file.to_str().expect("utf8 path"))]).is_err());
    }

    #[test]
    fn hash_mode_requires_shared_words() {
        let mut config = AgentConfig::default();
        assert!(config.query_filter().require_term_match);
        config.embed_mode = EmbedMode::Ollama;
        config.min_score = 0.3;
        assert_eq!(
            config.query_filter(),
            QueryFilter {
                min_score: 0.3,
                require_term_match: false,
            }
        );
    }

    #[test]
    fn min_score_comes_from_the_file_and_is_bounded() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("agent.json");
        std::fs::write(&file, r#"{"min_score":0.15}"#).expect("write config");
        let config = resolve(&[(ENV_CONFIG, file.to_str().expect("utf8 path"))]).expect("config");
        assert_eq!(config.min_score, 0.15);

        std::fs::write(&file, r#"{"min_score":1.5}"#).expect("write config");
        assert!(resolve(&[(ENV_CONFIG, file.to_str().expect("utf8 path"))]).is_err());
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Ollama".parse::<EmbedMode>().expect("mode"), EmbedMode::Ollama);
        assert_eq!(" RULES ".parse::<ClassifierMode>().expect("mode"), ClassifierMode::Rules);
    }
}
