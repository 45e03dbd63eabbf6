//! Run configuration, loaded once from a TOML file.
//!
//! A missing or malformed file never aborts a run: the problem is logged and
//! defaults are used.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "dvtag.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

/// Folder-name keywords for the sound-effect title suffix. Matched
/// case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SoundEffectKeywords {
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SoundEffectKeywords {
    fn default() -> Self {
        let list = |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            affirmative: list(&[
                "有音效",
                "含音效",
                "SEあり",
                "SE有り",
                "SE有",
                "SE付き",
                "SEつき",
                "効果音あり",
                "効果音付き",
                "with SE",
            ]),
            negative: list(&[
                "没有音效",
                "沒有音效",
                "不含音效",
                "未含音效",
                "无音效",
                "無音效",
                "SEなし",
                "SE無し",
                "SE無",
                "SE无",
                "无SE",
                "無SE",
                "SEカット",
                "SE入れ前",
                "効果音なし",
                "without SE",
                "SE off",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub add_file_type_suffix: bool,
    pub add_sound_effect_suffix: bool,
    pub add_chinese_tag: bool,
    pub track_title_from_file_name: bool,
    pub include_subfolders: bool,
    pub embed_cover: bool,
    pub jobs: usize,
    pub ffmpeg: PathBuf,
    pub retry: RetryConfig,
    pub sound_effect: SoundEffectKeywords,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            add_file_type_suffix: false,
            add_sound_effect_suffix: false,
            add_chinese_tag: false,
            track_title_from_file_name: false,
            include_subfolders: false,
            embed_cover: true,
            jobs: num_cpus::get().clamp(1, 4),
            ffmpeg: PathBuf::from("ffmpeg"),
            retry: RetryConfig::default(),
            sound_effect: SoundEffectKeywords::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(text)?;
        config.jobs = config.jobs.max(1);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` if given, else [`DEFAULT_CONFIG_FILE`] from `cwd`
    /// when present. Any failure falls back to defaults with a warning.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("No {} found, using default settings", DEFAULT_CONFIG_FILE);
                    return Self::default();
                }
                candidate
            }
        };

        match Self::from_file(&path) {
            Ok(config) => {
                debug!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }
}
