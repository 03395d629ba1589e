use crate::key_map::{KeyToDotMap, DEFAULT_KEY_MAP};
use crate::types::DotIndex;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("dot index {0} is out of range (expected 1..=6)")]
    DotOutOfRange(DotIndex),
    #[error("dot {dot} is assigned to both '{first}' and '{second}'")]
    DuplicateDot {
        dot: DotIndex,
        first: String,
        second: String,
    },
    #[error("key '{0}' is assigned more than once")]
    DuplicateKey(String),
    #[error("empty key identifier")]
    EmptyKey,
    #[error("invalid dot pattern: {0}")]
    InvalidPattern(String),
    #[error("pattern {0} is defined more than once")]
    DuplicatePattern(String),
    #[error("key '{0}' is reserved and cannot be a chord key")]
    ReservedKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Base address of the suggestion service; requests go to
    /// `{base_url}/suggest`. No requests are made when unset.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SuggestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_configured(&self) -> bool {
        self.base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub key_map: BTreeMap<String, DotIndex>,
    pub suggest: SuggestConfig,
}

fn default_key_map() -> BTreeMap<String, DotIndex> {
    DEFAULT_KEY_MAP
        .iter()
        .map(|(k, d)| (k.to_string(), *d))
        .collect()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            key_map: default_key_map(),
            suggest: SuggestConfig::default(),
        }
    }
}

impl Profile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        let profile = Self::from_json(&raw)
            .with_context(|| format!("loading profile {}", path.display()))?;
        info!(
            "Profile loaded from {} ({} chord keys)",
            path.display(),
            profile.key_map.len()
        );
        Ok(profile)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let profile: Profile = serde_json::from_str(content).context("invalid profile JSON")?;
        profile.validated_key_map()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validated_key_map(&self) -> Result<KeyToDotMap, ConfigError> {
        KeyToDotMap::from_pairs(self.key_map.iter().map(|(k, d)| (k.as_str(), *d)))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.suggest.base_url = Some(url.into());
        self
    }
}
