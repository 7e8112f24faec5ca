//! Classifier, anomaly and source configuration
//!
//! Configuration is loaded from TOML. Lookup order:
//! 1. An explicit path (CLI `--config`)
//! 2. `~/.local/share/paisa/config/paisa.toml`
//! 3. The embedded default (`config/paisa.toml`)
//!
//! The vendor map and keyword clusters end up in an immutable
//! [`CategoryRules`] value handed to the classifier at construction.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("../../../config/paisa.toml");

const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 15;

/// A category and the free-text words that point at it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCluster {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Static lookup tables for the first two classifier layers
#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    /// Lower-cased merchant substring -> category
    pub vendors: BTreeMap<String, String>,
    /// Checked in declared order
    pub clusters: Vec<KeywordCluster>,
}

impl CategoryRules {
    /// Longest matching key wins, so "zomato" beats the "ola" inside "chocolate"
    pub fn vendor_match(&self, text: &str) -> Option<(&str, &str)> {
        self.vendors
            .iter()
            .filter(|(key, _)| text.contains(key.as_str()))
            .min_by_key(|(key, _)| Reverse(key.len()))
            .map(|(key, category)| (key.as_str(), category.as_str()))
    }

    pub fn cluster_match(&self, text: &str) -> Option<(&str, &str)> {
        self.clusters.iter().find_map(|cluster| {
            cluster
                .keywords
                .iter()
                .find(|kw| text.contains(kw.as_str()))
                .map(|kw| (kw.as_str(), cluster.category.as_str()))
        })
    }
}

/// Spike thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyConfig {
    pub multiplier: Decimal,
    pub margin: Decimal,
    pub frequency_threshold: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            multiplier: Decimal::new(13, 1),
            margin: Decimal::from(100),
            frequency_threshold: 5,
        }
    }
}

impl AnomalyConfig {
    /// `max(average * multiplier, average + margin)`
    pub fn threshold(&self, average: Decimal) -> Decimal {
        (average * self.multiplier).max(average + self.margin)
    }
}

/// Known financial senders; an empty list accepts everyone
///
/// SMS headers are compared without their two-letter operator/circle prefix,
/// so `VM-HDFCBK`, `AD-HDFCBK` and plain `HDFCBK` are the same sender.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pub allowed_senders: Vec<String>,
    pub allowed_packages: Vec<String>,
}

impl SourceFilter {
    pub fn sender_allowed(&self, sender: Option<&str>) -> bool {
        if self.allowed_senders.is_empty() {
            return true;
        }
        let Some(sender) = sender else {
            return false;
        };
        let header = sender_header(sender);
        self.allowed_senders
            .iter()
            .any(|s| sender_header(s).eq_ignore_ascii_case(header))
    }

    pub fn package_allowed(&self, package: Option<&str>) -> bool {
        Self::allowed(&self.allowed_packages, package)
    }

    fn allowed(list: &[String], who: Option<&str>) -> bool {
        if list.is_empty() {
            return true;
        }
        match who {
            Some(who) => list.iter().any(|s| s.eq_ignore_ascii_case(who.trim())),
            None => false,
        }
    }
}

/// `AD-HDFCBK` -> `HDFCBK`; anything else is returned trimmed
fn sender_header(sender: &str) -> &str {
    let sender = sender.trim();
    match sender.split_once('-') {
        Some((prefix, header))
            if prefix.len() == 2
                && prefix.chars().all(|c| c.is_ascii_alphabetic())
                && !header.is_empty() =>
        {
            header
        }
        _ => sender,
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct PaisaConfig {
    pub timezone: Tz,
    pub rules: CategoryRules,
    pub anomaly: AnomalyConfig,
    pub sources: SourceFilter,
    pub ai_timeout: Duration,
}

impl PaisaConfig {
    /// Load from an explicit path, the user override, or the embedded default
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path() {
                Some(p) if p.exists() => {
                    debug!(path = %p.display(), "Loading config override");
                    fs::read_to_string(&p)
                        .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
                }
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml(&content)
    }

    /// The embedded default only, ignoring user overrides
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let tz_name = raw
            .general
            .and_then(|g| g.timezone)
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name
            .parse()
            .map_err(|_| Error::Config(format!("Unknown timezone: {}", tz_name)))?;

        let mut rules = CategoryRules::default();
        for (key, category) in raw.vendors.unwrap_or_default() {
            let key = key.trim().to_lowercase();
            if key.is_empty() || category.trim().is_empty() {
                return Err(Error::Config("Vendor entries need a key and a category".into()));
            }
            rules.vendors.insert(key, category.trim().to_string());
        }
        for cluster in raw.keyword_clusters.unwrap_or_default() {
            if cluster.category.trim().is_empty() {
                return Err(Error::Config("Keyword cluster without a category".into()));
            }
            rules.clusters.push(KeywordCluster {
                category: cluster.category.trim().to_string(),
                keywords: cluster
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            });
        }

        let mut anomaly = AnomalyConfig::default();
        if let Some(a) = raw.anomaly {
            if let Some(m) = a.multiplier {
                anomaly.multiplier = decimal_from_f64(m, "anomaly.multiplier")?;
            }
            if let Some(m) = a.margin {
                anomaly.margin = decimal_from_f64(m, "anomaly.margin")?;
            }
            if let Some(f) = a.frequency_threshold {
                anomaly.frequency_threshold = f;
            }
        }

        let sources = raw
            .sources
            .map(|s| SourceFilter {
                allowed_senders: s.allowed_senders.unwrap_or_default(),
                allowed_packages: s.allowed_packages.unwrap_or_default(),
            })
            .unwrap_or_default();

        let ai_timeout = Duration::from_secs(
            raw.ai
                .and_then(|a| a.timeout_secs)
                .unwrap_or(DEFAULT_AI_TIMEOUT_SECS),
        );

        Ok(Self {
            timezone,
            rules,
            anomaly,
            sources,
            ai_timeout,
        })
    }
}

/// Get the default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("paisa").join("config").join("paisa.toml"))
}

fn decimal_from_f64(value: f64, field: &str) -> Result<Decimal> {
    Decimal::from_str(&value.to_string())
        .map_err(|e| Error::Config(format!("Invalid number for {}: {}", field, e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    general: Option<RawGeneral>,
    vendors: Option<BTreeMap<String, String>>,
    keyword_clusters: Option<Vec<RawCluster>>,
    anomaly: Option<RawAnomaly>,
    sources: Option<RawSources>,
    ai: Option<RawAi>,
}

#[derive(Debug, Deserialize)]
struct RawGeneral {
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCluster {
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    multiplier: Option<f64>,
    margin: Option<f64>,
    frequency_threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawSources {
    allowed_senders: Option<Vec<String>>,
    allowed_packages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    timeout_secs: Option<u64>,
}
