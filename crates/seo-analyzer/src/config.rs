use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use html_parser::page_parser::DEFAULT_USER_AGENT;
use seo_plugins::utils::config::{FacetConfig, Thresholds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported report format: {0} (expected json or html)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Html,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            _ => Err(ConfigError::UnsupportedFormat(value.to_string())),
        }
    }
}

/// Options for one analysis run. Built once with [`AnalysisOptions::layered`]
/// and not changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub timeout_ms: u64,
    pub user_agent: String,
    pub thresholds: Thresholds,
    pub keywords: Vec<String>,
    pub sibling_urls: Vec<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub format: ReportFormat,
    pub output_dir: PathBuf,
    pub filename: Option<String>,
    pub advanced: bool,
    pub disabled_facets: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            thresholds: Thresholds::default(),
            keywords: Vec::new(),
            sibling_urls: Vec::new(),
            headers: None,
            format: ReportFormat::Json,
            output_dir: PathBuf::from("seo-reports"),
            filename: None,
            advanced: true,
            disabled_facets: Vec::new(),
        }
    }
}

impl AnalysisOptions {
    /// Defaults, overridden by the config file, overridden by the CLI.
    pub fn layered(
        file: PartialAnalysisOptions,
        cli: PartialAnalysisOptions,
    ) -> Result<Self, ConfigError> {
        let merged = file.merge(cli);
        let mut options = Self::default();

        if let Some(timeout_ms) = merged.timeout_ms {
            options.timeout_ms = timeout_ms;
        }
        if let Some(user_agent) = merged.user_agent {
            options.user_agent = user_agent;
        }
        if let Some(thresholds) = merged.thresholds {
            thresholds.apply(&mut options.thresholds);
        }
        if let Some(keywords) = merged.keywords {
            options.keywords = keywords;
        }
        if let Some(sibling_urls) = merged.sibling_urls {
            options.sibling_urls = sibling_urls;
        }
        if merged.headers.is_some() {
            options.headers = merged.headers;
        }
        if let Some(format) = merged.format {
            options.format = format.parse()?;
        }
        if let Some(output_dir) = merged.output_dir {
            options.output_dir = output_dir;
        }
        if merged.filename.is_some() {
            options.filename = merged.filename;
        }
        if let Some(advanced) = merged.advanced {
            options.advanced = advanced;
        }
        if let Some(disabled_facets) = merged.disabled_facets {
            options.disabled_facets = disabled_facets;
        }

        Ok(options)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn facet_config(&self) -> FacetConfig {
        let mut config = FacetConfig::new();
        for facet in &self.disabled_facets {
            config.disable_facet(facet);
        }
        config
    }
}

/// Threshold overrides; unset fields keep the lower layer's value.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialThresholds {
    pub title_min_length: Option<usize>,
    pub title_max_length: Option<usize>,
    pub description_min_length: Option<usize>,
    pub description_max_length: Option<usize>,
    pub min_word_count: Option<usize>,
    pub long_paragraph_words: Option<usize>,
    pub max_js_size_kb: Option<u64>,
    pub max_eager_images: Option<usize>,
}

impl PartialThresholds {
    fn merge(self, higher: Self) -> Self {
        Self {
            title_min_length: higher.title_min_length.or(self.title_min_length),
            title_max_length: higher.title_max_length.or(self.title_max_length),
            description_min_length: higher.description_min_length.or(self.description_min_length),
            description_max_length: higher.description_max_length.or(self.description_max_length),
            min_word_count: higher.min_word_count.or(self.min_word_count),
            long_paragraph_words: higher.long_paragraph_words.or(self.long_paragraph_words),
            max_js_size_kb: higher.max_js_size_kb.or(self.max_js_size_kb),
            max_eager_images: higher.max_eager_images.or(self.max_eager_images),
        }
    }

    fn apply(self, thresholds: &mut Thresholds) {
        if let Some(value) = self.title_min_length {
            thresholds.title_min_length = value;
        }
        if let Some(value) = self.title_max_length {
            thresholds.title_max_length = value;
        }
        if let Some(value) = self.description_min_length {
            thresholds.description_min_length = value;
        }
        if let Some(value) = self.description_max_length {
            thresholds.description_max_length = value;
        }
        if let Some(value) = self.min_word_count {
            thresholds.min_word_count = value;
        }
        if let Some(value) = self.long_paragraph_words {
            thresholds.long_paragraph_words = value;
        }
        if let Some(value) = self.max_js_size_kb {
            thresholds.max_js_size_kb = value;
        }
        if let Some(value) = self.max_eager_images {
            thresholds.max_eager_images = value;
        }
    }
}

/// One configuration layer (config file or CLI flags).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialAnalysisOptions {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub thresholds: Option<PartialThresholds>,
    pub keywords: Option<Vec<String>>,
    pub sibling_urls: Option<Vec<String>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub format: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub filename: Option<String>,
    pub advanced: Option<bool>,
    pub disabled_facets: Option<Vec<String>>,
}

impl PartialAnalysisOptions {
    /// Fields set in `higher` win.
    pub fn merge(self, higher: Self) -> Self {
        let thresholds = match (self.thresholds, higher.thresholds) {
            (Some(lower), Some(upper)) => Some(lower.merge(upper)),
            (lower, upper) => upper.or(lower),
        };
        Self {
            timeout_ms: higher.timeout_ms.or(self.timeout_ms),
            user_agent: higher.user_agent.or(self.user_agent),
            thresholds,
            keywords: higher.keywords.or(self.keywords),
            sibling_urls: higher.sibling_urls.or(self.sibling_urls),
            headers: higher.headers.or(self.headers),
            format: higher.format.or(self.format),
            output_dir: higher.output_dir.or(self.output_dir),
            filename: higher.filename.or(self.filename),
            advanced: higher.advanced.or(self.advanced),
            disabled_facets: higher.disabled_facets.or(self.disabled_facets),
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<PartialAnalysisOptions, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
