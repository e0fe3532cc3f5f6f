use std::collections::HashMap;

use html_parser::DomError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("DOM query failed: {0}")]
    Dom(#[from] DomError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Size and length limits the metadata, content and script checks use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub title_min_length: usize,
    pub title_max_length: usize,
    pub description_min_length: usize,
    pub description_max_length: usize,
    pub min_word_count: usize,
    pub long_paragraph_words: usize,
    pub max_js_size_kb: u64,
    pub max_eager_images: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            title_min_length: 30,
            title_max_length: 60,
            description_min_length: 70,
            description_max_length: 160,
            min_word_count: 300,
            long_paragraph_words: 150,
            max_js_size_kb: 500,
            max_eager_images: 1,
        }
    }
}

// Configuration for which facets to run
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FacetConfig {
    enabled_facets: HashMap<String, bool>,
}

impl FacetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_facet(&mut self, facet: &str) {
        self.enabled_facets.insert(facet.to_string(), true);
    }

    pub fn disable_facet(&mut self, facet: &str) {
        self.enabled_facets.insert(facet.to_string(), false);
    }

    /// Facets are on unless explicitly disabled.
    pub fn is_facet_enabled(&self, facet: &str) -> bool {
        *self.enabled_facets.get(facet).unwrap_or(&true)
    }
}
