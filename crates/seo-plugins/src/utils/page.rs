use std::collections::BTreeMap;

use html_parser::ParsedDocument;

use super::config::Thresholds;

/// Everything the facet plugins may look at for one page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    url: String,
    html: String,
    headers: BTreeMap<String, String>,
    keywords: Vec<String>,
    sibling_urls: Vec<String>,
    thresholds: Thresholds,
}

impl Page {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Header names are lowercased on the way in.
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_sibling_urls(mut self, sibling_urls: Vec<String>) -> Self {
        self.sibling_urls = sibling_urls;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn get_url(&self) -> &str {
        &self.url
    }

    pub fn get_headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn get_keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn get_sibling_urls(&self) -> &[String] {
        &self.sibling_urls
    }

    pub fn get_thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn get_document(&self) -> ParsedDocument {
        ParsedDocument::parse(&self.html)
    }
}
