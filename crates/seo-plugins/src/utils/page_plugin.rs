use serde::{Deserialize, Serialize};

use super::config::PluginError;
use super::page::Page;
use crate::plugins::{
    content::ContentAnalysis, headers::HeadersAnalysis, schema::SchemaAnalysis,
    social::SocialAnalysis, url::UrlAnalysis,
};

/// What one facet plugin produced for a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "facet", content = "report", rename_all = "camelCase")]
pub enum FacetReport {
    Content(ContentAnalysis),
    Url(UrlAnalysis),
    Headers(HeadersAnalysis),
    Social(SocialAnalysis),
    Schema(SchemaAnalysis),
}

impl FacetReport {
    pub fn score(&self) -> u32 {
        match self {
            FacetReport::Content(report) => report.score,
            FacetReport::Url(report) => report.score,
            FacetReport::Headers(report) => report.score,
            FacetReport::Social(report) => report.score,
            FacetReport::Schema(report) => report.score,
        }
    }
}

// Main plugin trait
pub trait SeoPlugin: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    // Run the facet against one page
    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError>;
}
