use std::collections::BTreeMap;

use html_parser::page_parser::{Headings, Image, Links, MetaTagInfo, PageParserError};
use seo_plugins::plugins::{
    content::ContentAnalysis, headers::HeadersAnalysis, lazy_load::LazyLoading,
    mobile::MobileFriendliness, schema::SchemaAnalysis, social::SocialAnalysis, url::UrlAnalysis,
};
use seo_plugins::utils::score::{FacetResult, average};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod analyzer;
pub mod config;
mod lighthouse;
pub mod probe;
pub mod rendering;
pub mod report;
pub mod scripts;
pub mod sitemap;

pub use analyzer::SeoAnalyzer;
pub use config::{AnalysisOptions, ConfigError, PartialAnalysisOptions, ReportFormat};
pub use lighthouse::{CommandOutput, ShellCommand, TokioShell};
pub use probe::{AccessibilityReport, DefaultProbe, PageProbe, PerformanceMetrics, ProbeError};
pub use rendering::RenderingReport;
pub use report::{ReportError, ReportOptions, write_report};
pub use scripts::JsDependencies;
pub use sitemap::SitemapSummary;

#[derive(Error, Debug)]
pub enum SeoError {
    #[error("Failed to fetch URL: {0}")]
    FetchError(String),
    #[error("Failed to parse URL: {0}")]
    UrlParseError(String),
    #[error("Failed to extract page data: {0}")]
    ExtractionError(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<PageParserError> for SeoError {
    fn from(error: PageParserError) -> Self {
        match error {
            PageParserError::FetchError(message) => SeoError::FetchError(message),
            PageParserError::UrlParseError(message) => SeoError::UrlParseError(message),
            other => SeoError::ExtractionError(other.to_string()),
        }
    }
}

/// A facet that failed while the rest of the analysis carried on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisError {
    pub facet: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    /// Debug rendering of the error followed by its source chain.
    pub stack: String,
}

impl AnalysisError {
    pub fn new(facet: &str, kind: &str, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = format!("{error:?}");
        let mut source = error.source();
        while let Some(cause) = source {
            stack.push_str(&format!("\ncaused by: {cause}"));
            source = cause.source();
        }
        Self {
            facet: facet.to_string(),
            kind: kind.to_string(),
            message: error.to_string(),
            stack,
        }
    }
}

/// Facet scores of one analysis. Facets that did not run are `None`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub overall: u32,
    pub metadata: u32,
    pub mobile: u32,
    pub lazy_loading: u32,
    pub performance: Option<u32>,
    pub accessibility: Option<u32>,
    pub content: Option<u32>,
    pub url: Option<u32>,
    pub headers: Option<u32>,
    pub social: Option<u32>,
    pub schema: Option<u32>,
}

impl ScoreSummary {
    pub fn from_analysis(analysis: &SeoAnalysis) -> Self {
        let probe_score =
            |available: bool, score: f64| available.then(|| score.round().clamp(0.0, 100.0) as u32);
        let mut summary = Self {
            overall: 0,
            metadata: analysis.metadata.score,
            mobile: analysis.mobile_friendliness.score,
            lazy_loading: analysis.lazy_loading.score,
            performance: probe_score(
                analysis.performance.available,
                analysis.performance.performance_score,
            ),
            accessibility: probe_score(analysis.accessibility.available, analysis.accessibility.score),
            content: analysis.content.as_ref().map(|facet| facet.score),
            url: analysis.url_analysis.as_ref().map(|facet| facet.score),
            headers: analysis.headers_analysis.as_ref().map(|facet| facet.score),
            social: analysis.social.as_ref().map(|facet| facet.score),
            schema: analysis.schema.as_ref().map(|facet| facet.score),
        };

        let scored: Vec<u32> = [summary.metadata, summary.mobile, summary.lazy_loading]
            .into_iter()
            .chain(
                [
                    summary.performance,
                    summary.accessibility,
                    summary.content,
                    summary.url,
                    summary.headers,
                    summary.social,
                    summary.schema,
                ]
                .into_iter()
                .flatten(),
            )
            .collect();
        summary.overall = average(&scored);
        summary
    }
}

/// Everything learned about one page.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub meta_tags: MetaTagInfo,
    pub headings: Headings,
    pub images: Vec<Image>,
    pub links: Vec<Links>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
    pub structured_data: Vec<String>,
    pub robots_txt: Option<String>,
    pub sitemap_xml: Option<String>,
    pub sitemap: SitemapSummary,
    pub metadata: FacetResult,
    pub mobile_friendliness: MobileFriendliness,
    pub lazy_loading: LazyLoading,
    pub performance: PerformanceMetrics,
    pub accessibility: AccessibilityReport,
    pub rendering: RenderingReport,
    pub js_dependencies: JsDependencies,
    pub content: Option<ContentAnalysis>,
    pub url_analysis: Option<UrlAnalysis>,
    pub headers_analysis: Option<HeadersAnalysis>,
    pub social: Option<SocialAnalysis>,
    pub schema: Option<SchemaAnalysis>,
    pub scores: ScoreSummary,
    pub errors: Vec<AnalysisError>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use seo_plugins::utils::config::PluginError;

    #[test]
    fn test_analysis_error_serializes_type() {
        let error = PluginError::InvalidInput("bad page".to_string());
        let recorded = AnalysisError::new("content", "InvalidInput", &error);
        let json = serde_json::to_value(&recorded).unwrap();

        assert_eq!(json["type"], "InvalidInput");
        assert_eq!(json["facet"], "content");
        assert_eq!(json["message"], "Invalid input: bad page");
        assert!(recorded.stack.contains("InvalidInput"));
    }

    #[test]
    fn test_overall_score_skips_missing_facets() {
        let mut analysis = SeoAnalysis::default();
        analysis.metadata.score = 80;
        analysis.mobile_friendliness.score = 60;
        analysis.lazy_loading.score = 100;
        let summary = ScoreSummary::from_analysis(&analysis);
        assert_eq!(summary.overall, 80);
        assert_eq!(summary.performance, None);

        analysis.performance.available = true;
        analysis.performance.performance_score = 39.6;
        let summary = ScoreSummary::from_analysis(&analysis);
        assert_eq!(summary.performance, Some(40));
        assert_eq!(summary.overall, 70);
    }
}
