use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use html_parser::page_parser::{PageAnalysis, PageParser, build_client};
use html_parser::{ParsedDocument, QueryAll};
use reqwest::Client;
use seo_plugins::plugins::{
    lazy_load::{LazyLoading, analyze_lazy_loading},
    meta::analyze_metadata,
    mobile::{MobileFriendliness, analyze_mobile},
};
use seo_plugins::utils::config::{PluginError, Thresholds};
use seo_plugins::utils::page::Page;
use seo_plugins::utils::page_plugin::FacetReport;
use seo_plugins::utils::registry::PluginRegistry;
use seo_plugins::utils::score::FacetResult;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AnalysisOptions;
use crate::probe::{DefaultProbe, PageProbe, ProbeError};
use crate::sitemap::{sitemap_locations, summarize_sitemap};
use crate::{AnalysisError, ScoreSummary, SeoAnalysis, SeoError};

/// Everything read synchronously from one parse of the markup.
struct Extraction {
    page: PageAnalysis,
    metadata: FacetResult,
    mobile: MobileFriendliness,
    lazy_loading: LazyLoading,
}

fn extract(url: &Url, html: &str, thresholds: &Thresholds) -> Result<Extraction, SeoError> {
    let mut parser = PageParser::new(url.clone())?;
    parser.set_content(html.to_string());
    let page = parser.analyze_page()?;

    let document = parser.get_document()?;
    let extraction_error = |e: html_parser::DomError| SeoError::ExtractionError(e.to_string());
    let metadata = analyze_metadata(&document, thresholds, page.word_count).map_err(extraction_error)?;
    let mobile = analyze_mobile(&document).map_err(extraction_error)?;
    let lazy_loading =
        analyze_lazy_loading(&document, thresholds.max_eager_images).map_err(extraction_error)?;

    Ok(Extraction {
        page,
        metadata,
        mobile,
        lazy_loading,
    })
}

fn linked_sitemap(html: &str) -> Option<String> {
    ParsedDocument::parse(html)
        .query_first(r#"link[rel="sitemap"]"#)
        .ok()
        .flatten()
        .and_then(|link| link.attr("href").map(str::to_string))
}

fn plugin_error_kind(error: &PluginError) -> &'static str {
    match error {
        PluginError::Dom(_) => "DomError",
        PluginError::InvalidInput(_) => "InvalidInput",
    }
}

/// Awaits one probe. A failed probe is logged and replaced by its
/// unavailable default.
async fn probe_or_default<T: Default>(
    name: &str,
    probe: impl Future<Output = Result<T, ProbeError>>,
) -> T {
    match probe.await {
        Ok(record) => record,
        Err(e) => {
            warn!(probe = name, error = %e, "probe failed, marking unavailable");
            T::default()
        }
    }
}

pub struct SeoAnalyzer {
    options: AnalysisOptions,
    client: Client,
    probe: Box<dyn PageProbe>,
    registry: PluginRegistry,
}

impl std::fmt::Debug for SeoAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeoAnalyzer")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

impl SeoAnalyzer {
    /// An analyzer backed by Lighthouse and plain HTTP probes.
    pub fn new(options: AnalysisOptions) -> Result<Self, SeoError> {
        let client = build_client(&options.user_agent, options.timeout())?;
        let probe = DefaultProbe::new(
            client.clone(),
            options.timeout(),
            options.thresholds.max_js_size_kb,
        );
        Ok(Self::with_probe(options, client, probe))
    }

    pub fn with_probe(options: AnalysisOptions, client: Client, probe: impl PageProbe + 'static) -> Self {
        let mut registry = PluginRegistry::default();
        registry.set_config(options.facet_config());
        Self {
            options,
            client,
            probe: Box::new(probe),
            registry,
        }
    }

    /// Swaps the facet plugins. Disabled facets from the options still apply.
    pub fn with_registry(mut self, mut registry: PluginRegistry) -> Self {
        registry.set_config(self.options.facet_config());
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Fetches the page, its robots.txt and sitemap, then analyzes it.
    pub async fn analyze_url(&self, url: &str) -> Result<SeoAnalysis, SeoError> {
        let started = Instant::now();
        let mut parser = PageParser::new(url)?;
        let fetched = parser.fetch(&self.client).await?;
        info!(url = %fetched.url, status = fetched.status, elapsed_ms = fetched.elapsed.as_millis() as u64, "page fetched");

        let robots_txt = parser.fetch_resource(&self.client, "/robots.txt").await;
        let linked = linked_sitemap(&fetched.body);
        let mut sitemap_xml = None;
        for location in sitemap_locations(linked.as_deref(), robots_txt.as_deref()) {
            if let Some(content) = parser.fetch_resource(&self.client, &location).await {
                debug!(location = %location, "sitemap found");
                sitemap_xml = Some(content);
                break;
            }
        }

        let headers = self.options.headers.clone().unwrap_or(fetched.headers);
        let mut analysis = self
            .analyze_document(fetched.url.as_str(), &fetched.body, headers, started)
            .await?;
        analysis.sitemap = sitemap_xml.as_deref().map(summarize_sitemap).unwrap_or_default();
        analysis.robots_txt = robots_txt;
        analysis.sitemap_xml = sitemap_xml;
        Ok(analysis)
    }

    /// Analyzes markup that was already retrieved. Header checks use the
    /// configured headers, if any.
    pub async fn analyze_html(&self, url: &str, html: &str) -> Result<SeoAnalysis, SeoError> {
        let headers = self.options.headers.clone().unwrap_or_default();
        self.analyze_document(url, html, headers, Instant::now()).await
    }

    async fn analyze_document(
        &self,
        url: &str,
        html: &str,
        headers: BTreeMap<String, String>,
        started: Instant,
    ) -> Result<SeoAnalysis, SeoError> {
        let page_url = Url::parse(url).map_err(|e| SeoError::UrlParseError(e.to_string()))?;
        let extraction = extract(&page_url, html, &self.options.thresholds)?;
        let meta_tags = extraction.page.meta_tags;

        let mut analysis = SeoAnalysis {
            url: page_url.to_string(),
            title: meta_tags.title.clone(),
            description: meta_tags.description.clone(),
            canonical: meta_tags.canonical.clone(),
            open_graph: meta_tags.og_tags.clone(),
            twitter_card: meta_tags.twitter_tags.clone(),
            meta_tags,
            headings: extraction.page.headings,
            images: extraction.page.images,
            links: extraction.page.links,
            structured_data: extraction.page.structured_data,
            metadata: extraction.metadata,
            mobile_friendliness: extraction.mobile,
            lazy_loading: extraction.lazy_loading,
            ..Default::default()
        };

        let url = analysis.url.clone();
        analysis.performance =
            probe_or_default("performance", self.probe.performance_metrics(&url)).await;
        analysis.accessibility =
            probe_or_default("accessibility", self.probe.accessibility_audit(&url)).await;
        analysis.rendering =
            probe_or_default("rendering", self.probe.detect_rendering(&url, html)).await;
        analysis.js_dependencies =
            probe_or_default("js_dependencies", self.probe.js_dependencies(&url, html)).await;

        if self.options.advanced {
            self.run_facets(&mut analysis, html, headers);
        } else {
            debug!("advanced facets disabled");
        }

        analysis.scores = ScoreSummary::from_analysis(&analysis);
        analysis.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            url = %analysis.url,
            overall = analysis.scores.overall,
            errors = analysis.errors.len(),
            "analysis complete"
        );
        Ok(analysis)
    }

    fn run_facets(&self, analysis: &mut SeoAnalysis, html: &str, headers: BTreeMap<String, String>) {
        let page = Page::from_html(html)
            .with_url(analysis.url.clone())
            .with_headers(headers)
            .with_keywords(self.options.keywords.clone())
            .with_sibling_urls(self.options.sibling_urls.clone())
            .with_thresholds(self.options.thresholds.clone());

        for outcome in self.registry.analyze(&page) {
            match outcome.result {
                Ok(FacetReport::Content(report)) => analysis.content = Some(report),
                Ok(FacetReport::Url(report)) => analysis.url_analysis = Some(report),
                Ok(FacetReport::Headers(report)) => analysis.headers_analysis = Some(report),
                Ok(FacetReport::Social(report)) => analysis.social = Some(report),
                Ok(FacetReport::Schema(report)) => analysis.schema = Some(report),
                Err(e) => analysis.errors.push(AnalysisError::new(
                    &outcome.name,
                    plugin_error_kind(&e),
                    &e,
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_sitemap() {
        let html = r#"<html><head><link rel="sitemap" href="/sitemap_index.xml"></head></html>"#;
        assert_eq!(linked_sitemap(html), Some("/sitemap_index.xml".to_string()));
        assert_eq!(linked_sitemap("<html></html>"), None);
    }

    #[test]
    fn test_extract_reads_one_parse() {
        let url = Url::parse("https://example.com/").unwrap();
        let extraction = extract(
            &url,
            r#"<html lang="en"><head><title>Hello</title><meta name="viewport" content="width=device-width, initial-scale=1"></head><body><h1>Hi</h1></body></html>"#,
            &Thresholds::default(),
        )
        .unwrap();
        assert_eq!(extraction.page.meta_tags.title.as_deref(), Some("Hello"));
        assert!(extraction.mobile.is_responsive);
        assert!(extraction.metadata.score < 100);
    }
}
