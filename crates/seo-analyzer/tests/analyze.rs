use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Response, Server};
use reqwest::Client;
use seo_analyzer::probe::AccessibilityViolation;
use seo_analyzer::rendering::RenderingReport;
use seo_analyzer::{
    AccessibilityReport, AnalysisOptions, JsDependencies, PageProbe, PerformanceMetrics,
    ProbeError, ReportFormat, ReportOptions, SeoAnalysis, SeoAnalyzer, SeoError, write_report,
};
use seo_plugins::plugins::{
    content::ContentPlugin, headers::HeadersPlugin, social::SocialPlugin, url::UrlPlugin,
};
use seo_plugins::utils::config::PluginError;
use seo_plugins::utils::page::Page;
use seo_plugins::utils::page_plugin::{FacetReport, SeoPlugin};
use seo_plugins::utils::registry::PluginRegistry;
use tokio::net::TcpListener;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Test Page</title>
    <meta name="description" content="A small page used to exercise every part of the analyzer end to end.">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <link rel="canonical" href="https://example.com/">
    <meta property="og:title" content="Test Page">
    <meta name="twitter:card" content="summary">
    <script type="application/ld+json">{"@context":"https://schema.org","@type":"Organization","name":"Example","url":"https://example.com"}</script>
</head>
<body>
    <h1>Welcome</h1>
    <p>The quick brown fox jumps over the lazy dog. It was a sunny day.</p>
    <img src="/hero.png" alt="Hero image">
    <a href="/about">About</a>
</body>
</html>"#;

/// Canned probe results; performance always fails.
struct FakeProbe;

#[async_trait]
impl PageProbe for FakeProbe {
    async fn performance_metrics(&self, _url: &str) -> Result<PerformanceMetrics, ProbeError> {
        Err(ProbeError::Command("lighthouse not installed".to_string()))
    }

    async fn accessibility_audit(&self, _url: &str) -> Result<AccessibilityReport, ProbeError> {
        Ok(AccessibilityReport {
            available: true,
            score: 90.0,
            violations: vec![AccessibilityViolation {
                id: "color-contrast".to_string(),
                title: "Insufficient contrast".to_string(),
                description: "Text must be readable".to_string(),
                nodes: 2,
            }],
        })
    }

    async fn detect_rendering(&self, _url: &str, html: &str) -> Result<RenderingReport, ProbeError> {
        Ok(seo_analyzer::rendering::detect_rendering(html))
    }

    async fn js_dependencies(&self, _url: &str, _html: &str) -> Result<JsDependencies, ProbeError> {
        Ok(JsDependencies {
            available: true,
            ..Default::default()
        })
    }
}

struct BrokenSchema;

impl SeoPlugin for BrokenSchema {
    fn name(&self) -> &str {
        "schema"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn analyze(&self, _page: &Page) -> Result<FacetReport, PluginError> {
        Err(PluginError::InvalidInput("schema exploded".to_string()))
    }
}

fn analyzer(options: AnalysisOptions) -> SeoAnalyzer {
    SeoAnalyzer::with_probe(options, Client::new(), FakeProbe)
}

#[tokio::test]
async fn test_analyze_html_end_to_end() {
    let analysis = analyzer(AnalysisOptions::default())
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();

    assert_eq!(analysis.title.as_deref(), Some("Test Page"));
    assert_eq!(analysis.headings.h1.len(), 1);
    assert!(analysis.mobile_friendliness.is_responsive);
    assert_eq!(analysis.open_graph.get("title").map(String::as_str), Some("Test Page"));
    assert_eq!(analysis.structured_data.len(), 1);

    assert!(!analysis.performance.available);
    assert_eq!(analysis.scores.performance, None);
    assert_eq!(analysis.scores.accessibility, Some(90));
    assert!(analysis.rendering.available);

    assert!(analysis.content.is_some());
    assert!(analysis.url_analysis.is_some());
    assert!(analysis.headers_analysis.is_some());
    assert!(analysis.social.is_some());
    assert!(analysis.schema.is_some());
    assert!(analysis.errors.is_empty());
    assert!(analysis.scores.overall <= 100);

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["mobileFriendliness"]["isResponsive"], true);
    assert_eq!(json["headings"]["h1"][0], "Welcome");
}

#[tokio::test]
async fn test_invalid_url_is_fatal() {
    let result = analyzer(AnalysisOptions::default())
        .analyze_html("not a url", PAGE)
        .await;
    assert!(matches!(result, Err(SeoError::UrlParseError(_))));
}

#[tokio::test]
async fn test_failing_facet_is_recorded() {
    let mut registry = PluginRegistry::new();
    registry.register(ContentPlugin::new());
    registry.register(UrlPlugin::new());
    registry.register(HeadersPlugin::new());
    registry.register(SocialPlugin::new());
    registry.register(BrokenSchema);

    let analysis = analyzer(AnalysisOptions::default())
        .with_registry(registry)
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();

    assert!(analysis.schema.is_none());
    assert!(analysis.social.is_some());
    assert_eq!(analysis.errors.len(), 1);
    assert_eq!(analysis.errors[0].facet, "schema");
    assert_eq!(analysis.errors[0].kind, "InvalidInput");
    assert_eq!(analysis.errors[0].message, "Invalid input: schema exploded");
    assert_eq!(analysis.scores.schema, None);
}

#[tokio::test]
async fn test_disabled_and_basic_modes() {
    let options = AnalysisOptions {
        disabled_facets: vec!["social".to_string()],
        ..Default::default()
    };
    let analysis = analyzer(options)
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();
    assert!(analysis.social.is_none());
    assert!(analysis.content.is_some());

    let basic = AnalysisOptions {
        advanced: false,
        ..Default::default()
    };
    let analysis = analyzer(basic)
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();
    assert!(analysis.content.is_none());
    assert!(analysis.schema.is_none());
    assert!(analysis.errors.is_empty());
    assert_eq!(analysis.scores.content, None);
}

#[tokio::test]
async fn test_configured_headers_reach_header_checks() {
    let options = AnalysisOptions {
        headers: Some(BTreeMap::from([
            ("Content-Type".to_string(), "text/html; charset=utf-8".to_string()),
            ("Strict-Transport-Security".to_string(), "max-age=31536000".to_string()),
        ])),
        ..Default::default()
    };
    let with_headers = analyzer(options)
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();
    let without = analyzer(AnalysisOptions::default())
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();

    let scored = with_headers.headers_analysis.unwrap();
    let empty = without.headers_analysis.unwrap();
    assert!(empty.issues.contains(&"No HTTP headers available for analysis".to_string()));
    assert!(scored.score > empty.score);
}

#[tokio::test]
async fn test_json_report_round_trip() {
    let analysis = analyzer(AnalysisOptions::default())
        .analyze_html("https://example.com/", PAGE)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let options = ReportOptions {
        format: ReportFormat::Json,
        output_dir: dir.path().to_path_buf(),
        filename: "report".to_string(),
    };
    let path = write_report(&analysis, &options).unwrap();
    assert_eq!(path, dir.path().join("report.json"));

    let written: SeoAnalysis = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written, analysis);
}

#[tokio::test]
async fn test_analyze_url_fetches_site_files() {
    let addr = start_test_server().await;
    let analysis = analyzer(AnalysisOptions::default())
        .analyze_url(&format!("http://{addr}/"))
        .await
        .unwrap();

    assert_eq!(analysis.title.as_deref(), Some("Test Page"));
    assert_eq!(analysis.robots_txt.as_deref(), Some("User-agent: *\nDisallow: /private"));
    assert!(analysis.sitemap.found);
    assert_eq!(analysis.sitemap.url_count, 2);
    let headers = analysis.headers_analysis.unwrap();
    assert!(!headers.issues.contains(&"No HTTP headers available for analysis".to_string()));
}

#[tokio::test]
async fn test_analyze_url_reports_http_errors() {
    let addr = start_test_server().await;
    let result = analyzer(AnalysisOptions::default())
        .analyze_url(&format!("http://{addr}/missing"))
        .await;
    assert!(matches!(result, Err(SeoError::FetchError(_))));
}

async fn start_test_server() -> SocketAddr {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let make_svc = make_service_fn(move |_conn| async move {
        Ok::<_, Infallible>(service_fn(move |req| async move {
            match req.uri().path() {
                "/" => Ok::<_, Infallible>(
                    Response::builder()
                        .header("Content-Type", "text/html; charset=utf-8")
                        .header("Cache-Control", "max-age=3600")
                        .body(Body::from(PAGE))
                        .unwrap(),
                ),
                "/robots.txt" => Ok(Response::new(Body::from("User-agent: *\nDisallow: /private"))),
                "/sitemap.xml" => Ok(Response::new(Body::from(
                    r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                        <url><loc>https://example.com/</loc></url>
                        <url><loc>https://example.com/about</loc></url>
                    </urlset>"#,
                ))),
                _ => Ok(Response::builder()
                    .status(404)
                    .body(Body::from("404"))
                    .unwrap()),
            }
        }))
    });

    tokio::spawn(async move {
        Server::from_tcp(listener.into_std().unwrap())
            .unwrap()
            .serve(make_svc)
            .await
            .unwrap();
    });

    addr
}
