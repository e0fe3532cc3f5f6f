//! JSON and HTML report files for a finished [`SeoAnalysis`].

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use seo_plugins::utils::score::FacetResult;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::SeoAnalysis;
use crate::config::{AnalysisOptions, ReportFormat};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub format: ReportFormat,
    pub output_dir: PathBuf,
    pub filename: String,
}

impl ReportOptions {
    /// Uses the configured filename, or `seo-report-<host>-<unix seconds>`.
    pub fn from_options(options: &AnalysisOptions, url: &str) -> Self {
        let filename = options.filename.clone().unwrap_or_else(|| {
            let host = Url::parse(url)
                .ok()
                .and_then(|url| url.host_str().map(|host| host.replace('.', "-")))
                .unwrap_or_else(|| "page".to_string());
            let seconds = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default();
            format!("seo-report-{host}-{seconds}")
        });
        Self {
            format: options.format,
            output_dir: options.output_dir.clone(),
            filename,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.filename, self.format.extension()))
    }
}

/// Writes `<output_dir>/<filename>.<ext>`, creating the directory if needed.
pub fn write_report(analysis: &SeoAnalysis, options: &ReportOptions) -> Result<PathBuf, ReportError> {
    let contents = match options.format {
        ReportFormat::Json => serde_json::to_string_pretty(analysis)?,
        ReportFormat::Html => render_html(analysis),
    };

    let path = options.path();
    create_dir(&options.output_dir)?;
    std::fs::write(&path, contents).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), format = %options.format, "report written");
    Ok(path)
}

fn create_dir(dir: &Path) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">None</p>".to_string();
    }
    let entries: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect();
    format!("<ul>{entries}</ul>")
}

fn section(title: &str, score: Option<u32>, issues: &[String], recommendations: &[String]) -> String {
    let score = score.map_or_else(|| "n/a".to_string(), |score| score.to_string());
    format!(
        "<section><h2>{}</h2><p class=\"score\">Score: {score}</p><h3>Issues</h3>{}<h3>Recommendations</h3>{}</section>\n",
        escape_html(title),
        list(issues),
        list(recommendations),
    )
}

fn facet_section(title: &str, facet: &FacetResult) -> String {
    section(title, Some(facet.score), &facet.issues, &facet.recommendations)
}

fn optional_text(value: Option<&str>) -> String {
    value.map_or_else(|| "<em>missing</em>".to_string(), escape_html)
}

pub fn render_html(analysis: &SeoAnalysis) -> String {
    let scores = &analysis.scores;
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>SEO Report</title>\n<style>body{font-family:sans-serif;max-width:960px;margin:2rem auto}section{border-top:1px solid #ddd;padding:1rem 0}.score{font-weight:bold}.empty{color:#888}</style>\n</head>\n<body>\n",
    );

    html.push_str(&format!(
        "<header><h1>SEO Report</h1><p>{}</p><p class=\"score\">Overall score: {}</p><p>Analyzed in {} ms</p></header>\n",
        escape_html(&analysis.url),
        scores.overall,
        analysis.elapsed_ms,
    ));

    html.push_str(&format!(
        "<section><h2>Page</h2><dl><dt>Title</dt><dd>{}</dd><dt>Description</dt><dd>{}</dd><dt>Canonical</dt><dd>{}</dd><dt>Headings</dt><dd>{} (H1: {})</dd><dt>Images</dt><dd>{}</dd><dt>Links</dt><dd>{}</dd><dt>Sitemap</dt><dd>{}</dd></dl></section>\n",
        optional_text(analysis.title.as_deref()),
        optional_text(analysis.description.as_deref()),
        optional_text(analysis.canonical.as_deref()),
        analysis.headings.total(),
        analysis.headings.h1.len(),
        analysis.images.len(),
        analysis.links.len(),
        if analysis.sitemap.found {
            format!("{} URLs", analysis.sitemap.url_count)
        } else {
            "not found".to_string()
        },
    ));

    html.push_str(&facet_section("Metadata", &analysis.metadata));
    let mobile = &analysis.mobile_friendliness;
    html.push_str(&section(
        "Mobile friendliness",
        Some(mobile.score),
        &mobile.issues,
        &mobile.recommendations,
    ));
    let lazy = &analysis.lazy_loading;
    html.push_str(&section("Lazy loading", Some(lazy.score), &lazy.issues, &lazy.recommendations));

    let performance = &analysis.performance;
    html.push_str(&format!(
        "<section><h2>Performance</h2><p class=\"score\">Score: {}</p><dl><dt>First contentful paint</dt><dd>{:.0} ms</dd><dt>Largest contentful paint</dt><dd>{:.0} ms</dd><dt>Total blocking time</dt><dd>{:.0} ms</dd><dt>Cumulative layout shift</dt><dd>{:.3}</dd></dl></section>\n",
        scores.performance.map_or_else(|| "n/a".to_string(), |score| score.to_string()),
        performance.first_contentful_paint,
        performance.largest_contentful_paint,
        performance.total_blocking_time,
        performance.cumulative_layout_shift,
    ));

    let violations: Vec<String> = analysis
        .accessibility
        .violations
        .iter()
        .map(|violation| format!("{} ({} nodes)", violation.title, violation.nodes))
        .collect();
    html.push_str(&section("Accessibility", scores.accessibility, &violations, &[]));

    if let Some(content) = &analysis.content {
        html.push_str(&section("Content", Some(content.score), &content.issues, &content.recommendations));
    }
    if let Some(url) = &analysis.url_analysis {
        html.push_str(&section("URL", Some(url.score), &url.issues, &url.recommendations));
    }
    if let Some(headers) = &analysis.headers_analysis {
        html.push_str(&section("HTTP headers", Some(headers.score), &headers.issues, &headers.recommendations));
    }
    if let Some(social) = &analysis.social {
        html.push_str(&section("Social", Some(social.score), &social.issues, &social.recommendations));
    }
    if let Some(schema) = &analysis.schema {
        html.push_str(&section("Structured data", Some(schema.score), &schema.issues, &schema.recommendations));
    }

    if !analysis.errors.is_empty() {
        let errors: Vec<String> = analysis
            .errors
            .iter()
            .map(|error| format!("{} ({}): {}", error.facet, error.kind, error.message))
            .collect();
        html.push_str(&format!("<section><h2>Errors</h2>{}</section>\n", list(&errors)));
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SeoAnalysis {
        let mut analysis = SeoAnalysis {
            url: "https://example.com/".to_string(),
            title: Some("Fish & <Chips>".to_string()),
            ..Default::default()
        };
        analysis.metadata.score = 75;
        analysis.metadata.issues.push("Missing meta description".to_string());
        analysis
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'b' & c</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;b&#39; &amp; c&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_html_escapes_page_values() {
        let html = render_html(&sample());
        assert!(html.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(html.contains("Missing meta description"));
        assert!(!html.contains("<Chips>"));
    }

    #[test]
    fn test_write_html_report() {
        let dir = tempfile::tempdir().unwrap();
        let options = ReportOptions {
            format: ReportFormat::Html,
            output_dir: dir.path().join("nested"),
            filename: "home".to_string(),
        };
        let path = write_report(&sample(), &options).unwrap();
        assert_eq!(path, dir.path().join("nested").join("home.html"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_unwritable_output_dir_is_an_io_error() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let analysis = sample();
        let before = analysis.clone();
        let options = ReportOptions {
            format: ReportFormat::Json,
            output_dir: blocker.path().to_path_buf(),
            filename: "report".to_string(),
        };

        let result = write_report(&analysis, &options);
        match result {
            Err(ReportError::Io { path, .. }) => assert_eq!(path, blocker.path()),
            other => panic!("expected an Io error, got {other:?}"),
        }
        assert_eq!(analysis, before);

        let dir = tempfile::tempdir().unwrap();
        let retry = ReportOptions {
            output_dir: dir.path().to_path_buf(),
            ..options
        };
        assert!(write_report(&analysis, &retry).is_ok());
    }

    #[test]
    fn test_default_filename_uses_host() {
        let options = AnalysisOptions::default();
        let report = ReportOptions::from_options(&options, "https://www.example.com/about");
        assert!(report.filename.starts_with("seo-report-www-example-com-"));
        assert_eq!(report.format, ReportFormat::Json);
        assert!(report.path().starts_with("seo-reports"));
    }
}
