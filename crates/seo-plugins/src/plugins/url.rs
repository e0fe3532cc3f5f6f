use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::{
    config::PluginError,
    page::Page,
    page_plugin::{FacetReport, SeoPlugin},
    score::{FacetResult, ScoreCard, average, merge_messages},
};

const TRACKING_PARAMS: [&str; 5] = ["gclid", "fbclid", "ref", "source", "campaign"];
const SESSION_MARKERS: [&str; 6] = ["sid", "session", "sessid", "id", "token", "auth"];
const PAGE_EXTENSIONS: [&str; 3] = ["html", "htm", "php"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysis {
    pub url: String,
    pub score: u32,
    pub protocol: FacetResult,
    pub domain: FacetResult,
    pub path: FacetResult,
    pub query: FacetResult,
    pub crawl_path: FacetResult,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn analyze_url(raw_url: &str, sibling_urls: &[String]) -> UrlAnalysis {
    let url = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            return UrlAnalysis {
                url: raw_url.to_string(),
                issues: vec![format!("Invalid URL: {e}")],
                ..Default::default()
            };
        }
    };

    let protocol = check_protocol(&url);
    let domain = check_domain(&url);
    let path = check_path(&url);
    let query = check_query(&url);
    let crawl_path = check_crawl_path(&url, sibling_urls);

    let parts = [&protocol, &domain, &path, &query, &crawl_path];
    let score = average(&parts.map(|part| part.score));
    let (issues, recommendations) = merge_messages(parts);

    UrlAnalysis {
        url: url.to_string(),
        score,
        protocol,
        domain,
        path,
        query,
        crawl_path,
        issues,
        recommendations,
    }
}

fn check_protocol(url: &Url) -> FacetResult {
    match url.scheme() {
        "https" => ScoreCard::new(100).finish(),
        "http" => {
            let mut card = ScoreCard::new(40);
            card.penalize(
                0,
                "URL uses insecure HTTP protocol",
                "Migrate the site to HTTPS and redirect HTTP requests",
            );
            card.finish()
        }
        other => {
            let mut card = ScoreCard::new(20);
            card.issue(format!("Unsupported protocol: {other}:"));
            card.finish()
        }
    }
}

fn check_domain(url: &Url) -> FacetResult {
    let mut card = ScoreCard::new(100);
    let host = url.host_str().unwrap_or_default().to_lowercase();

    if host.len() > 50 {
        card.penalize(
            20,
            format!("Hostname is too long ({} characters)", host.len()),
            "Use a shorter, memorable domain name",
        );
    }

    // IP addresses have no labels worth judging.
    if url.domain().is_some() {
        let bare = host.strip_prefix("www.").unwrap_or(&host);
        let labels: Vec<&str> = bare.split('.').collect();
        if labels.len().saturating_sub(2) > 1 {
            card.penalize(
                10,
                "URL uses multiple levels of subdomains",
                "Keep content on the main domain or a single subdomain",
            );
        }

        let label = if labels.len() >= 2 {
            labels[labels.len() - 2]
        } else {
            bare
        };
        if label.matches('-').count() > 1 {
            card.penalize(
                15,
                "Domain name contains multiple hyphens",
                "Avoid more than one hyphen in the domain name",
            );
        }
        if label.chars().any(|c| c.is_ascii_digit()) {
            card.deduct(5)
                .recommend("Avoid digits in the domain name unless they are part of the brand");
        }
    }

    card.finish()
}

/// Splits `page.html` into `("page", Some("html"))`.
fn split_extension(segment: &str) -> (&str, Option<&str>) {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (segment, None),
    }
}

fn check_path(url: &Url) -> FacetResult {
    let mut card = ScoreCard::new(100);
    let path = url.path();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let extension = segments
        .last()
        .filter(|_| !path.ends_with('/'))
        .and_then(|last| split_extension(last).1);

    if path.len() > 100 {
        card.penalize(
            20,
            format!("URL path is too long ({} characters)", path.len()),
            "Keep URL paths under 100 characters",
        );
    }
    if segments.len() > 4 {
        card.penalize(
            10,
            format!("URL path is nested {} levels deep", segments.len()),
            "Flatten the URL structure to four levels or fewer",
        );
    }
    if path.chars().any(char::is_uppercase) {
        card.penalize(
            15,
            "URL path contains uppercase letters",
            "Use lowercase letters in URLs",
        );
    }

    let checked = match extension {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    };
    if checked
        .chars()
        .any(|c| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '/'))
    {
        card.penalize(
            15,
            "URL path contains special characters",
            "Use only letters, numbers and hyphens in URL paths",
        );
    }
    if path.contains('_') {
        card.penalize(
            10,
            "URL path uses underscores",
            "Use hyphens instead of underscores to separate words",
        );
    }
    if let Some(ext) = extension {
        if !PAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            card.penalize(
                5,
                format!("URL ends with a .{ext} file extension"),
                "Serve pages from extension-less URLs",
            );
        }
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for segment in &segments {
        let (stem, _) = split_extension(segment);
        for word in stem.split(['-', '_']).filter(|w| !w.is_empty()) {
            *counts.entry(word.to_lowercase()).or_default() += 1;
        }
    }
    if counts.values().any(|&count| count > 1) {
        card.penalize(
            15,
            "URL path repeats the same words",
            "Avoid keyword repetition in URL segments",
        );
    }

    card.finish()
}

fn check_query(url: &Url) -> FacetResult {
    let mut card = ScoreCard::new(100);
    let params: Vec<String> = url
        .query_pairs()
        .map(|(key, _)| key.to_lowercase())
        .collect();

    if !params.is_empty() {
        card.deduct(10)
            .recommend("Prefer clean URLs without query parameters for indexable content");
        if params.len() > 3 {
            let extra = (params.len() - 3).min(5) as i32;
            card.penalize(
                10 * extra,
                format!("URL has too many query parameters ({})", params.len()),
                "Reduce the number of query parameters",
            );
        }
    }

    if params
        .iter()
        .any(|key| key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str()))
    {
        card.penalize(
            15,
            "URL contains tracking parameters",
            "Strip tracking parameters from canonical URLs",
        );
    }
    if params
        .iter()
        .any(|key| SESSION_MARKERS.iter().any(|marker| key.contains(marker)))
    {
        card.penalize(
            20,
            "URL contains session or identifier parameters",
            "Keep session identifiers out of URLs",
        );
    }

    card.finish()
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

fn parent_path(url: &Url) -> String {
    let segments = path_segments(url);
    segments[..segments.len().saturating_sub(1)].join("/")
}

fn check_crawl_path(url: &Url, sibling_urls: &[String]) -> FacetResult {
    let mut card = ScoreCard::new(100);
    let siblings: Vec<Url> = sibling_urls
        .iter()
        .filter_map(|sibling| Url::parse(sibling).ok())
        .collect();

    if siblings.is_empty() {
        card.recommend("Provide sibling URLs to compare crawl depth and URL consistency");
        return card.finish();
    }

    let depth = path_segments(url).len() as f64;
    let average_depth =
        siblings.iter().map(|s| path_segments(s).len()).sum::<usize>() as f64 / siblings.len() as f64;
    if depth > average_depth + 2.0 {
        card.penalize(
            15,
            format!("Page is nested deeper ({depth}) than its siblings (average {average_depth:.1})"),
            "Move the page closer to the site root",
        );
    }

    let parent = parent_path(url);
    let sharing_parent = siblings
        .iter()
        .filter(|s| s.path() != url.path() && parent_path(s) == parent)
        .count();
    if sharing_parent < 2 {
        card.deduct(5)
            .recommend("Group related pages under a shared parent path");
    }

    let trailing_slash = |u: &Url| u.path() != "/" && u.path().ends_with('/');
    let has_uppercase = |u: &Url| u.path().chars().any(char::is_uppercase);
    let inconsistent = siblings.iter().any(|s| {
        let slash_differs = url.path() != "/" && s.path() != "/" && trailing_slash(s) != trailing_slash(url);
        slash_differs || has_uppercase(s) != has_uppercase(url)
    });
    if inconsistent {
        card.penalize(
            10,
            "URL format is inconsistent with sibling pages (trailing slash or letter case)",
            "Use one trailing-slash and letter-case convention across the site",
        );
    }

    card.finish()
}

// Url Plugin
pub struct UrlPlugin {}

impl Default for UrlPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl SeoPlugin for UrlPlugin {
    fn name(&self) -> &str {
        "url"
    }
    fn description(&self) -> &str {
        "URL protocol, domain, path, query and crawl-path hygiene"
    }

    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError> {
        Ok(FacetReport::Url(analyze_url(
            page.get_url(),
            page.get_sibling_urls(),
        )))
    }
}
