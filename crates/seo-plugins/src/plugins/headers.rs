use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::{
    config::PluginError,
    page::Page,
    page_plugin::{FacetReport, SeoPlugin},
    score::{FacetResult, ScoreCard, average, merge_messages},
};

const ONE_DAY: u64 = 86_400;
const ONE_YEAR: u64 = 31_536_000;

static MAX_AGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[,;\s])max-age\s*=\s*(\d+)").expect("max-age pattern"));

/// (header, points, display name)
const SECURITY_HEADERS: [(&str, i32, &str); 7] = [
    ("strict-transport-security", 15, "Strict-Transport-Security"),
    ("content-security-policy", 15, "Content-Security-Policy"),
    ("x-frame-options", 10, "X-Frame-Options"),
    ("x-content-type-options", 10, "X-Content-Type-Options"),
    ("referrer-policy", 10, "Referrer-Policy"),
    ("permissions-policy", 10, "Permissions-Policy"),
    ("x-xss-protection", 10, "X-XSS-Protection"),
];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeadersAnalysis {
    pub score: u32,
    pub cache: FacetResult,
    pub security: FacetResult,
    pub content: FacetResult,
    pub compression: FacetResult,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn analyze_headers(raw: &BTreeMap<String, String>) -> HeadersAnalysis {
    if raw.is_empty() {
        return HeadersAnalysis {
            issues: vec!["No HTTP headers available for analysis".to_string()],
            ..Default::default()
        };
    }

    let headers: BTreeMap<String, String> = raw
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
        .collect();

    let cache = check_cache(&headers);
    let security = check_security(&headers);
    let content = check_content(&headers);
    let compression = check_compression(&headers);

    let parts = [&cache, &security, &content, &compression];
    let score = average(&parts.map(|part| part.score));
    let (issues, recommendations) = merge_messages(parts);

    HeadersAnalysis {
        score,
        cache,
        security,
        content,
        compression,
        issues,
        recommendations,
    }
}

fn max_age(value: &str) -> Option<u64> {
    MAX_AGE
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|age| age.as_str().parse().ok())
}

fn lowered(headers: &BTreeMap<String, String>, name: &str) -> Option<String> {
    headers.get(name).map(|value| value.to_lowercase())
}

fn check_cache(headers: &BTreeMap<String, String>) -> FacetResult {
    let mut card = ScoreCard::new(0);

    match lowered(headers, "cache-control") {
        None => {
            card.issue("Missing Cache-Control header")
                .recommend("Add a Cache-Control header with an appropriate max-age");
        }
        Some(value) => {
            card.award(40);
            if value.contains("no-store") || value.contains("no-cache") {
                card.issue("Cache-Control disables caching (no-store/no-cache)")
                    .recommend("Allow caching for static, public pages");
            }
            match max_age(&value) {
                Some(age) if age >= ONE_DAY => {
                    card.award(30);
                }
                Some(age) => {
                    card.issue(format!("Cache-Control max-age is short ({age}s)"))
                        .recommend("Use a max-age of at least one day for cacheable resources");
                }
                None => {
                    card.recommend("Set an explicit max-age in Cache-Control");
                }
            }
            if !value.contains("public") && !value.contains("private") {
                card.recommend("Declare the response as public or private in Cache-Control");
            }
        }
    }

    if headers.contains_key("etag") {
        card.award(15);
    } else {
        card.issue("Missing ETag header")
            .recommend("Send an ETag so clients can revalidate cheaply");
    }
    if headers.contains_key("last-modified") {
        card.award(15);
    } else {
        card.issue("Missing Last-Modified header")
            .recommend("Send a Last-Modified header for conditional requests");
    }

    card.finish_clean_bonus()
}

fn check_security(headers: &BTreeMap<String, String>) -> FacetResult {
    let mut card = ScoreCard::new(0);

    for (name, points, display) in SECURITY_HEADERS {
        if headers.contains_key(name) {
            card.award(points);
        } else {
            card.penalize(
                0,
                format!("Missing {display} header"),
                format!("Add the {display} header"),
            );
        }
    }

    if let Some(hsts) = lowered(headers, "strict-transport-security") {
        match max_age(&hsts) {
            Some(age) if age >= ONE_YEAR => {
                card.award(20);
            }
            _ => {
                card.issue("Strict-Transport-Security max-age is shorter than one year")
                    .recommend("Set HSTS max-age to at least 31536000 seconds");
            }
        }
    }

    card.finish_clean_bonus()
}

fn check_content(headers: &BTreeMap<String, String>) -> FacetResult {
    let mut card = ScoreCard::new(0);

    match lowered(headers, "content-type") {
        Some(content_type) => {
            card.award(40);
            if content_type.contains("charset=utf-8") {
                card.award(20);
            } else if content_type.contains("charset=") {
                card.award(15)
                    .recommend("Serve pages with charset=utf-8");
            } else {
                card.issue("Content-Type does not declare a charset")
                    .recommend("Add charset=utf-8 to the Content-Type header");
            }
        }
        None => {
            card.issue("Missing Content-Type header")
                .recommend("Send Content-Type: text/html; charset=utf-8");
        }
    }

    if headers.contains_key("content-language") {
        card.award(20);
    } else {
        card.recommend("Add a Content-Language header");
    }

    if let Some(robots) = lowered(headers, "x-robots-tag") {
        card.award(20);
        if robots.contains("noindex") {
            card.issue("X-Robots-Tag prevents indexing (noindex)")
                .recommend("Remove noindex from X-Robots-Tag if the page should rank");
        }
    }

    card.finish_clean_bonus()
}

/// Scored on encoding strength alone; a clean result is not promoted to 100.
fn check_compression(headers: &BTreeMap<String, String>) -> FacetResult {
    let mut card = match lowered(headers, "content-encoding") {
        None => {
            let mut card = ScoreCard::new(0);
            card.issue("Response is not compressed")
                .recommend("Enable Brotli or gzip compression");
            card
        }
        Some(encoding) if encoding.contains("br") => ScoreCard::new(100),
        Some(encoding) if encoding.contains("gzip") => {
            let mut card = ScoreCard::new(80);
            card.recommend("Prefer Brotli over gzip for better compression");
            card
        }
        Some(encoding) if encoding.contains("deflate") => {
            let mut card = ScoreCard::new(70);
            card.recommend("Prefer Brotli or gzip over deflate");
            card
        }
        Some(encoding) => {
            let mut card = ScoreCard::new(50);
            card.issue(format!("Unrecognized content encoding: {encoding}"))
                .recommend("Use Brotli or gzip compression");
            card
        }
    };

    let vary_ok = lowered(headers, "vary").is_some_and(|vary| vary.contains("accept-encoding"));
    if !vary_ok {
        card.penalize(
            20,
            "Vary header does not include Accept-Encoding",
            "Add Vary: Accept-Encoding so caches keep compressed variants apart",
        );
    }

    card.finish()
}

// Headers Plugin
pub struct HeadersPlugin {}

impl Default for HeadersPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadersPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl SeoPlugin for HeadersPlugin {
    fn name(&self) -> &str {
        "headers"
    }
    fn description(&self) -> &str {
        "HTTP caching, security, content and compression headers"
    }

    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError> {
        Ok(FacetReport::Headers(analyze_headers(page.get_headers())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn clean_headers(encoding: &str) -> BTreeMap<String, String> {
        headers(&[
            ("Cache-Control", "public"),
            ("ETag", "\"abc\""),
            ("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            ("Strict-Transport-Security", "max-age=63072000; includeSubDomains"),
            ("Content-Security-Policy", "default-src 'self'"),
            ("X-Frame-Options", "DENY"),
            ("X-Content-Type-Options", "nosniff"),
            ("Referrer-Policy", "strict-origin"),
            ("Permissions-Policy", "geolocation=()"),
            ("X-XSS-Protection", "1; mode=block"),
            ("Content-Type", "text/html; charset=UTF-8"),
            ("Content-Encoding", encoding),
            ("Vary", "Accept-Encoding"),
        ])
    }

    #[test]
    fn test_empty_headers_score_zero() {
        let analysis = analyze_headers(&BTreeMap::new());
        assert_eq!(analysis.score, 0);
        assert_eq!(analysis.issues.len(), 1);
    }

    #[test]
    fn test_missing_cache_headers() {
        let analysis = analyze_headers(&headers(&[("Content-Type", "text/html")]));
        assert_eq!(analysis.cache.score, 0);
        assert_eq!(analysis.cache.issues.len(), 3);
    }

    #[test]
    fn test_clean_sub_scores_are_forced_to_100() {
        let analysis = analyze_headers(&clean_headers("gzip"));

        // 40 + 15 + 15 raw, no issues
        assert!(analysis.cache.issues.is_empty());
        assert_eq!(analysis.cache.score, 100);
        assert!(analysis.security.issues.is_empty());
        assert_eq!(analysis.security.score, 100);
        // 60 raw, only recommendations
        assert!(analysis.content.issues.is_empty());
        assert_eq!(analysis.content.score, 100);
    }

    #[test]
    fn test_compression_is_not_forced_to_100() {
        // Documented quirk: a clean compression check keeps its raw score.
        let analysis = analyze_headers(&clean_headers("gzip"));
        assert!(analysis.compression.issues.is_empty());
        assert_eq!(analysis.compression.score, 80);
        assert_ne!(analysis.compression.score, 100);

        let brotli = analyze_headers(&clean_headers("br"));
        assert_eq!(brotli.compression.score, 100);
        assert_eq!(brotli.score, 100);
    }

    #[test]
    fn test_compression_requires_vary() {
        let analysis = analyze_headers(&headers(&[("content-encoding", "deflate")]));
        assert_eq!(analysis.compression.score, 50);
        assert_eq!(analysis.compression.issues.len(), 1);
    }

    #[test]
    fn test_security_and_content_issues() {
        let analysis = analyze_headers(&headers(&[
            ("strict-transport-security", "max-age=300"),
            ("content-type", "text/html; charset=iso-8859-1"),
            ("x-robots-tag", "noindex, nofollow"),
        ]));
        // 15 points, six missing headers plus a short HSTS max-age
        assert_eq!(analysis.security.score, 15);
        assert_eq!(analysis.security.issues.len(), 7);
        // 40 + 15 + 20, noindex flagged
        assert_eq!(analysis.content.score, 75);
        assert_eq!(analysis.content.issues.len(), 1);
    }

    #[test]
    fn test_short_cache_max_age() {
        let analysis = analyze_headers(&headers(&[
            ("cache-control", "no-cache, max-age=60"),
            ("etag", "x"),
        ]));
        // 40 + 15, no-cache, short max-age and missing last-modified
        assert_eq!(analysis.cache.score, 55);
        assert_eq!(analysis.cache.issues.len(), 3);
    }
}
