use serde::{Deserialize, Serialize};

/// Only the first entries are kept in the report.
const MAX_LISTED_URLS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SitemapSummary {
    pub found: bool,
    pub is_index: bool,
    pub url_count: usize,
    pub urls: Vec<String>,
    pub parse_error: Option<String>,
}

/// Where to look for a sitemap: the page's `<link rel="sitemap">`, then
/// `Sitemap:` lines of robots.txt, then `/sitemap.xml`.
pub fn sitemap_locations(linked: Option<&str>, robots_txt: Option<&str>) -> Vec<String> {
    let mut locations: Vec<String> = linked.map(str::to_string).into_iter().collect();
    if let Some(robots) = robots_txt {
        locations.extend(robots.lines().filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("sitemap")
                .then(|| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }));
    }
    locations.push("/sitemap.xml".to_string());
    locations.dedup();
    locations
}

pub fn summarize_sitemap(content: &str) -> SitemapSummary {
    let document = match roxmltree::Document::parse(content) {
        Ok(document) => document,
        Err(e) => {
            return SitemapSummary {
                found: true,
                parse_error: Some(e.to_string()),
                ..Default::default()
            };
        }
    };

    let is_index = document.root_element().has_tag_name("sitemapindex");
    let locations: Vec<String> = document
        .descendants()
        .filter(|node| node.has_tag_name("loc"))
        .filter_map(|node| node.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    SitemapSummary {
        found: true,
        is_index,
        url_count: locations.len(),
        urls: locations.into_iter().take(MAX_LISTED_URLS).collect(),
        parse_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sitemap() {
        let summary = summarize_sitemap(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>https://example.com/</loc></url>
                <url><loc> https://example.com/about </loc></url>
            </urlset>"#,
        );
        assert!(summary.found);
        assert!(!summary.is_index);
        assert_eq!(summary.url_count, 2);
        assert_eq!(summary.urls[1], "https://example.com/about");
    }

    #[test]
    fn test_sitemap_index() {
        let summary = summarize_sitemap(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <sitemap><loc>https://example.com/posts.xml</loc></sitemap>
            </sitemapindex>"#,
        );
        assert!(summary.is_index);
        assert_eq!(summary.url_count, 1);
    }

    #[test]
    fn test_malformed_sitemap() {
        let summary = summarize_sitemap("<urlset><url>");
        assert!(summary.parse_error.is_some());
        assert_eq!(summary.url_count, 0);
    }

    #[test]
    fn test_sitemap_locations() {
        let locations = sitemap_locations(
            None,
            Some("User-agent: *\nDisallow: /admin\nSitemap: https://example.com/sitemap_index.xml\n"),
        );
        assert_eq!(
            locations,
            vec!["https://example.com/sitemap_index.xml", "/sitemap.xml"]
        );
    }
}
