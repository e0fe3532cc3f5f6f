use std::collections::{BTreeMap, BTreeSet};

use html_parser::{DomError, Node, QueryAll};
use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

use crate::utils::{
    config::PluginError,
    page::Page,
    page_plugin::{FacetReport, SeoPlugin},
    score::{FacetResult, ScoreCard, average, merge_messages},
};

const OPEN_GRAPH_ESSENTIALS: [(&str, i32); 5] = [
    ("title", 20),
    ("description", 15),
    ("image", 20),
    ("url", 10),
    ("type", 10),
];

const TWITTER_ESSENTIALS: [(&str, i32); 4] = [
    ("card", 20),
    ("title", 15),
    ("description", 15),
    ("image", 15),
];

const TWITTER_CARD_TYPES: [&str; 4] = ["summary", "summary_large_image", "app", "player"];

const PROFILE_PLATFORMS: [(&str, &[&str]); 10] = [
    ("Facebook", &["facebook.com"]),
    ("Twitter", &["twitter.com", "x.com"]),
    ("LinkedIn", &["linkedin.com"]),
    ("Instagram", &["instagram.com"]),
    ("YouTube", &["youtube.com", "youtu.be"]),
    ("Pinterest", &["pinterest.com"]),
    ("TikTok", &["tiktok.com"]),
    ("GitHub", &["github.com"]),
    ("Reddit", &["reddit.com"]),
    ("Tumblr", &["tumblr.com"]),
];

const SHARE_PATTERNS: [(&str, &[&str]); 7] = [
    (
        "Facebook",
        &["facebook.com/sharer", "facebook.com/share.php", "facebook.com/dialog/share"],
    ),
    (
        "Twitter",
        &["twitter.com/intent/tweet", "twitter.com/share", "x.com/intent/tweet", "x.com/share"],
    ),
    ("LinkedIn", &["linkedin.com/sharing", "linkedin.com/sharearticle"]),
    ("Pinterest", &["pinterest.com/pin/create"]),
    ("Email", &["mailto:"]),
    ("WhatsApp", &["wa.me/", "api.whatsapp.com/send", "whatsapp://send"]),
    ("Telegram", &["t.me/share", "telegram.me/share"]),
];

/// Only these share links are checked for the page URL.
const URL_CHECKED_SHARES: [&str; 2] = ["Facebook", "Twitter"];

const HIDDEN_CLASSES: [&str; 5] = ["hidden", "sr-only", "d-none", "invisible", "visually-hidden"];
const SOCIAL_PROOF_MARKERS: [&str; 4] = ["share-count", "sharecount", "share_count", "social-count"];

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialAnalysis {
    pub score: u32,
    pub open_graph: FacetResult,
    pub twitter_card: FacetResult,
    pub social_links: FacetResult,
    pub social_sharing: FacetResult,
    pub linked_platforms: Vec<String>,
    pub share_platforms: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn analyze_social(document: &impl QueryAll, page_url: &str) -> Result<SocialAnalysis, DomError> {
    let open_graph_tags = prefixed_meta(document, "og:")?;
    let twitter_tags = prefixed_meta(document, "twitter:")?;
    let anchors = document.query_all("a[href]")?;

    let open_graph = check_open_graph(&open_graph_tags);
    let twitter_card = check_twitter_card(&twitter_tags, !open_graph_tags.is_empty());
    let (social_links, linked_platforms) = check_social_links(&anchors)?;
    let (social_sharing, share_platforms) = check_social_sharing(document, &anchors, page_url)?;

    let parts = [&open_graph, &twitter_card, &social_links, &social_sharing];
    let score = average(&parts.map(|part| part.score));
    let (issues, recommendations) = merge_messages(parts);

    Ok(SocialAnalysis {
        score,
        open_graph,
        twitter_card,
        social_links,
        social_sharing,
        linked_platforms,
        share_platforms,
        issues,
        recommendations,
    })
}

/// `<meta property|name="{prefix}key" content>` pairs, prefix stripped.
fn prefixed_meta(document: &impl QueryAll, prefix: &str) -> Result<BTreeMap<String, String>, DomError> {
    let mut tags = BTreeMap::new();
    for meta in document.query_all("meta[content]")? {
        let key = meta.attr("property").or_else(|| meta.attr("name"));
        if let (Some(key), Some(content)) = (key, meta.attr("content")) {
            if let Some(stripped) = key.strip_prefix(prefix) {
                tags.insert(stripped.to_string(), content.to_string());
            }
        }
    }
    Ok(tags)
}

fn is_absolute_url(value: &str) -> bool {
    (value.starts_with("http://") || value.starts_with("https://")) && Url::parse(value).is_ok()
}

fn check_open_graph(tags: &BTreeMap<String, String>) -> FacetResult {
    let mut card = ScoreCard::new(0);
    if tags.is_empty() {
        card.issue("No Open Graph tags found")
            .recommend("Add Open Graph meta tags to control how the page looks when shared");
        return card.finish();
    }

    card.award(20);
    for (property, points) in OPEN_GRAPH_ESSENTIALS {
        if tags.contains_key(property) {
            card.award(points);
        } else {
            card.penalize(
                0,
                format!("Missing og:{property} tag"),
                format!("Add an og:{property} meta tag"),
            );
        }
    }
    if tags.contains_key("site_name") {
        card.award(5);
    }
    if let Some(image) = tags.get("image") {
        if !is_absolute_url(image) {
            card.penalize(
                10,
                "og:image is not an absolute URL",
                "Use a full https:// URL for og:image",
            );
        }
    }
    if tags.contains_key("image:width") && tags.contains_key("image:height") {
        card.award(5);
    }

    card.finish()
}

fn check_twitter_card(tags: &BTreeMap<String, String>, has_open_graph: bool) -> FacetResult {
    let mut card = ScoreCard::new(0);
    if tags.is_empty() {
        card.issue("No Twitter Card tags found")
            .recommend("Add twitter:card and related meta tags");
        if has_open_graph {
            card.award(10)
                .recommend("Twitter falls back to Open Graph tags, but explicit Twitter tags give more control");
        }
        return card.finish();
    }

    card.award(20);
    for (property, points) in TWITTER_ESSENTIALS {
        if tags.contains_key(property) {
            card.award(points);
        } else {
            card.penalize(
                0,
                format!("Missing twitter:{property} tag"),
                format!("Add a twitter:{property} meta tag"),
            );
        }
    }
    if tags.contains_key("site") {
        card.award(5);
    }
    if let Some(kind) = tags.get("card") {
        if !TWITTER_CARD_TYPES.contains(&kind.as_str()) {
            card.penalize(
                10,
                format!("Invalid twitter:card type: {kind}"),
                "Use summary, summary_large_image, app or player",
            );
        }
    }
    if let Some(image) = tags.get("image") {
        if !is_absolute_url(image) {
            card.penalize(
                10,
                "twitter:image is not an absolute URL",
                "Use a full https:// URL for twitter:image",
            );
        }
    }

    card.finish()
}

fn share_platform(href: &str) -> Option<&'static str> {
    let href = href.to_lowercase();
    SHARE_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|pattern| href.contains(pattern)))
        .map(|(name, _)| *name)
}

fn profile_platform(href: &str) -> Option<&'static str> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    PROFILE_PLATFORMS
        .iter()
        .find(|(_, domains)| {
            domains
                .iter()
                .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
        })
        .map(|(name, _)| *name)
}

fn is_hidden(node: &Node) -> bool {
    let hidden_class = |classes: &[String]| {
        classes
            .iter()
            .any(|class| HIDDEN_CLASSES.iter().any(|hidden| class.eq_ignore_ascii_case(hidden)))
    };
    node.hidden_by_markup()
        || HIDDEN_CLASSES.iter().any(|class| node.has_class(class))
        || node
            .ancestors()
            .iter()
            .any(|ancestor| ancestor.hidden || hidden_class(&ancestor.classes))
}

fn has_visible_label(node: &Node) -> Result<bool, DomError> {
    if !node.trimmed_text().is_empty() {
        return Ok(true);
    }
    node.exists("img, svg, i")
}

fn check_social_links(anchors: &[Node]) -> Result<(FacetResult, Vec<String>), DomError> {
    let mut card = ScoreCard::new(0);
    let matched: Vec<(&str, &Node)> = anchors
        .iter()
        .filter_map(|anchor| {
            let href = anchor.attr("href")?;
            if share_platform(href).is_some() {
                return None;
            }
            profile_platform(href).map(|platform| (platform, anchor))
        })
        .collect();

    if matched.is_empty() {
        card.issue("No social media profile links found")
            .recommend("Link to the site's social media profiles");
        return Ok((card.finish(), Vec::new()));
    }

    let platforms: BTreeSet<&str> = matched.iter().map(|(platform, _)| *platform).collect();
    card.set((platforms.len() as i32 * 15).min(60));

    if matched.iter().any(|(_, link)| link.within(&["header", "footer"])) {
        card.award(20);
    } else {
        card.recommend("Place social profile links in the site header or footer");
    }
    if matched.iter().any(|(_, link)| is_hidden(link)) {
        card.penalize(
            10,
            "Some social media links are hidden",
            "Make social media links visible to visitors",
        );
    }
    if matched
        .iter()
        .all(|(_, link)| link.attr("target") == Some("_blank"))
    {
        card.award(10);
    } else {
        card.recommend("Open social media links in a new tab");
    }
    let mut unlabeled = false;
    for (_, link) in &matched {
        if !has_visible_label(link)? {
            unlabeled = true;
        }
    }
    if unlabeled {
        card.penalize(
            10,
            "Some social media links have no visible text or icon",
            "Give every social link a label or recognizable icon",
        );
    }

    Ok((
        card.finish(),
        platforms.into_iter().map(str::to_string).collect(),
    ))
}

fn in_main_content(node: &Node) -> bool {
    node.within(&["main", "article", "content"])
        || node
            .ancestors()
            .iter()
            .any(|ancestor| ancestor.role.as_deref() == Some("main"))
}

fn check_social_sharing(
    document: &impl QueryAll,
    anchors: &[Node],
    page_url: &str,
) -> Result<(FacetResult, Vec<String>), DomError> {
    let mut card = ScoreCard::new(0);
    let shares: Vec<(&str, &Node)> = anchors
        .iter()
        .filter_map(|anchor| share_platform(anchor.attr("href")?).map(|platform| (platform, anchor)))
        .collect();

    if shares.is_empty() {
        let hinted = document
            .query_all("[class], [id], [aria-label]")?
            .iter()
            .any(|node| {
                ["class", "id", "aria-label"].iter().any(|attr| {
                    node.attr(attr)
                        .is_some_and(|value| value.to_lowercase().contains("share"))
                })
            });
        if hinted {
            card.award(30)
                .recommend("Use standard share URLs so sharing works without JavaScript");
        } else {
            card.issue("No social sharing options found")
                .recommend("Add share buttons for the main social platforms");
        }
        return Ok((card.finish(), Vec::new()));
    }

    let platforms: BTreeSet<&str> = shares.iter().map(|(platform, _)| *platform).collect();
    card.set((platforms.len() as i32 * 15).min(60));

    let canonical = document
        .query_first(r#"link[rel="canonical"]"#)?
        .and_then(|link| link.attr("href").map(str::to_string))
        .unwrap_or_else(|| page_url.to_string());
    let encoded = form_urlencoded::byte_serialize(canonical.as_bytes())
        .collect::<String>()
        .to_lowercase();
    for platform in URL_CHECKED_SHARES {
        let links: Vec<&Node> = shares
            .iter()
            .filter(|(name, _)| *name == platform)
            .map(|(_, link)| *link)
            .collect();
        if links.is_empty() {
            continue;
        }
        let references_page = links.iter().any(|link| {
            link.attr("href")
                .is_some_and(|href| href.to_lowercase().contains(&encoded))
        });
        if !references_page {
            card.penalize(
                10,
                format!("{platform} share link does not reference this page's URL"),
                format!("Include the encoded canonical URL in the {platform} share link"),
            );
        }
    }

    let social_proof = document
        .query_all("[class], [id], [data-share-count]")?
        .iter()
        .any(|node| {
            node.has_attr("data-share-count")
                || ["class", "id"].iter().any(|attr| {
                    node.attr(attr).is_some_and(|value| {
                        let value = value.to_lowercase();
                        SOCIAL_PROOF_MARKERS.iter().any(|marker| value.contains(marker))
                    })
                })
        });
    if social_proof {
        card.award(10);
    }

    if shares.iter().any(|(_, link)| in_main_content(link)) {
        card.award(20);
    } else {
        card.recommend("Place sharing buttons next to the main content");
    }

    Ok((
        card.finish(),
        platforms.into_iter().map(str::to_string).collect(),
    ))
}

// Social Plugin
pub struct SocialPlugin {}

impl Default for SocialPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl SeoPlugin for SocialPlugin {
    fn name(&self) -> &str {
        "social"
    }
    fn description(&self) -> &str {
        "Open Graph, Twitter Card, social profile links and share buttons"
    }

    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError> {
        let document = page.get_document();
        Ok(FacetReport::Social(analyze_social(&document, page.get_url())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html_parser::{Ancestor, ParsedDocument};

    fn analyze(html: &str) -> SocialAnalysis {
        analyze_social(&ParsedDocument::parse(html), "https://example.com/post").unwrap()
    }

    #[test]
    fn test_open_graph_scoring() {
        let analysis = analyze(
            r#"<head>
                <meta property="og:title" content="Post">
                <meta property="og:description" content="About the post">
                <meta property="og:image" content="/cover.png">
                <meta property="og:type" content="article">
                <meta property="og:site_name" content="Example">
            </head>"#,
        );
        // 20 + 20 + 15 + 20 + 10 + 5 - 10 (relative image), missing og:url
        assert_eq!(analysis.open_graph.score, 80);
        assert_eq!(analysis.open_graph.issues.len(), 2);
    }

    #[test]
    fn test_twitter_falls_back_to_open_graph() {
        let analysis = analyze(r#"<meta property="og:title" content="Post">"#);
        assert_eq!(analysis.twitter_card.score, 10);
        assert_eq!(analysis.twitter_card.issues.len(), 1);

        let bare = analyze("<p>nothing</p>");
        assert_eq!(bare.twitter_card.score, 0);
    }

    #[test]
    fn test_twitter_card_validation() {
        let analysis = analyze(
            r#"<meta name="twitter:card" content="gallery">
               <meta name="twitter:title" content="Post">
               <meta name="twitter:site" content="@example">
               <meta name="twitter:image" content="https://example.com/a.png">"#,
        );
        // 20 + 20 + 15 + 15 + 5 - 10 (invalid card), missing description
        assert_eq!(analysis.twitter_card.score, 65);
    }

    #[test]
    fn test_social_profile_links() {
        let analysis = analyze(
            r#"<body>
                <footer class="site-footer">
                    <a href="https://github.com/acme" target="_blank">GitHub</a>
                    <a href="https://twitter.com/acme" target="_blank"><svg></svg></a>
                    <a href="https://www.linkedin.com/company/acme" target="_blank" class="hidden">LinkedIn</a>
                    <a href="https://twitter.com/intent/tweet?text=hi">Tweet</a>
                </footer>
            </body>"#,
        );
        // 3 platforms (45) + footer 20 + new tab 10 - hidden 10
        assert_eq!(analysis.social_links.score, 65);
        assert_eq!(analysis.linked_platforms, vec!["GitHub", "LinkedIn", "Twitter"]);
    }

    #[test]
    fn test_links_inside_hidden_wrappers_count_as_hidden() {
        let visible = analyze(
            r#"<footer>
                <a href="https://github.com/acme" target="_blank">GitHub</a>
                <a href="https://twitter.com/acme" target="_blank">Twitter</a>
            </footer>"#,
        );
        // 2 platforms (30) + footer 20 + new tab 10
        assert_eq!(visible.social_links.score, 60);

        for wrapper in [
            r#"<div style="display: none">"#,
            "<div hidden>",
            r#"<div class="sr-only">"#,
        ] {
            let analysis = analyze(&format!(
                r#"<footer>
                    <a href="https://github.com/acme" target="_blank">GitHub</a>
                    {wrapper}<a href="https://twitter.com/acme" target="_blank">Twitter</a></div>
                </footer>"#
            ));
            assert_eq!(analysis.social_links.score, 50, "{wrapper}");
            assert!(
                analysis
                    .social_links
                    .issues
                    .contains(&"Some social media links are hidden".to_string())
            );
        }
    }

    #[test]
    fn test_unlabeled_social_link() {
        let links = vec![
            Node::new("a")
                .with_attr("href", "https://instagram.com/acme")
                .with_ancestor(Ancestor::new("nav")),
        ];
        let (result, platforms) = check_social_links(&links).unwrap();
        // 15 - 10 (no label), not in header/footer, no new tab
        assert_eq!(result.score, 5);
        assert_eq!(platforms, vec!["Instagram"]);
    }

    #[test]
    fn test_social_sharing_checks_page_url_for_facebook_and_twitter_only() {
        let analysis = analyze(
            r#"<body><article>
                <a href="https://www.facebook.com/sharer/sharer.php?u=https%3A%2F%2Fexample.com%2Fpost">Share</a>
                <a href="https://twitter.com/intent/tweet?text=hello">Tweet</a>
                <a href="https://www.linkedin.com/sharing/share-offsite/?url=https://other.example">LinkedIn</a>
            </article></body>"#,
        );
        // 3 options (45) - twitter missing url 10 + main content 20
        assert_eq!(analysis.social_sharing.score, 55);
        assert_eq!(analysis.social_sharing.issues.len(), 1);
        assert!(analysis.social_sharing.issues[0].starts_with("Twitter"));
    }

    #[test]
    fn test_share_hint_without_share_links() {
        let analysis = analyze(r#"<div class="share-buttons"></div>"#);
        assert_eq!(analysis.social_sharing.score, 30);

        let none = analyze("<div></div>");
        assert_eq!(none.social_sharing.score, 0);
        assert_eq!(none.social_sharing.issues.len(), 1);
    }
}
