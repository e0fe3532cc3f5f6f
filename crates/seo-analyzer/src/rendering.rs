use html_parser::ParsedDocument;
use serde::{Deserialize, Serialize};

/// Below this much visible text, a page with framework markers is treated as
/// rendered in the browser.
const CLIENT_RENDERED_TEXT: usize = 200;

const FRAMEWORK_MARKERS: [(&str, &[&str]); 7] = [
    ("Next.js", &["__next_data__", "_next/static", "id=\"__next\""]),
    ("Nuxt.js", &["__nuxt", "_nuxt/"]),
    ("React", &["data-reactroot", "data-reactid", "react-dom"]),
    ("Angular", &["ng-version", "ng-app", "ng-controller"]),
    ("Vue.js", &["data-v-", "__vue__", "vue-router"]),
    ("Svelte", &["__svelte", "svelte-"]),
    ("Gatsby", &["___gatsby"]),
];

const APP_ROOTS: [&str; 4] = ["id=\"app\"", "id=\"root\"", "id=\"__app\"", "id=\"___gatsby\""];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RenderingMode {
    #[serde(rename = "SSR")]
    ServerSide,
    #[serde(rename = "CSR")]
    ClientSide,
    #[serde(rename = "Hybrid")]
    Hybrid,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderingReport {
    pub available: bool,
    pub mode: RenderingMode,
    pub frameworks: Vec<String>,
    pub has_app_root: bool,
    pub text_length: usize,
}

/// Classifies the page from its served markup, without running scripts.
pub fn detect_rendering(html: &str) -> RenderingReport {
    let lower = html.to_lowercase();
    let frameworks: Vec<String> = FRAMEWORK_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|marker| lower.contains(marker)))
        .map(|(name, _)| name.to_string())
        .collect();
    let has_app_root = APP_ROOTS.iter().any(|root| lower.contains(root));
    let text_length = ParsedDocument::parse(html).body_text().chars().count();

    let mode = match (frameworks.is_empty() && !has_app_root, text_length < CLIENT_RENDERED_TEXT) {
        (true, _) => RenderingMode::ServerSide,
        (false, true) => RenderingMode::ClientSide,
        (false, false) => RenderingMode::Hybrid,
    };

    RenderingReport {
        available: true,
        mode,
        frameworks,
        has_app_root,
        text_length,
    }
}
