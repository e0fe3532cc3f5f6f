use html_parser::{ParsedDocument, QueryAll};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::probe::ProbeError;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDependency {
    pub src: String,
    pub size_bytes: Option<u64>,
    pub is_async: bool,
    pub is_defer: bool,
    pub is_module: bool,
    pub third_party: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsDependencies {
    pub available: bool,
    pub scripts: Vec<ScriptDependency>,
    pub external_count: usize,
    pub inline_count: usize,
    pub inline_bytes: u64,
    pub total_size_kb: f64,
    pub render_blocking: usize,
    pub exceeds_budget: bool,
}

/// Script tags of the page, with `src` resolved against `page_url`. Sizes
/// are not known yet.
pub fn collect_scripts(html: &str, page_url: &Url) -> Result<JsDependencies, ProbeError> {
    let document = ParsedDocument::parse(html);
    let mut dependencies = JsDependencies {
        available: true,
        ..Default::default()
    };

    for script in document.query_all("script")? {
        let kind = script.attr("type").unwrap_or("text/javascript").to_lowercase();
        if kind.contains("json") || kind.contains("template") {
            continue;
        }
        match script.attr("src") {
            Some(src) => {
                let Ok(resolved) = page_url.join(src) else {
                    debug!(src, "skipping unresolvable script");
                    continue;
                };
                let is_async = script.has_attr("async");
                let is_defer = script.has_attr("defer");
                let is_module = kind == "module";
                if !is_async && !is_defer && !is_module {
                    dependencies.render_blocking += 1;
                }
                dependencies.scripts.push(ScriptDependency {
                    third_party: resolved.host_str() != page_url.host_str(),
                    src: resolved.to_string(),
                    size_bytes: None,
                    is_async,
                    is_defer,
                    is_module,
                });
            }
            None => {
                dependencies.inline_count += 1;
                dependencies.inline_bytes += script.text().len() as u64;
            }
        }
    }
    dependencies.external_count = dependencies.scripts.len();
    Ok(dependencies)
}

async fn script_size(client: &Client, src: &str) -> Option<u64> {
    let response = client.get(src).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    if let Some(length) = response.content_length() {
        return Some(length);
    }
    response.bytes().await.ok().map(|body| body.len() as u64)
}

/// Requests every external script in turn and totals the sizes.
pub async fn measure_scripts(client: &Client, mut dependencies: JsDependencies, budget_kb: u64) -> JsDependencies {
    let mut total_bytes = dependencies.inline_bytes;
    for script in &mut dependencies.scripts {
        script.size_bytes = script_size(client, &script.src).await;
        total_bytes += script.size_bytes.unwrap_or(0);
    }
    dependencies.total_size_kb = total_bytes as f64 / 1024.0;
    dependencies.exceeds_budget = dependencies.total_size_kb > budget_kb as f64;
    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_scripts() {
        let page_url = Url::parse("https://example.com/blog/post").unwrap();
        let dependencies = collect_scripts(
            r#"<head>
                <script src="/js/app.js"></script>
                <script src="https://cdn.test/lib.js" async></script>
                <script type="module" src="main.mjs"></script>
                <script type="application/ld+json">{"@type":"Thing"}</script>
                <script>console.log("hi")</script>
            </head>"#,
            &page_url,
        )
        .unwrap();

        assert_eq!(dependencies.external_count, 3);
        assert_eq!(dependencies.inline_count, 1);
        assert_eq!(dependencies.render_blocking, 1);
        assert_eq!(dependencies.scripts[0].src, "https://example.com/js/app.js");
        assert!(!dependencies.scripts[0].third_party);
        assert!(dependencies.scripts[1].third_party);
        assert_eq!(dependencies.scripts[2].src, "https://example.com/blog/main.mjs");
    }
}
