pub mod plugins;
pub mod utils;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::utils::{
        config::{FacetConfig, PluginError},
        page::Page,
        page_plugin::{FacetReport, SeoPlugin},
        registry::PluginRegistry,
    };

    struct BrokenPlugin;

    impl SeoPlugin for BrokenPlugin {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn analyze(&self, _page: &Page) -> Result<FacetReport, PluginError> {
            Err(PluginError::InvalidInput("boom".to_string()))
        }
    }

    fn test_page() -> Page {
        Page::from_html(
            r#"
        <html>
            <head>
                <title>Test Page</title>
            </head>
            <body>
                <a href="/page1">Page 1</a>
                <a href="https://external.com">External</a>
            </body>
        </html>
    "#,
        )
        .with_url("https://example.com/page")
        .with_headers(BTreeMap::from([(
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )]))
    }

    #[test]
    fn test_registry() {
        let registry = PluginRegistry::default();
        let outcomes = registry.analyze(&test_page());

        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["content", "url", "headers", "social", "schema"]);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        match &outcomes[1].result {
            Ok(FacetReport::Url(url)) => assert_eq!(url.protocol.score, 100),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_disabled_facets_are_skipped() {
        let mut registry = PluginRegistry::default();
        let mut config = FacetConfig::new();
        config.disable_facet("social");
        config.disable_facet("schema");
        registry.set_config(config);

        let outcomes = registry.analyze(&test_page());
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.name != "social"));

        let mut config = registry.get_config().clone();
        config.enable_facet("social");
        registry.set_config(config);
        assert!(registry.get_config().is_facet_enabled("social"));
        assert!(!registry.get_config().is_facet_enabled("schema"));

        let outcomes = registry.analyze(&test_page());
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().any(|o| o.name == "social"));
    }

    #[test]
    fn test_failing_plugin_does_not_stop_the_rest() {
        let mut registry = PluginRegistry::new();
        registry.register(crate::plugins::url::UrlPlugin::new());
        registry.register(BrokenPlugin);
        registry.register(crate::plugins::headers::HeadersPlugin::new());

        let outcomes = registry.analyze(&test_page());
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(PluginError::InvalidInput(_))));
        assert!(outcomes[2].result.is_ok());
    }
}
