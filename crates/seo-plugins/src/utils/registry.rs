use std::fmt;

use tracing::{debug, warn};

use crate::plugins::{
    content::ContentPlugin, headers::HeadersPlugin, schema::SchemaPlugin, social::SocialPlugin,
    url::UrlPlugin,
};

use super::config::{FacetConfig, PluginError};
use super::page::Page;
use super::page_plugin::{FacetReport, SeoPlugin};

/// One plugin's result, kept separate so a failure never hides its siblings.
#[derive(Debug)]
pub struct PluginOutcome {
    pub name: String,
    pub result: Result<FacetReport, PluginError>,
}

pub struct PluginRegistry {
    plugins: Vec<Box<dyn SeoPlugin>>,
    config: FacetConfig,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .field("config", &self.config)
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            config: FacetConfig::new(),
        }
    }

    pub fn set_config(&mut self, config: FacetConfig) {
        self.config = config;
    }

    pub fn get_config(&self) -> &FacetConfig {
        &self.config
    }

    /// Registering a plugin under a name already present replaces it in place.
    pub fn register<P: SeoPlugin>(&mut self, plugin: P) {
        match self
            .plugins
            .iter()
            .position(|existing| existing.name() == plugin.name())
        {
            Some(index) => self.plugins[index] = Box::new(plugin),
            None => self.plugins.push(Box::new(plugin)),
        }
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn analyze(&self, page: &Page) -> Vec<PluginOutcome> {
        self.plugins
            .iter()
            .filter(|plugin| self.config.is_facet_enabled(plugin.name()))
            .map(|plugin| {
                let result = plugin.analyze(page);
                match &result {
                    Ok(report) => debug!(facet = plugin.name(), score = report.score(), "facet analyzed"),
                    Err(e) => warn!(facet = plugin.name(), error = %e, "facet failed"),
                }
                PluginOutcome {
                    name: plugin.name().to_string(),
                    result,
                }
            })
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(ContentPlugin::new());
        registry.register(UrlPlugin::new());
        registry.register(HeadersPlugin::new());
        registry.register(SocialPlugin::new());
        registry.register(SchemaPlugin::new());
        registry
    }
}
