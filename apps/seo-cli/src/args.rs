use clap::Parser;
use seo_analyzer::config::{PartialAnalysisOptions, PartialThresholds};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "seo-cli",
    about = "Analyze a single web page for on-page SEO issues and write a report",
    version,
    long_about = None
)]
pub struct Args {
    /// Page to analyze
    pub url: String,

    /// Report format (json or html)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Directory the report is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report file name without extension
    #[arg(long)]
    pub filename: Option<String>,

    /// JSON config file; flags given here take precedence over it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target keywords, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Other URLs of the same site, comma separated
    #[arg(long, value_delimiter = ',')]
    pub siblings: Option<Vec<String>>,

    /// Request and probe timeout in milliseconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// User agent for page requests
    #[arg(long)]
    pub user_agent: Option<String>,

    #[arg(long)]
    pub title_min: Option<usize>,

    #[arg(long)]
    pub title_max: Option<usize>,

    #[arg(long)]
    pub description_min: Option<usize>,

    #[arg(long)]
    pub description_max: Option<usize>,

    /// Minimum body word count
    #[arg(long)]
    pub min_words: Option<usize>,

    /// JavaScript size budget in kilobytes
    #[arg(long)]
    pub max_js_kb: Option<u64>,

    /// Facets to skip (content, url, headers, social, schema), comma separated
    #[arg(long, value_delimiter = ',')]
    pub disable: Option<Vec<String>>,

    /// Skip the content, URL, header, social and schema facets
    #[arg(long)]
    pub no_advanced: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The CLI layer of the options. Unset flags stay `None`.
    pub fn to_options(&self) -> PartialAnalysisOptions {
        let thresholds = PartialThresholds {
            title_min_length: self.title_min,
            title_max_length: self.title_max,
            description_min_length: self.description_min,
            description_max_length: self.description_max,
            min_word_count: self.min_words,
            max_js_size_kb: self.max_js_kb,
            ..Default::default()
        };

        PartialAnalysisOptions {
            timeout_ms: self.timeout,
            user_agent: self.user_agent.clone(),
            thresholds: (thresholds != PartialThresholds::default()).then_some(thresholds),
            keywords: self.keywords.clone(),
            sibling_urls: self.siblings.clone(),
            headers: None,
            format: self.format.clone(),
            output_dir: self.output_dir.clone(),
            filename: self.filename.clone(),
            advanced: self.no_advanced.then_some(false),
            disabled_facets: self.disable.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_stay_unset() {
        let args = Args::try_parse_from(["seo-cli", "https://example.com"]).unwrap();
        assert_eq!(args.url, "https://example.com");
        assert_eq!(args.to_options(), PartialAnalysisOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = Args::try_parse_from([
            "seo-cli",
            "https://example.com",
            "--format",
            "html",
            "--keywords",
            "rust,seo",
            "--title-min",
            "20",
            "--no-advanced",
            "--disable",
            "social",
        ])
        .unwrap();
        let options = args.to_options();

        assert_eq!(options.format.as_deref(), Some("html"));
        assert_eq!(options.keywords, Some(vec!["rust".to_string(), "seo".to_string()]));
        assert_eq!(
            options.thresholds.and_then(|t| t.title_min_length),
            Some(20)
        );
        assert_eq!(options.advanced, Some(false));
        assert_eq!(options.disabled_facets, Some(vec!["social".to_string()]));
    }
}
