use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use seo_analyzer::config::load_config_file;
use seo_analyzer::{AnalysisOptions, ReportOptions, SeoAnalysis, SeoAnalyzer, write_report};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod args;

use args::Args;

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(analysis: &SeoAnalysis) {
    let scores = &analysis.scores;
    let optional = |score: Option<u32>| score.map_or_else(|| "-".to_string(), |score| score.to_string());

    println!("SEO analysis for {}", analysis.url);
    println!("  Overall:        {}", scores.overall);
    println!("  Metadata:       {}", scores.metadata);
    println!("  Mobile:         {}", scores.mobile);
    println!("  Lazy loading:   {}", scores.lazy_loading);
    println!("  Performance:    {}", optional(scores.performance));
    println!("  Accessibility:  {}", optional(scores.accessibility));
    println!("  Content:        {}", optional(scores.content));
    println!("  URL:            {}", optional(scores.url));
    println!("  Headers:        {}", optional(scores.headers));
    println!("  Social:         {}", optional(scores.social));
    println!("  Schema:         {}", optional(scores.schema));
    for failure in &analysis.errors {
        println!("  ! {} failed: {}", failure.facet, failure.message);
    }
}

async fn run(args: Args) -> Result<PathBuf> {
    let file_layer = match &args.config {
        Some(path) => load_config_file(path)?,
        None => Default::default(),
    };
    let options = AnalysisOptions::layered(file_layer, args.to_options())?;
    info!(url = %args.url, format = %options.format, advanced = options.advanced, "starting analysis");

    let analyzer = SeoAnalyzer::new(options)?;
    let analysis = analyzer
        .analyze_url(&args.url)
        .await
        .with_context(|| format!("analysis of {} failed", args.url))?;
    print_summary(&analysis);

    let report = ReportOptions::from_options(analyzer.options(), &analysis.url);
    let path = write_report(&analysis, &report).context("could not write report")?;
    Ok(path)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(args).await {
        Ok(path) => {
            println!("Report written to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
