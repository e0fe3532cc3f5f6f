//! External measurements that need more than the served HTML.
//!
//! The analyzer talks to these through [`PageProbe`] so tests can supply
//! canned records. A probe failure never fails the analysis; the caller
//! substitutes the record's `Default`, which has `available: false`.

use std::time::Duration;

use async_trait::async_trait;
use html_parser::DomError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::lighthouse::{
    ShellCommand, TokioShell, accessibility_from_report, performance_from_report, run_lighthouse,
};
use crate::rendering::{RenderingReport, detect_rendering};
use crate::scripts::{JsDependencies, collect_scripts, measure_scripts};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Command failed: {0}")]
    Command(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse probe output: {0}")]
    Parse(String),
    #[error("Probe timed out after {0}ms")]
    Timeout(u64),
    #[error("Invalid page URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("DOM query failed: {0}")]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub available: bool,
    pub performance_score: f64,
    pub first_contentful_paint: f64,
    pub largest_contentful_paint: f64,
    pub speed_index: f64,
    pub time_to_interactive: f64,
    pub total_blocking_time: f64,
    pub cumulative_layout_shift: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityViolation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub nodes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityReport {
    pub available: bool,
    pub score: f64,
    pub violations: Vec<AccessibilityViolation>,
}

#[async_trait]
pub trait PageProbe: Send + Sync {
    async fn performance_metrics(&self, url: &str) -> Result<PerformanceMetrics, ProbeError>;
    async fn accessibility_audit(&self, url: &str) -> Result<AccessibilityReport, ProbeError>;
    async fn detect_rendering(&self, url: &str, html: &str) -> Result<RenderingReport, ProbeError>;
    async fn js_dependencies(&self, url: &str, html: &str) -> Result<JsDependencies, ProbeError>;
}

/// Lighthouse for performance and accessibility, static markup inspection
/// for rendering, and plain HTTP requests for script sizes.
pub struct DefaultProbe<S: ShellCommand = TokioShell> {
    shell: S,
    client: Client,
    timeout: Duration,
    js_budget_kb: u64,
}

impl DefaultProbe<TokioShell> {
    pub fn new(client: Client, timeout: Duration, js_budget_kb: u64) -> Self {
        Self::with_shell(TokioShell, client, timeout, js_budget_kb)
    }
}

impl<S: ShellCommand> DefaultProbe<S> {
    pub fn with_shell(shell: S, client: Client, timeout: Duration, js_budget_kb: u64) -> Self {
        Self {
            shell,
            client,
            timeout,
            js_budget_kb,
        }
    }

    async fn with_timeout<T>(
        &self,
        probe: impl std::future::Future<Output = Result<T, ProbeError>>,
    ) -> Result<T, ProbeError> {
        tokio::time::timeout(self.timeout, probe)
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[async_trait]
impl<S: ShellCommand> PageProbe for DefaultProbe<S> {
    async fn performance_metrics(&self, url: &str) -> Result<PerformanceMetrics, ProbeError> {
        let report = self
            .with_timeout(run_lighthouse(&self.shell, url, "performance"))
            .await?;
        Ok(performance_from_report(&report))
    }

    async fn accessibility_audit(&self, url: &str) -> Result<AccessibilityReport, ProbeError> {
        let report = self
            .with_timeout(run_lighthouse(&self.shell, url, "accessibility"))
            .await?;
        Ok(accessibility_from_report(&report))
    }

    async fn detect_rendering(&self, _url: &str, html: &str) -> Result<RenderingReport, ProbeError> {
        Ok(detect_rendering(html))
    }

    async fn js_dependencies(&self, url: &str, html: &str) -> Result<JsDependencies, ProbeError> {
        let page_url = Url::parse(url)?;
        let dependencies = collect_scripts(html, &page_url)?;
        self.with_timeout(async {
            Ok(measure_scripts(&self.client, dependencies, self.js_budget_kb).await)
        })
        .await
    }
}
