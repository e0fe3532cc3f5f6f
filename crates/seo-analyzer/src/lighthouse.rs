use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tracing::debug;

use crate::probe::{AccessibilityReport, AccessibilityViolation, PerformanceMetrics, ProbeError};

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs an external program to completion.
#[async_trait]
pub trait ShellCommand: Send + Sync {
    async fn run_command(&self, command: &str, args: &[&str]) -> Result<CommandOutput, std::io::Error>;
}

/// [`ShellCommand`] backed by `tokio::process`. The child is killed if the
/// future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioShell;

#[async_trait]
impl ShellCommand for TokioShell {
    async fn run_command(&self, command: &str, args: &[&str]) -> Result<CommandOutput, std::io::Error> {
        let output = tokio::process::Command::new(command)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            status: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Runs the `lighthouse` CLI for `categories` and returns the parsed JSON
/// report. The report lives in a temporary directory removed on return.
pub async fn run_lighthouse<S: ShellCommand + ?Sized>(
    shell: &S,
    url: &str,
    categories: &str,
) -> Result<Value, ProbeError> {
    let temp_dir = TempDir::new()?;
    let report_path = temp_dir.path().join("lighthouse-report.json");
    let report_path_str = report_path
        .to_str()
        .ok_or_else(|| ProbeError::Command("report path is not valid UTF-8".to_string()))?
        .to_string();
    let only_categories = format!("--only-categories={categories}");

    debug!(url, categories, "running lighthouse");
    let output = shell
        .run_command(
            "lighthouse",
            &[
                url,
                "--output=json",
                "--output-path",
                &report_path_str,
                "--chrome-flags=--headless",
                "--quiet",
                &only_categories,
            ],
        )
        .await?;

    if !output.status {
        return Err(ProbeError::Command(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let report_content = tokio::fs::read_to_string(&report_path).await?;
    serde_json::from_str(&report_content).map_err(|e| ProbeError::Parse(e.to_string()))
}

fn get_category_score(categories: &Value, category: &str) -> f64 {
    categories[category]["score"].as_f64().unwrap_or(0.0) * 100.0
}

fn get_audit_value(audits: &Value, audit_name: &str) -> f64 {
    audits[audit_name]["numericValue"].as_f64().unwrap_or(0.0)
}

pub fn performance_from_report(report: &Value) -> PerformanceMetrics {
    let categories = &report["categories"];
    let audits = &report["audits"];

    PerformanceMetrics {
        available: true,
        performance_score: get_category_score(categories, "performance"),
        first_contentful_paint: get_audit_value(audits, "first-contentful-paint"),
        largest_contentful_paint: get_audit_value(audits, "largest-contentful-paint"),
        speed_index: get_audit_value(audits, "speed-index"),
        time_to_interactive: get_audit_value(audits, "interactive"),
        total_blocking_time: get_audit_value(audits, "total-blocking-time"),
        cumulative_layout_shift: get_audit_value(audits, "cumulative-layout-shift"),
    }
}

/// Failed audits of the accessibility category become violations.
pub fn accessibility_from_report(report: &Value) -> AccessibilityReport {
    let audits = &report["audits"];
    let violations = report["categories"]["accessibility"]["auditRefs"]
        .as_array()
        .map(|refs| {
            refs.iter()
                .filter_map(|audit_ref| audit_ref["id"].as_str())
                .filter(|id| audits[*id]["score"].as_f64() == Some(0.0))
                .map(|id| {
                    let audit = &audits[id];
                    AccessibilityViolation {
                        id: id.to_string(),
                        title: audit["title"].as_str().unwrap_or_default().to_string(),
                        description: audit["description"].as_str().unwrap_or_default().to_string(),
                        nodes: audit["details"]["items"].as_array().map_or(0, Vec::len),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    AccessibilityReport {
        available: true,
        score: get_category_score(&report["categories"], "accessibility"),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Value {
        json!({
            "categories": {
                "performance": {"score": 0.87},
                "accessibility": {
                    "score": 0.5,
                    "auditRefs": [{"id": "image-alt"}, {"id": "color-contrast"}, {"id": "html-has-lang"}]
                }
            },
            "audits": {
                "first-contentful-paint": {"numericValue": 1200.5},
                "largest-contentful-paint": {"numericValue": 2400.0},
                "cumulative-layout-shift": {"numericValue": 0.02},
                "image-alt": {
                    "score": 0,
                    "title": "Image elements do not have [alt] attributes",
                    "details": {"items": [{}, {}]}
                },
                "color-contrast": {"score": 1},
                "html-has-lang": {"score": null}
            }
        })
    }

    struct FailingShell;

    #[async_trait]
    impl ShellCommand for FailingShell {
        async fn run_command(&self, _command: &str, _args: &[&str]) -> Result<CommandOutput, std::io::Error> {
            Ok(CommandOutput {
                status: false,
                stdout: Vec::new(),
                stderr: b"Chrome could not be launched".to_vec(),
            })
        }
    }

    #[test]
    fn test_performance_from_report() {
        let metrics = performance_from_report(&sample_report());
        assert!(metrics.available);
        assert!((metrics.performance_score - 87.0).abs() < 1e-9);
        assert_eq!(metrics.first_contentful_paint, 1200.5);
        assert_eq!(metrics.speed_index, 0.0);
    }

    #[test]
    fn test_accessibility_from_report() {
        let report = accessibility_from_report(&sample_report());
        assert_eq!(report.score, 50.0);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].id, "image-alt");
        assert_eq!(report.violations[0].nodes, 2);
    }

    #[tokio::test]
    async fn test_failed_command_is_an_error() {
        let result = run_lighthouse(&FailingShell, "https://example.com", "performance").await;
        match result {
            Err(ProbeError::Command(message)) => assert!(message.contains("Chrome")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
