use serde::{Deserialize, Serialize};

/// The `{issues, recommendations, score}` record every facet produces.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FacetResult {
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// Always within `0..=100`.
    pub score: u32,
}

impl FacetResult {
    pub fn failed(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
            recommendations: Vec::new(),
            score: 0,
        }
    }
}

/// Running score plus the issues and recommendations raised while
/// computing it. The raw total may leave `0..=100` while checks are being
/// applied; it is clamped once, when the card is finished.
#[derive(Debug, Clone, Default)]
pub struct ScoreCard {
    score: i32,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl ScoreCard {
    pub fn new(start: i32) -> Self {
        Self {
            score: start,
            ..Default::default()
        }
    }

    pub fn award(&mut self, points: i32) -> &mut Self {
        self.score += points;
        self
    }

    pub fn deduct(&mut self, points: i32) -> &mut Self {
        self.score -= points;
        self
    }

    pub fn issue(&mut self, issue: impl Into<String>) -> &mut Self {
        self.issues.push(issue.into());
        self
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) -> &mut Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// Deducts `points` and records the problem with its fix.
    pub fn penalize(
        &mut self,
        points: i32,
        issue: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> &mut Self {
        self.deduct(points).issue(issue).recommend(recommendation)
    }

    pub fn set(&mut self, score: i32) -> &mut Self {
        self.score = score;
        self
    }

    pub fn raw(&self) -> i32 {
        self.score
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn finish(self) -> FacetResult {
        FacetResult {
            issues: self.issues,
            recommendations: self.recommendations,
            score: clamp_score(self.score),
        }
    }

    /// Like [`finish`](Self::finish), but a card that raised no issue scores
    /// exactly 100.
    pub fn finish_clean_bonus(mut self) -> FacetResult {
        if !self.has_issues() {
            self.score = 100;
        }
        self.finish()
    }
}

pub fn clamp_score(score: i32) -> u32 {
    score.clamp(0, 100) as u32
}

/// Rounded mean of sub-scores, half away from zero.
pub fn average(scores: &[u32]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let total: u32 = scores.iter().sum();
    (f64::from(total) / scores.len() as f64).round() as u32
}

/// Folds sub-results into one facet-level issue and recommendation list.
pub fn merge_messages<'a>(parts: impl IntoIterator<Item = &'a FacetResult>) -> (Vec<String>, Vec<String>) {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    for part in parts {
        issues.extend(part.issues.iter().cloned());
        recommendations.extend(part.recommendations.iter().cloned());
    }
    (issues, recommendations)
}
