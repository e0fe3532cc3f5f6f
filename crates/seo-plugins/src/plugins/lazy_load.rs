use html_parser::{DomError, Node, QueryAll};
use serde::{Deserialize, Serialize};

use crate::utils::score::ScoreCard;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LazyLoading {
    pub total_images: usize,
    pub lazy_images: usize,
    pub total_iframes: usize,
    pub lazy_iframes: usize,
    pub lazy_percentage: f64,
    pub score: u32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

fn is_lazy(node: &Node) -> bool {
    node.attr("loading")
        .is_some_and(|loading| loading.eq_ignore_ascii_case("lazy"))
        || node.has_attr("data-src")
        || node.has_attr("data-srcset")
        || node.has_class("lazyload")
}

/// The first `eager_allowance` images are above the fold and expected to
/// load eagerly; every later image and every iframe should be lazy.
pub fn analyze_lazy_loading(
    document: &impl QueryAll,
    eager_allowance: usize,
) -> Result<LazyLoading, DomError> {
    let images = document.query_all("img")?;
    let iframes = document.query_all("iframe")?;
    let lazy_images = images.iter().filter(|image| is_lazy(image)).count();
    let lazy_iframes = iframes.iter().filter(|frame| is_lazy(frame)).count();

    let mut card = ScoreCard::new(100);
    if images.iter().take(eager_allowance).any(is_lazy) {
        card.recommend("Load above-the-fold images eagerly; lazy-loading them delays rendering");
    }

    let candidates: Vec<&Node> = images.iter().skip(eager_allowance).chain(&iframes).collect();
    let lazy_candidates = candidates.iter().filter(|node| is_lazy(node)).count();
    let lazy_percentage = if candidates.is_empty() {
        100.0
    } else {
        lazy_candidates as f64 / candidates.len() as f64 * 100.0
    };
    card.set(lazy_percentage.round() as i32);
    if lazy_percentage < 50.0 {
        card.issue(format!(
            "Only {lazy_percentage:.0}% of below-the-fold images and iframes are lazy-loaded"
        ))
        .recommend("Add loading=\"lazy\" to offscreen images and iframes");
    }
    let result = card.finish();

    Ok(LazyLoading {
        total_images: images.len(),
        lazy_images,
        total_iframes: iframes.len(),
        lazy_iframes,
        lazy_percentage,
        score: result.score,
        issues: result.issues,
        recommendations: result.recommendations,
    })
}
