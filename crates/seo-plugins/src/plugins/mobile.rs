use html_parser::{DomError, QueryAll};
use serde::{Deserialize, Serialize};

use crate::utils::score::ScoreCard;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MobileFriendliness {
    pub has_viewport: bool,
    pub viewport_content: Option<String>,
    pub is_responsive: bool,
    pub zoom_disabled: bool,
    pub has_touch_icon: bool,
    pub responsive_images: usize,
    pub total_images: usize,
    pub score: u32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

fn disables_zoom(viewport: &str) -> bool {
    viewport
        .split([',', ';'])
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| match key.trim() {
            "user-scalable" => matches!(value.trim(), "no" | "0"),
            "maximum-scale" => value.trim().parse::<f64>().is_ok_and(|scale| scale < 2.0),
            _ => false,
        })
}

pub fn analyze_mobile(document: &impl QueryAll) -> Result<MobileFriendliness, DomError> {
    let viewport_content = document
        .query_first(r#"meta[name="viewport"]"#)?
        .and_then(|meta| meta.attr("content").map(|content| content.to_lowercase()));
    let has_viewport = viewport_content.is_some();
    let is_responsive = viewport_content
        .as_deref()
        .is_some_and(|content| content.replace(' ', "").contains("width=device-width"));
    let zoom_disabled = viewport_content.as_deref().is_some_and(disables_zoom);
    let has_touch_icon = document
        .query_all("link[rel]")?
        .iter()
        .any(|link| link.attr("rel").is_some_and(|rel| rel.contains("apple-touch-icon")));

    let images = document.query_all("img")?;
    let responsive_images = images
        .iter()
        .filter(|image| {
            image.has_attr("srcset")
                || image.has_attr("sizes")
                || image.ancestors().first().is_some_and(|parent| parent.tag == "picture")
        })
        .count();

    let mut card = ScoreCard::new(0);
    if has_viewport {
        card.award(30);
    } else {
        card.issue("Missing viewport meta tag")
            .recommend("Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    }
    if is_responsive {
        card.award(30);
    } else if has_viewport {
        card.issue("Viewport does not use width=device-width")
            .recommend("Set width=device-width in the viewport meta tag");
    }
    if zoom_disabled {
        card.issue("Viewport disables zooming")
            .recommend("Allow users to zoom; drop user-scalable=no and low maximum-scale values");
    } else {
        card.award(15);
    }
    if has_touch_icon {
        card.award(10);
    } else {
        card.recommend("Add an apple-touch-icon for home screen shortcuts");
    }
    if images.is_empty() {
        card.award(15);
    } else {
        card.award((15.0 * responsive_images as f64 / images.len() as f64).round() as i32);
        if responsive_images < images.len() {
            card.recommend("Serve responsive images with srcset or <picture>");
        }
    }
    let result = card.finish();

    Ok(MobileFriendliness {
        has_viewport,
        viewport_content,
        is_responsive,
        zoom_disabled,
        has_touch_icon,
        responsive_images,
        total_images: images.len(),
        score: result.score,
        issues: result.issues,
        recommendations: result.recommendations,
    })
}
