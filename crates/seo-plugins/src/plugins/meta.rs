use html_parser::{DomError, QueryAll};

use crate::utils::{
    config::Thresholds,
    score::{FacetResult, ScoreCard},
};

fn first_attr(
    document: &impl QueryAll,
    selector: &str,
    attr: &str,
) -> Result<Option<String>, DomError> {
    Ok(document
        .query_first(selector)?
        .and_then(|node| node.attr(attr).map(|value| value.trim().to_string()))
        .filter(|value| !value.is_empty()))
}

/// Title, description, headings, alt text and body length checked against
/// the configured thresholds.
pub fn analyze_metadata(
    document: &impl QueryAll,
    thresholds: &Thresholds,
    word_count: usize,
) -> Result<FacetResult, DomError> {
    let mut card = ScoreCard::new(100);

    let title = document
        .query_first("title")?
        .map(|node| node.trimmed_text())
        .filter(|title| !title.is_empty());
    match title {
        None => {
            card.penalize(25, "Missing page title", "Add a descriptive <title> element");
        }
        Some(title) => {
            let length = title.chars().count();
            if length < thresholds.title_min_length {
                card.penalize(
                    10,
                    format!("Title is too short ({length} characters)"),
                    format!("Use at least {} characters in the title", thresholds.title_min_length),
                );
            } else if length > thresholds.title_max_length {
                card.penalize(
                    10,
                    format!("Title is too long ({length} characters)"),
                    format!("Keep the title under {} characters", thresholds.title_max_length),
                );
            }
        }
    }

    match first_attr(document, r#"meta[name="description"]"#, "content")? {
        None => {
            card.penalize(20, "Missing meta description", "Add a meta description summarizing the page");
        }
        Some(description) => {
            let length = description.chars().count();
            if length < thresholds.description_min_length {
                card.penalize(
                    10,
                    format!("Meta description is too short ({length} characters)"),
                    format!(
                        "Use at least {} characters in the meta description",
                        thresholds.description_min_length
                    ),
                );
            } else if length > thresholds.description_max_length {
                card.penalize(
                    10,
                    format!("Meta description is too long ({length} characters)"),
                    format!(
                        "Keep the meta description under {} characters",
                        thresholds.description_max_length
                    ),
                );
            }
        }
    }

    match document.query_all("h1")?.len() {
        0 => {
            card.penalize(15, "Missing H1 heading", "Add exactly one H1 describing the page");
        }
        1 => {}
        count => {
            card.penalize(
                10,
                format!("Multiple H1 headings ({count})"),
                "Keep a single H1 per page",
            );
        }
    }

    let missing_alt = document
        .query_all("img")?
        .iter()
        .filter(|image| !image.attr("alt").is_some_and(|alt| !alt.trim().is_empty()))
        .count();
    if missing_alt > 0 {
        card.penalize(
            (missing_alt as i32 * 5).min(20),
            format!("{missing_alt} image(s) missing alt text"),
            "Describe every meaningful image with an alt attribute",
        );
    }

    if word_count < thresholds.min_word_count {
        card.penalize(
            10,
            format!("Low word count ({word_count} words)"),
            format!("Aim for at least {} words of content", thresholds.min_word_count),
        );
    }

    if first_attr(document, r#"link[rel="canonical"]"#, "href")?.is_none() {
        card.penalize(5, "Missing canonical link", "Add a <link rel=\"canonical\"> element");
    }
    if first_attr(document, "html", "lang")?.is_none() {
        card.penalize(5, "Missing lang attribute on <html>", "Declare the page language");
    }

    Ok(card.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use html_parser::ParsedDocument;

    #[test]
    fn test_well_formed_page() {
        let document = ParsedDocument::parse(
            r#"<html lang="en"><head>
                <title>A descriptive page title for testing</title>
                <meta name="description" content="A meta description that is long enough to satisfy the minimum length check.">
                <link rel="canonical" href="https://example.com/">
            </head><body><h1>Heading</h1><img src="a.png" alt="A"></body></html>"#,
        );
        let result = analyze_metadata(&document, &Thresholds::default(), 500).unwrap();
        assert!(result.issues.is_empty());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_bare_page() {
        let document = ParsedDocument::parse("<body><img src=a.png><img src=b.png alt=''></body>");
        let result = analyze_metadata(&document, &Thresholds::default(), 0).unwrap();
        // 25 + 20 + 15 + 10 (alt) + 10 + 5 + 5
        assert_eq!(result.score, 10);
        assert_eq!(result.issues.len(), 7);
    }
}
