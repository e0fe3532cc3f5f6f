use std::collections::HashMap;

use html_parser::{DomError, QueryAll};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::{
    config::{PluginError, Thresholds},
    page::Page,
    page_plugin::{FacetReport, SeoPlugin},
    score::{ScoreCard, average, clamp_score},
};

static SILENT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[^laeiouy]es|ed|[^laeiouy]e)$").expect("silent suffix pattern"));
static VOWEL_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[aeiouy]+").expect("vowel group pattern"));
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern"));

const STOP_WORDS: [&str; 23] = [
    "the", "and", "a", "an", "in", "on", "at", "to", "for", "of", "with", "by", "is", "are",
    "was", "were", "be", "been", "this", "that", "it", "as", "or",
];

const TOP_KEYWORDS: usize = 20;
const RELEVANT_KEYWORDS: usize = 10;
const SHORT_PARAGRAPH_WORDS: usize = 50;
const MAX_AVERAGE_PARAGRAPH_WORDS: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Readability {
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
    pub level: String,
    pub sentence_count: usize,
    pub word_count: usize,
    pub syllable_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordFrequency {
    pub word: String,
    pub count: usize,
    pub density: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetKeyword {
    pub keyword: String,
    pub count: usize,
    pub density: String,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeywordReport {
    pub total_words: usize,
    pub top_keywords: Vec<KeywordFrequency>,
    pub relevant_keywords: Vec<KeywordFrequency>,
    pub target_keywords: Vec<TargetKeyword>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentStructure {
    pub paragraph_count: usize,
    pub average_paragraph_length: f64,
    pub long_paragraphs: usize,
    pub short_paragraphs: usize,
    pub list_count: usize,
    pub list_item_count: usize,
    pub rating: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRatio {
    pub text_length: usize,
    pub html_length: usize,
    pub ratio: f64,
    pub rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub score: u32,
    pub readability: Readability,
    pub keywords: KeywordReport,
    pub structure: ContentStructure,
    pub content_ratio: ContentRatio,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Estimated syllables in one word.
pub fn count_syllables(word: &str) -> usize {
    let word: String = word
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphabetic)
        .collect();
    if word.is_empty() {
        return 0;
    }
    if word.len() <= 3 {
        return 1;
    }
    let stripped = SILENT_SUFFIX.replace(&word, "");
    let stripped: &str = &stripped;
    let stripped = stripped.strip_prefix('y').unwrap_or(stripped);
    VOWEL_GROUP.find_iter(stripped).count().max(1)
}

fn readability_level(ease: f64) -> &'static str {
    match ease {
        e if e >= 90.0 => "Very Easy",
        e if e >= 80.0 => "Easy",
        e if e >= 70.0 => "Fairly Easy",
        e if e >= 60.0 => "Standard",
        e if e >= 50.0 => "Fairly Difficult",
        e if e >= 30.0 => "Difficult",
        _ => "Very Difficult",
    }
}

pub fn analyze_readability(text: &str) -> Readability {
    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|sentence| !sentence.trim().is_empty())
        .count();
    let words: Vec<&str> = text.split_whitespace().collect();
    let syllable_count: usize = words.iter().map(|word| count_syllables(word)).sum();

    if sentence_count == 0 || words.is_empty() {
        return Readability {
            level: readability_level(0.0).to_string(),
            sentence_count,
            word_count: words.len(),
            syllable_count,
            ..Default::default()
        };
    }

    let words_per_sentence = words.len() as f64 / sentence_count as f64;
    let syllables_per_word = syllable_count as f64 / words.len() as f64;
    let ease = (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0);
    let grade = (0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59).max(0.0);

    Readability {
        flesch_reading_ease: ease,
        flesch_kincaid_grade: grade,
        level: readability_level(ease).to_string(),
        sentence_count,
        word_count: words.len(),
        syllable_count,
    }
}

fn density(count: usize, total: usize) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    format!("{percent:.2}%")
}

fn ranked(
    frequencies: &HashMap<&str, usize>,
    total: usize,
    skip_stop_words: bool,
    limit: usize,
) -> Vec<KeywordFrequency> {
    let mut words: Vec<(&str, usize)> = frequencies
        .iter()
        .filter(|(word, _)| !skip_stop_words || !STOP_WORDS.contains(*word))
        .map(|(word, count)| (*word, *count))
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    words
        .into_iter()
        .take(limit)
        .map(|(word, count)| KeywordFrequency {
            word: word.to_string(),
            count,
            density: density(count, total),
        })
        .collect()
}

pub fn analyze_keywords(text: &str, targets: &[String]) -> KeywordReport {
    let cleaned = PUNCTUATION.replace_all(&text.to_lowercase(), "").into_owned();
    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= 2)
        .collect();
    let total_words = tokens.len();

    let mut frequencies: HashMap<&str, usize> = HashMap::new();
    for &token in &tokens {
        *frequencies.entry(token).or_default() += 1;
    }

    let target_keywords = targets
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .map(|keyword| {
            let count = Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                .map(|pattern| pattern.find_iter(&cleaned).count())
                .unwrap_or(0);
            TargetKeyword {
                density: density(count, total_words),
                present: count > 0,
                keyword,
                count,
            }
        })
        .collect();

    KeywordReport {
        total_words,
        top_keywords: ranked(&frequencies, total_words, false, TOP_KEYWORDS),
        relevant_keywords: ranked(&frequencies, total_words, true, RELEVANT_KEYWORDS),
        target_keywords,
    }
}

fn structure_rating(recommendations: usize) -> &'static str {
    match recommendations {
        0 => "Excellent",
        1 => "Good",
        2 => "Average",
        3 => "Needs Improvement",
        _ => "Poor",
    }
}

pub fn analyze_structure(
    document: &impl QueryAll,
    long_paragraph_words: usize,
) -> Result<ContentStructure, DomError> {
    let lengths: Vec<usize> = document
        .query_all("p")?
        .iter()
        .map(|paragraph| paragraph.word_count())
        .filter(|words| *words > 0)
        .collect();
    let list_count = document.query_all("ul, ol")?.len();
    let list_item_count = document.query_all("li")?.len();

    if lengths.is_empty() {
        return Ok(ContentStructure {
            list_count,
            list_item_count,
            rating: "Poor".to_string(),
            recommendations: vec!["Break the content into paragraphs".to_string()],
            ..Default::default()
        });
    }

    let paragraph_count = lengths.len();
    let average_paragraph_length = lengths.iter().sum::<usize>() as f64 / paragraph_count as f64;
    let long_paragraphs = lengths.iter().filter(|words| **words > long_paragraph_words).count();
    let short_paragraphs = lengths.iter().filter(|words| **words <= SHORT_PARAGRAPH_WORDS).count();

    let mut recommendations = Vec::new();
    if average_paragraph_length > MAX_AVERAGE_PARAGRAPH_WORDS {
        recommendations.push("Shorten paragraphs to under 100 words on average".to_string());
    }
    if long_paragraphs > 0 {
        recommendations.push(format!(
            "Split the {long_paragraphs} paragraph(s) longer than {long_paragraph_words} words"
        ));
    }
    if paragraph_count < 3 {
        recommendations.push("Add more paragraphs to give the content structure".to_string());
    }
    if list_count == 0 && paragraph_count > 5 {
        recommendations.push("Use bullet or numbered lists to break up long content".to_string());
    }

    Ok(ContentStructure {
        paragraph_count,
        average_paragraph_length,
        long_paragraphs,
        short_paragraphs,
        list_count,
        list_item_count,
        rating: structure_rating(recommendations.len()).to_string(),
        recommendations,
    })
}

pub fn analyze_content_ratio(text: &str, html_length: usize) -> ContentRatio {
    let text_length = text.chars().count();
    let ratio = if html_length == 0 {
        0.0
    } else {
        text_length as f64 / html_length as f64 * 100.0
    };
    let rating = match ratio {
        r if r < 10.0 => "Poor",
        r if r < 25.0 => "Average",
        r if r < 50.0 => "Good",
        _ => "Excellent",
    };
    ContentRatio {
        text_length,
        html_length,
        ratio,
        rating: rating.to_string(),
    }
}

fn rating_score(rating: &str) -> u32 {
    match rating {
        "Excellent" => 100,
        "Good" => 80,
        "Average" => 60,
        "Needs Improvement" => 40,
        _ => 20,
    }
}

/// `text` is the visible body text and `html_length` the size of the markup
/// it came from.
pub fn analyze_content(
    document: &impl QueryAll,
    text: &str,
    html_length: usize,
    targets: &[String],
    thresholds: &Thresholds,
) -> Result<ContentAnalysis, DomError> {
    let readability = analyze_readability(text);
    let keywords = analyze_keywords(text, targets);
    let structure = analyze_structure(document, thresholds.long_paragraph_words)?;
    let content_ratio = analyze_content_ratio(text, html_length);

    let mut card = ScoreCard::new(0);
    if readability.word_count < thresholds.min_word_count {
        card.penalize(
            0,
            format!(
                "Content is thin: {} words (minimum {})",
                readability.word_count, thresholds.min_word_count
            ),
            format!("Expand the content to at least {} words", thresholds.min_word_count),
        );
    }
    if readability.word_count > 0 && readability.flesch_reading_ease < 30.0 {
        card.penalize(
            0,
            "Content is very difficult to read",
            "Use shorter sentences and simpler words",
        );
    }
    for target in keywords.target_keywords.iter().filter(|target| !target.present) {
        card.penalize(
            0,
            format!("Target keyword \"{}\" not found in content", target.keyword),
            format!("Work \"{}\" naturally into the content", target.keyword),
        );
    }
    if content_ratio.rating == "Poor" {
        card.penalize(
            0,
            format!("Low text-to-HTML ratio ({:.2}%)", content_ratio.ratio),
            "Reduce markup weight or add more visible text",
        );
    }
    for recommendation in &structure.recommendations {
        card.recommend(recommendation.clone());
    }
    let messages = card.finish();

    let word_score = if thresholds.min_word_count == 0 {
        100
    } else {
        clamp_score((readability.word_count * 100 / thresholds.min_word_count) as i32)
    };
    let score = average(&[
        clamp_score(readability.flesch_reading_ease.round() as i32),
        rating_score(&structure.rating),
        rating_score(&content_ratio.rating),
        word_score,
    ]);

    Ok(ContentAnalysis {
        score,
        readability,
        keywords,
        structure,
        content_ratio,
        issues: messages.issues,
        recommendations: messages.recommendations,
    })
}

// Content Plugin
pub struct ContentPlugin {}

impl Default for ContentPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl SeoPlugin for ContentPlugin {
    fn name(&self) -> &str {
        "content"
    }
    fn description(&self) -> &str {
        "Readability, keyword usage, paragraph structure and text-to-HTML ratio"
    }

    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError> {
        let document = page.get_document();
        let text = document.body_text();
        Ok(FacetReport::Content(analyze_content(
            &document,
            &text,
            document.html_length(),
            page.get_keywords(),
            page.get_thresholds(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html_parser::ParsedDocument;

    #[test]
    fn test_syllables() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("readability"), 5);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("jumped"), 1);
        assert_eq!(count_syllables("!!"), 0);
    }

    #[test]
    fn test_readability_of_short_sentences() {
        let readability = analyze_readability("The cat sat. The cat ran.");
        assert_eq!(readability.sentence_count, 2);
        assert_eq!(readability.word_count, 6);
        assert!((0.0..=100.0).contains(&readability.flesch_reading_ease));
        assert_eq!(readability.flesch_kincaid_grade, 0.0);
        assert_eq!(readability.level, "Very Easy");
    }

    #[test]
    fn test_readability_of_empty_text() {
        let readability = analyze_readability("   ");
        assert_eq!(readability.sentence_count, 0);
        assert_eq!(readability.flesch_reading_ease, 0.0);
        assert_eq!(readability.level, "Very Difficult");
    }

    #[test]
    fn test_target_keyword_density() {
        let report = analyze_keywords("seo seo seo test", &["seo".to_string()]);
        assert_eq!(report.total_words, 4);
        assert_eq!(report.target_keywords[0].count, 3);
        assert_eq!(report.target_keywords[0].density, "75.00%");
        assert!(report.target_keywords[0].present);
        assert_eq!(report.top_keywords[0].word, "seo");
    }

    #[test]
    fn test_relevant_keywords_skip_stop_words() {
        let report = analyze_keywords(
            "The crate and the parser. The parser is fast, the crate is small.",
            &["missing".to_string()],
        );
        assert_eq!(report.top_keywords[0].word, "the");
        assert_eq!(report.relevant_keywords[0].word, "crate");
        assert!(report.relevant_keywords.iter().all(|k| !STOP_WORDS.contains(&k.word.as_str())));
        assert!(!report.target_keywords[0].present);
        assert_eq!(report.target_keywords[0].density, "0.00%");
    }

    #[test]
    fn test_structure_rating() {
        let document = ParsedDocument::parse(
            "<body><p>One short paragraph.</p><ul><li>a</li><li>b</li></ul></body>",
        );
        let structure = analyze_structure(&document, 150).unwrap();
        assert_eq!(structure.paragraph_count, 1);
        assert_eq!(structure.short_paragraphs, 1);
        assert_eq!(structure.list_count, 1);
        assert_eq!(structure.list_item_count, 2);
        assert_eq!(structure.rating, "Good");

        let empty = analyze_structure(&ParsedDocument::parse("<div>No paragraphs</div>"), 150).unwrap();
        assert_eq!(empty.rating, "Poor");
    }

    #[test]
    fn test_content_ratio_buckets() {
        assert_eq!(analyze_content_ratio("abcde", 100).rating, "Poor");
        assert_eq!(analyze_content_ratio(&"a".repeat(20), 100).rating, "Average");
        assert_eq!(analyze_content_ratio(&"a".repeat(30), 100).rating, "Good");
        assert_eq!(analyze_content_ratio(&"a".repeat(60), 100).rating, "Excellent");
        assert_eq!(analyze_content_ratio("text", 0).ratio, 0.0);
    }

    #[test]
    fn test_thin_content_is_an_issue() {
        let document = ParsedDocument::parse("<body><p>Just a few words here.</p></body>");
        let text = document.body_text();
        let analysis = analyze_content(
            &document,
            &text,
            document.html_length(),
            &[],
            &Thresholds::default(),
        )
        .unwrap();
        assert!(analysis.issues.iter().any(|issue| issue.starts_with("Content is thin")));
        assert!(analysis.score <= 100);
    }
}
