use std::collections::{BTreeMap, BTreeSet};

use html_parser::{DomError, Node, QueryAll};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::{
    config::PluginError,
    page::Page,
    page_plugin::{FacetReport, SeoPlugin},
    score::{ScoreCard, average},
};

struct TypeRules {
    types: &'static [&'static str],
    required: &'static [&'static str],
    recommended: &'static [&'static str],
}

const TYPE_RULES: [TypeRules; 2] = [
    TypeRules {
        types: &["Product"],
        required: &["name", "description", "image", "offers"],
        recommended: &["brand", "sku", "aggregateRating", "review"],
    },
    TypeRules {
        types: &["Article", "BlogPosting", "NewsArticle"],
        required: &["headline", "author", "datePublished", "image"],
        recommended: &["dateModified", "publisher", "description", "mainEntityOfPage"],
    },
];

/// (types that satisfy it, selector hinting the page needs it, recommendation)
const CRITICAL_TYPES: [(&[&str], &str, &str); 5] = [
    (
        &["Organization", "LocalBusiness"],
        "header, footer, address",
        "Add Organization or LocalBusiness structured data",
    ),
    (
        &["BreadcrumbList"],
        r#"[class*="breadcrumb"], [id*="breadcrumb"], [aria-label*="breadcrumb"]"#,
        "Add BreadcrumbList structured data for the breadcrumb trail",
    ),
    (
        &["Article", "BlogPosting", "NewsArticle"],
        "article, .article, .post",
        "Add Article structured data to the article content",
    ),
    (
        &["Product"],
        r#".product, [itemprop="price"], [class*="price"]"#,
        "Add Product structured data to the product details",
    ),
    (
        &["FAQPage"],
        r#".faq, #faq, [class*="faq"], details"#,
        "Add FAQPage structured data to the questions and answers",
    ),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchemaSource {
    #[default]
    JsonLd,
    Microdata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidation {
    pub valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaItem {
    pub schema_type: String,
    pub source: SchemaSource,
    pub properties: BTreeMap<String, String>,
    pub validation: SchemaValidation,
}

/// A JSON-LD block that failed to parse, by position among the page's blocks.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAnalysis {
    pub score: u32,
    pub json_ld: Vec<SchemaItem>,
    pub microdata: Vec<SchemaItem>,
    pub errors: Vec<SchemaError>,
    pub types: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Coverage score from the number of properties present.
pub fn property_count_score(count: usize) -> u32 {
    match count {
        0 => 0,
        c if c < 3 => 20,
        c if c < 5 => 40,
        c if c < 8 => 60,
        c if c < 12 => 80,
        _ => 100,
    }
}

pub fn validate_schema(types: &[String], properties: &BTreeMap<String, String>) -> SchemaValidation {
    let mut card = ScoreCard::new(0);
    for rules in TYPE_RULES
        .iter()
        .filter(|rules| types.iter().any(|t| rules.types.contains(&t.as_str())))
    {
        for property in rules.required {
            if !properties.contains_key(*property) {
                card.issue(format!("Missing required property: {property}"));
            }
        }
        for property in rules.recommended {
            if !properties.contains_key(*property) {
                card.recommend(format!("Add recommended property: {property}"));
            }
        }
    }
    card.set(property_count_score(properties.len()) as i32);

    let result = card.finish();
    SchemaValidation {
        valid: result.issues.is_empty(),
        issues: result.issues,
        recommendations: result.recommendations,
        score: result.score,
    }
}

fn type_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(name)) => vec![name.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn property_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Top-level entities of one JSON-LD block. `@graph` is treated like an array.
fn entities(block: &Value) -> Vec<&Map<String, Value>> {
    match block {
        Value::Array(items) => items.iter().flat_map(entities).collect(),
        Value::Object(object) => match object.get("@graph") {
            Some(graph) => entities(graph),
            None => vec![object],
        },
        _ => Vec::new(),
    }
}

fn json_ld_item(block: &Value) -> SchemaItem {
    let mut types = Vec::new();
    let mut properties = BTreeMap::new();
    for entity in entities(block) {
        types.extend(type_names(entity.get("@type")));
        for (key, value) in entity.iter().filter(|(key, _)| !key.starts_with('@')) {
            properties
                .entry(key.clone())
                .or_insert_with(|| property_text(value));
        }
    }
    SchemaItem {
        schema_type: if types.is_empty() {
            "Unknown".to_string()
        } else {
            types.join(", ")
        },
        source: SchemaSource::JsonLd,
        validation: validate_schema(&types, &properties),
        properties,
    }
}

pub fn extract_json_ld(document: &impl QueryAll) -> Result<(Vec<SchemaItem>, Vec<SchemaError>), DomError> {
    let mut items = Vec::new();
    let mut errors = Vec::new();
    for (index, script) in document
        .query_all(r#"script[type="application/ld+json"]"#)?
        .iter()
        .enumerate()
    {
        match serde_json::from_str::<Value>(script.text().trim()) {
            Ok(block) => items.push(json_ld_item(&block)),
            Err(e) => errors.push(SchemaError {
                index,
                message: e.to_string(),
            }),
        }
    }
    Ok((items, errors))
}

fn itemprop_value(node: &Node) -> String {
    let attr = match node.tag.as_str() {
        "meta" => Some("content"),
        "img" | "audio" | "video" | "source" | "iframe" | "embed" => Some("src"),
        "a" | "link" | "area" => Some("href"),
        "time" => Some("datetime"),
        _ => None,
    };
    attr.and_then(|name| node.attr(name))
        .or_else(|| node.attr("content"))
        .map(str::to_string)
        .unwrap_or_else(|| node.trimmed_text())
}

pub fn extract_microdata(document: &impl QueryAll) -> Result<Vec<SchemaItem>, DomError> {
    let mut items = Vec::new();
    for scope in document.query_all("[itemscope]")? {
        let schema_type = scope
            .attr("itemtype")
            .and_then(|itemtype| itemtype.trim_end_matches('/').rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown")
            .to_string();

        // Properties under a nested itemscope belong to that item.
        let mut nested = Vec::new();
        for inner in scope.query_all("[itemscope]")? {
            nested.extend(inner.query_all("[itemprop]")?);
        }

        let mut properties = BTreeMap::new();
        for prop in scope.query_all("[itemprop]")? {
            if nested.contains(&prop) {
                continue;
            }
            if let Some(name) = prop.attr("itemprop") {
                properties
                    .entry(name.to_string())
                    .or_insert_with(|| itemprop_value(&prop));
            }
        }

        items.push(SchemaItem {
            validation: validate_schema(std::slice::from_ref(&schema_type), &properties),
            schema_type,
            source: SchemaSource::Microdata,
            properties,
        });
    }
    Ok(items)
}

pub fn analyze_schema(document: &impl QueryAll) -> Result<SchemaAnalysis, DomError> {
    let (json_ld, errors) = extract_json_ld(document)?;
    let microdata = extract_microdata(document)?;

    let types: BTreeSet<String> = json_ld
        .iter()
        .chain(&microdata)
        .flat_map(|item| item.schema_type.split(", "))
        .filter(|name| *name != "Unknown")
        .map(str::to_string)
        .collect();

    let mut card = ScoreCard::new(0);
    for error in &errors {
        card.issue(format!("JSON-LD block {} is not valid JSON: {}", error.index, error.message));
    }
    if json_ld.is_empty() && microdata.is_empty() {
        card.issue("No structured data found")
            .recommend("Add JSON-LD structured data describing the page");
    }
    for item in json_ld.iter().chain(&microdata) {
        for issue in &item.validation.issues {
            card.issue(format!("{}: {issue}", item.schema_type));
        }
        for recommendation in &item.validation.recommendations {
            card.recommend(format!("{}: {recommendation}", item.schema_type));
        }
    }
    for (satisfied_by, hint, recommendation) in CRITICAL_TYPES {
        let present = satisfied_by.iter().any(|name| types.contains(*name));
        if !present && document.exists(hint)? {
            card.recommend(recommendation);
        }
    }
    let messages = card.finish();

    let item_scores: Vec<u32> = json_ld
        .iter()
        .chain(&microdata)
        .map(|item| item.validation.score)
        .collect();

    Ok(SchemaAnalysis {
        score: average(&item_scores),
        json_ld,
        microdata,
        errors,
        types: types.into_iter().collect(),
        issues: messages.issues,
        recommendations: messages.recommendations,
    })
}

// Schema Plugin
pub struct SchemaPlugin {}

impl Default for SchemaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl SeoPlugin for SchemaPlugin {
    fn name(&self) -> &str {
        "schema"
    }
    fn description(&self) -> &str {
        "JSON-LD and microdata structured data"
    }

    fn analyze(&self, page: &Page) -> Result<FacetReport, PluginError> {
        Ok(FacetReport::Schema(analyze_schema(&page.get_document())?))
    }
}
