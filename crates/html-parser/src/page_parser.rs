use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::dom::{DomError, ParsedDocument, QueryAll};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

#[derive(Debug, Error)]
pub enum PageParserError {
    #[error("Failed to fetch URL: {0}")]
    FetchError(String),
    #[error("Failed to parse URL: {0}")]
    UrlParseError(String),
    #[error("Document not set: {0}")]
    DocumentNotSet(String),
    #[error("DOM query failed: {0}")]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaTagInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub robots: Option<String>,
    pub canonical: Option<String>,
    pub sitemap: Option<String>,
    pub favicon: Option<String>,
    pub viewport: Option<String>,
    pub charset: Option<String>,
    pub lang: Option<String>,
    pub generators: Vec<String>,
    pub webmanifest: Option<String>,
    pub og_tags: BTreeMap<String, String>,
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub twitter_tags: BTreeMap<String, String>,
}

/// Heading texts grouped by level.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub h4: Vec<String>,
    pub h5: Vec<String>,
    pub h6: Vec<String>,
}

impl Headings {
    fn level_mut(&mut self, level: u8) -> Option<&mut Vec<String>> {
        match level {
            1 => Some(&mut self.h1),
            2 => Some(&mut self.h2),
            3 => Some(&mut self.h3),
            4 => Some(&mut self.h4),
            5 => Some(&mut self.h5),
            6 => Some(&mut self.h6),
            _ => None,
        }
    }

    pub fn total(&self) -> usize {
        self.h1.len() + self.h2.len() + self.h3.len() + self.h4.len() + self.h5.len() + self.h6.len()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
    pub srcset: Option<String>,
    pub loading: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LinkType {
    Internal,
    External,
    Mailto,
    Tel,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    pub href: String,
    pub path: String,
    pub text: String,
    pub link_type: LinkType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaseInfo {
    pub base_url: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    pub meta_tags: MetaTagInfo,
    pub headings: Headings,
    pub images: Vec<Image>,
    pub links: Vec<Links>,
    /// Raw text of every `application/ld+json` block, in document order.
    pub structured_data: Vec<String>,
    pub word_count: usize,
    pub base_info: BaseInfo,
}

/// Response of a single page fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub elapsed: Duration,
}

pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, PageParserError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| PageParserError::FetchError(e.to_string()))
}

pub trait FromBaseUrl {
    fn to_url(self) -> Result<Url, PageParserError>;
}

impl FromBaseUrl for Url {
    fn to_url(self) -> Result<Url, PageParserError> {
        Ok(self)
    }
}

impl FromBaseUrl for String {
    fn to_url(self) -> Result<Url, PageParserError> {
        Url::parse(&self).map_err(|e| PageParserError::UrlParseError(e.to_string()))
    }
}

impl FromBaseUrl for &String {
    fn to_url(self) -> Result<Url, PageParserError> {
        Url::parse(self).map_err(|e| PageParserError::UrlParseError(e.to_string()))
    }
}

impl FromBaseUrl for &str {
    fn to_url(self) -> Result<Url, PageParserError> {
        Url::parse(self).map_err(|e| PageParserError::UrlParseError(e.to_string()))
    }
}

pub struct PageParser {
    path: String,
    base_url: Url,
    html_content: Option<String>,
}

impl PageParser {
    pub fn new<T: FromBaseUrl>(base_url: T) -> Result<Self, PageParserError> {
        let base_url = base_url.to_url()?;
        let path = base_url.path().to_string();
        Ok(PageParser {
            base_url,
            path,
            html_content: None,
        })
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    pub fn set_content(&mut self, html: String) {
        self.html_content = Some(html);
    }

    /// Fetches the page body and keeps it as this parser's content.
    pub async fn fetch(&mut self, client: &Client) -> Result<FetchedPage, PageParserError> {
        let started = Instant::now();
        let response = client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| PageParserError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PageParserError::FetchError(format!(
                "Failed to fetch URL: {}",
                response.status()
            )));
        }

        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_lowercase(), value.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| PageParserError::FetchError(e.to_string()))?;
        debug!(url = %url, status, bytes = body.len(), "fetched page");

        self.set_content(body.clone());
        Ok(FetchedPage {
            url,
            status,
            headers,
            body,
            elapsed: started.elapsed(),
        })
    }

    /// Fetches a site-root resource such as `/robots.txt`. Missing or failed
    /// resources yield `None`.
    pub async fn fetch_resource(&self, client: &Client, path: &str) -> Option<String> {
        let url = self.base_url.join(path).ok()?;
        let response = client.get(url.clone()).send().await.ok()?;
        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "resource unavailable");
            return None;
        }
        response.text().await.ok()
    }

    pub fn get_document(&self) -> Result<ParsedDocument, PageParserError> {
        let html = self
            .html_content
            .as_ref()
            .ok_or(PageParserError::DocumentNotSet(
                "Document not set".to_string(),
            ))?;
        Ok(ParsedDocument::parse(html))
    }

    pub fn extract_base(&self) -> BaseInfo {
        BaseInfo {
            base_url: self.base_url.to_string(),
            path: self.path.clone(),
        }
    }

    pub fn extract_meta_tags(&self, document: &impl QueryAll) -> Result<MetaTagInfo, DomError> {
        let mut meta_tags = MetaTagInfo::default();

        if let Some(title) = document.query_first("title")? {
            meta_tags.title = Some(title.trimmed_text());
        }
        if let Some(html) = document.query_first("html")? {
            meta_tags.lang = html.attr("lang").map(str::to_string);
        }

        for link in document.query_all("link[rel]")? {
            let rel = link.attr("rel").unwrap_or_default().to_lowercase();
            let href = link.attr("href").map(str::to_string);
            match rel.as_str() {
                "canonical" => meta_tags.canonical = href,
                "sitemap" => meta_tags.sitemap = href,
                "shortcut icon" | "icon" => meta_tags.favicon = href,
                "manifest" => meta_tags.webmanifest = href,
                "stylesheet" => meta_tags.styles.extend(href),
                _ => {}
            }
        }

        for script in document.query_all("script[src]")? {
            meta_tags
                .scripts
                .extend(script.attr("src").map(str::to_string));
        }

        for meta in document.query_all("meta")? {
            let content = meta.attr("content").map(str::to_string);
            if let Some(charset) = meta.attr("charset") {
                meta_tags.charset = Some(charset.to_string());
            }
            if let Some(name) = meta.attr("name") {
                match name.to_lowercase().as_str() {
                    "description" => meta_tags.description = content.clone(),
                    "robots" => meta_tags.robots = content.clone(),
                    "keywords" => meta_tags.keywords = content.clone(),
                    "viewport" => meta_tags.viewport = content.clone(),
                    "generator" => meta_tags.generators.extend(content.clone()),
                    _ => {}
                }
            }
            // Twitter tags show up under both `name` and `property`.
            let key = meta.attr("property").or_else(|| meta.attr("name"));
            if let (Some(key), Some(value)) = (key, content) {
                if let Some(og) = key.strip_prefix("og:") {
                    meta_tags.og_tags.insert(og.to_string(), value);
                } else if let Some(twitter) = key.strip_prefix("twitter:") {
                    meta_tags.twitter_tags.insert(twitter.to_string(), value);
                }
            }
        }

        Ok(meta_tags)
    }

    pub fn extract_links(&self, document: &impl QueryAll) -> Result<Vec<Links>, DomError> {
        let mut links = Vec::new();

        for link in document.query_all("a[href]")? {
            let Some(href) = link.attr("href") else {
                continue;
            };
            let Ok(url) = self.base_url.join(href) else {
                continue;
            };
            let link_type = match url.scheme() {
                "mailto" => LinkType::Mailto,
                "tel" => LinkType::Tel,
                _ if url.host_str() == self.base_url.host_str() => LinkType::Internal,
                _ => LinkType::External,
            };
            links.push(Links {
                href: url.to_string(),
                path: url.path().to_string(),
                text: link.trimmed_text(),
                link_type,
            });
        }

        Ok(links)
    }

    pub fn extract_images(&self, document: &impl QueryAll) -> Result<Vec<Image>, DomError> {
        Ok(document
            .query_all("img")?
            .into_iter()
            .map(|img| Image {
                src: img.attr("src").unwrap_or_default().to_string(),
                alt: img.attr("alt").map(str::to_string),
                srcset: img.attr("srcset").map(str::to_string),
                loading: img.attr("loading").map(str::to_string),
                width: img.attr("width").map(str::to_string),
                height: img.attr("height").map(str::to_string),
            })
            .collect())
    }

    pub fn extract_headings(&self, document: &impl QueryAll) -> Result<Headings, DomError> {
        let mut headings = Headings::default();

        for heading in document.query_all("h1, h2, h3, h4, h5, h6")? {
            let level = heading
                .tag
                .strip_prefix('h')
                .and_then(|level| level.parse::<u8>().ok())
                .unwrap_or_default();
            if let Some(bucket) = headings.level_mut(level) {
                bucket.push(heading.trimmed_text());
            }
        }

        Ok(headings)
    }

    pub fn extract_structured_data(&self, document: &impl QueryAll) -> Result<Vec<String>, DomError> {
        Ok(document
            .query_all(r#"script[type="application/ld+json"]"#)?
            .into_iter()
            .map(|script| script.text().trim().to_string())
            .collect())
    }

    pub fn analyze_page(&self) -> Result<PageAnalysis, PageParserError> {
        let document = self.get_document()?;
        let word_count = document.body_text().split_whitespace().count();

        Ok(PageAnalysis {
            meta_tags: self.extract_meta_tags(&document)?,
            headings: self.extract_headings(&document)?,
            images: self.extract_images(&document)?,
            links: self.extract_links(&document)?,
            structured_data: self.extract_structured_data(&document)?,
            word_count,
            base_info: self.extract_base(),
        })
    }
}
