//! Selector-driven DOM access.
//!
//! Analyzers never touch `scraper` directly. They ask a [`QueryAll`]
//! implementation for [`Node`]s, which keeps them testable with hand-built
//! nodes. Selected nodes share the parsed tree, so neither they nor the
//! document are `Send` and both stay out of async code.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Capability every document source provides to the analyzers.
pub trait QueryAll {
    fn query_all(&self, selector: &str) -> Result<Vec<Node>, DomError>;

    fn query_first(&self, selector: &str) -> Result<Option<Node>, DomError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    fn exists(&self, selector: &str) -> Result<bool, DomError> {
        Ok(!self.query_all(selector)?.is_empty())
    }
}

/// The parts of an enclosing element the analyzers care about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ancestor {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub role: Option<String>,
    /// Hidden by its own markup: `hidden`, `aria-hidden="true"` or an inline
    /// `display:none` / `visibility:hidden` style.
    pub hidden: bool,
}

impl Ancestor {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// True when the tag equals one of `names`, or the id / a class
    /// contains one of them.
    pub fn matches_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| {
            self.tag.eq_ignore_ascii_case(name)
                || self
                    .id
                    .as_deref()
                    .is_some_and(|id| id.to_lowercase().contains(name))
                || self
                    .classes
                    .iter()
                    .any(|class| class.to_lowercase().contains(name))
        })
    }

    fn from_element(element: &ElementRef) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_string(),
            id: value.id().map(str::to_string),
            classes: value.classes().map(str::to_string).collect(),
            role: value.attr("role").map(str::to_string),
            hidden: hidden_by_markup(|name| value.attr(name)),
        }
    }
}

fn hidden_by_markup<'a>(attr: impl Fn(&str) -> Option<&'a str>) -> bool {
    let style = attr("style").unwrap_or_default().to_lowercase().replace(' ', "");
    attr("hidden").is_some()
        || attr("aria-hidden") == Some("true")
        || style.contains("display:none")
        || style.contains("visibility:hidden")
}

/// Position of an element inside the document it was selected from.
#[derive(Clone)]
struct TreeHandle {
    html: Rc<Html>,
    id: NodeId,
}

impl TreeHandle {
    fn element(&self) -> Option<ElementRef<'_>> {
        self.html.tree.get(self.id).and_then(ElementRef::wrap)
    }
}

impl fmt::Debug for TreeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TreeHandle").field(&self.id).finish()
    }
}

impl PartialEq for TreeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.html, &other.html) && self.id == other.id
    }
}

impl Eq for TreeHandle {}

/// One element. Selected nodes read their text and ancestors from the
/// document on demand; nodes built by hand carry only what they were given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    given_ancestors: Vec<Ancestor>,
    handle: Option<TreeHandle>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_ancestor(mut self, ancestor: Ancestor) -> Self {
        self.given_ancestors.push(ancestor);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        self.handle
            .as_ref()
            .and_then(TreeHandle::element)
            .map(|element| element.text().collect())
            .unwrap_or_default()
    }

    pub fn trimmed_text(&self) -> String {
        self.text().trim().to_string()
    }

    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }

    /// Enclosing elements, nearest first.
    pub fn ancestors(&self) -> Vec<Ancestor> {
        match self.handle.as_ref().and_then(TreeHandle::element) {
            Some(element) => element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .map(|ancestor| Ancestor::from_element(&ancestor))
                .collect(),
            None => self.given_ancestors.clone(),
        }
    }

    /// True when this node or any ancestor satisfies [`Ancestor::matches_any`].
    pub fn within(&self, names: &[&str]) -> bool {
        self.as_ancestor().matches_any(names)
            || self.ancestors().iter().any(|a| a.matches_any(names))
    }

    /// Hidden by its own attributes; see [`Ancestor::hidden`].
    pub fn hidden_by_markup(&self) -> bool {
        hidden_by_markup(|name| self.attr(name))
    }

    fn as_ancestor(&self) -> Ancestor {
        Ancestor {
            tag: self.tag.clone(),
            id: self.id().map(str::to_string),
            classes: self.classes().map(str::to_string).collect(),
            role: self.attr("role").map(str::to_string),
            hidden: self.hidden_by_markup(),
        }
    }

    fn from_element(html: &Rc<Html>, element: ElementRef) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_string(),
            attributes: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            given_ancestors: Vec::new(),
            handle: Some(TreeHandle {
                html: Rc::clone(html),
                id: element.id(),
            }),
        }
    }
}

impl QueryAll for Node {
    /// Descendants of this element in its original document, excluding the
    /// element itself. Hand-built nodes have no descendants.
    fn query_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let parsed = parse_selector(selector)?;
        let Some(handle) = &self.handle else {
            return Ok(Vec::new());
        };
        let Some(element) = handle.element() else {
            return Ok(Vec::new());
        };
        Ok(element
            .select(&parsed)
            .map(|found| Node::from_element(&handle.html, found))
            .collect())
    }
}

/// A parsed HTML document.
pub struct ParsedDocument {
    html: Rc<Html>,
    source_length: usize,
}

impl ParsedDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Rc::new(Html::parse_document(source)),
            source_length: source.len(),
        }
    }

    /// Length in bytes of the markup this document was parsed from.
    pub fn html_length(&self) -> usize {
        self.source_length
    }

    /// Visible body text with script/style content removed and whitespace
    /// collapsed.
    pub fn body_text(&self) -> String {
        let root = Selector::parse("body")
            .ok()
            .and_then(|body| self.html.select(&body).next())
            .unwrap_or_else(|| self.html.root_element());

        let mut words: Vec<&str> = Vec::new();
        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden_parent = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|e| e.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
            if !hidden_parent {
                words.extend(text.split_whitespace());
            }
        }
        words.join(" ")
    }
}

impl QueryAll for ParsedDocument {
    fn query_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let parsed = parse_selector(selector)?;
        Ok(self
            .html
            .select(&parsed)
            .map(|element| Node::from_element(&self.html, element))
            .collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
