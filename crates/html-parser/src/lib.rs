pub mod dom;
pub mod page_parser;

pub use dom::{Ancestor, DomError, Node, ParsedDocument, QueryAll};
