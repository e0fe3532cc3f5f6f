pub mod content;
pub mod headers;
pub mod lazy_load;
pub mod meta;
pub mod mobile;
pub mod schema;
pub mod social;
pub mod url;
