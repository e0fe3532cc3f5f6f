pub mod config;
pub mod page;
pub mod page_plugin;
pub mod registry;
pub mod score;
