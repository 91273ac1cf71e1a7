//! Content module - pages, markdown rendering and page loading

pub mod loader;
mod markdown;
mod page;

pub use loader::PageLoader;
pub use markdown::MarkdownRenderer;
pub use page::Page;
