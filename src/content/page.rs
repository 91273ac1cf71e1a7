//! Page model

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;

use crate::comments::Comment;

/// A rendered markdown file plus its metadata and comments
///
/// Serialized with capitalized keys (`Title`, `LastChange`, `Content`,
/// `Comments`), which is the shape of the JSON API and the names the
/// templates use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page {
    /// File name of the source file
    pub title: String,

    /// Modification time of the source file
    pub last_change: DateTime<Local>,

    /// Rendered HTML content
    pub content: String,

    /// Stored comments, oldest first
    pub comments: Vec<Comment>,
}

impl Default for Page {
    /// The zero page, shown when a page cannot be loaded
    fn default() -> Self {
        Self {
            title: String::new(),
            last_change: DateTime::<Local>::from(UNIX_EPOCH),
            content: String::new(),
            comments: Vec::new(),
        }
    }
}
