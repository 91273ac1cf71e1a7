//! Page loader - builds pages from markdown files in the source directory

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{MarkdownRenderer, Page};
use crate::comments::{validate_title, CommentStore};
use crate::error::{BlogError, Result};

/// Loads pages and attaches their stored comments
#[derive(Debug, Clone)]
pub struct PageLoader {
    renderer: MarkdownRenderer,
    comments: CommentStore,
}

impl PageLoader {
    /// Create a new page loader reading comments from `comments`
    pub fn new(comments: CommentStore) -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            comments,
        }
    }

    /// The comment store pages are merged with
    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    /// Load a single page from a file
    pub fn load_page(&self, path: &Path) -> Result<Page> {
        let metadata = fs::metadata(path).map_err(|e| BlogError::io(path, e))?;

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let last_change = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .map_err(|e| BlogError::io(path, e))?;

        let comments = self.comments.load(&title)?;

        let bytes = fs::read(path).map_err(|e| BlogError::io(path, e))?;
        let content = self.renderer.render(&String::from_utf8_lossy(&bytes));

        Ok(Page {
            title,
            last_change,
            content,
            comments,
        })
    }

    /// Load the page `name` from `source_dir`. The name comes from a URL and
    /// must be a plain file name.
    pub fn load_named(&self, source_dir: &Path, name: &str) -> Result<Page> {
        let name = validate_title(name)?;
        self.load_page(&source_dir.join(name))
    }

    /// Load every file directly inside `dir`, in file-name order.
    ///
    /// Sub-directories are skipped. The first page that fails to load
    /// aborts the whole listing.
    pub fn load_pages(&self, dir: &Path) -> Result<Vec<Page>> {
        let mut pages = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                BlogError::io(path, source)
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            pages.push(self.load_page(entry.path())?);
        }

        tracing::debug!("Loaded {} pages from {:?}", pages.len(), dir);
        Ok(pages)
    }
}
