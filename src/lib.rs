//! mdblog: a small blog server for a folder of markdown files
//!
//! Pages are rendered from markdown on every request, comments are stored
//! as one JSON file per page, and a JSON dump of all pages is served under
//! `/api/`.

pub mod comments;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use error::BlogError;

/// Name of the optional config file in the base directory
pub const CONFIG_FILE: &str = "blog.yml";

/// The blog application: configuration plus resolved directories
#[derive(Debug, Clone)]
pub struct Blog {
    /// Blog configuration
    pub config: config::BlogConfig,
    /// Base directory relative paths resolve against
    pub base_dir: PathBuf,
    /// Markdown source directory
    pub source_dir: PathBuf,
    /// Template directory
    pub template_dir: PathBuf,
    /// Static files directory
    pub files_dir: PathBuf,
    /// Comment store directory
    pub comments_dir: PathBuf,
}

impl Blog {
    /// Create a blog from a directory, reading `blog.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::BlogConfig::load(&config_path)?
        } else {
            config::BlogConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a blog from an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::BlogConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();

        let source_dir = base_dir.join(&config.source_dir);
        let template_dir = base_dir.join(&config.template_dir);
        let files_dir = base_dir.join(&config.files_dir);
        let comments_dir = base_dir.join(&config.comments_dir);

        Self {
            config,
            base_dir,
            source_dir,
            template_dir,
            files_dir,
            comments_dir,
        }
    }

    /// A page loader reading comments from this blog's comment store
    pub fn loader(&self) -> content::PageLoader {
        content::PageLoader::new(comments::CommentStore::new(&self.comments_dir))
    }

    /// Load every page of the source directory
    pub fn load_pages(&self) -> Result<Vec<content::Page>> {
        Ok(self.loader().load_pages(&self.source_dir)?)
    }
}
