//! HTML templates loaded from the template folder with Tera
//!
//! Every view shares `base.tmpl.html`, `header.tmpl.html`, `footer.tmpl.html`
//! and `comment.tmpl.html`. The index view is `index.tmpl.html` and the
//! single page view is `page.tmpl.html`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::content::Page;
use crate::error::Result;

pub const INDEX_TEMPLATE: &str = "index.tmpl.html";
pub const PAGE_TEMPLATE: &str = "page.tmpl.html";

/// Templates every view depends on
const SHARED_TEMPLATES: [&str; 4] = [
    "base.tmpl.html",
    "header.tmpl.html",
    "footer.tmpl.html",
    "comment.tmpl.html",
];

/// Template renderer for the index and page views
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Load and parse all templates from `dir`.
    ///
    /// Fails if any template is missing or does not parse.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if let Ok(cwd) = std::env::current_dir() {
            tracing::debug!("Current working directory: {:?}", cwd);
        }

        let files: Vec<(PathBuf, Option<&str>)> = SHARED_TEMPLATES
            .iter()
            .chain([INDEX_TEMPLATE, PAGE_TEMPLATE].iter())
            .map(|name| (dir.join(name), Some(*name)))
            .collect();

        let mut tera = Tera::default();
        tera.add_template_files(files)?;
        tera.register_filter("date_format", date_format_filter);

        tracing::debug!("Loaded templates from {:?}", dir);
        Ok(Self { tera })
    }

    /// Render the index view over a list of pages
    pub fn render_index(&self, pages: &[Page]) -> Result<String> {
        self.render_with(INDEX_TEMPLATE, "pages", &pages)
    }

    /// Render a single page
    pub fn render_page(&self, page: &Page) -> Result<String> {
        self.render_with(PAGE_TEMPLATE, "page", page)
    }

    fn render_with<T: Serialize + ?Sized>(
        &self,
        template: &str,
        key: &str,
        value: &T,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert(key, value);
        Ok(self.tera.render(template, &context)?)
    }
}

/// Tera filter: reformat an RFC 3339 timestamp, e.g. `{{ page.LastChange | date_format }}`
fn date_format_filter(
    value: &tera::Value,
    args: &std::collections::HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%Y-%m-%d %H:%M".to_string(),
    };

    match chrono::DateTime::parse_from_rfc3339(&s) {
        Ok(date) => Ok(tera::Value::String(date.format(&format).to_string())),
        Err(_) => Ok(tera::Value::String(s)),
    }
}
