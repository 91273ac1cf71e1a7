//! List the pages of the blog

use anyhow::Result;
use std::io::Write;

use crate::content::Page;
use crate::Blog;

/// Print every page with its last change and comment count
pub fn run(blog: &Blog) -> Result<()> {
    let pages = blog.load_pages()?;
    let stdout = std::io::stdout();
    write_listing(&mut stdout.lock(), &pages)?;
    Ok(())
}

fn write_listing<W: Write>(out: &mut W, pages: &[Page]) -> Result<()> {
    writeln!(out, "Pages ({}):", pages.len())?;
    for page in pages {
        let comments = match page.comments.len() {
            1 => "1 comment".to_string(),
            n => format!("{} comments", n),
        };
        writeln!(
            out,
            "  {} - {} [{}]",
            page.last_change.format("%Y-%m-%d %H:%M"),
            page.title,
            comments
        )?;
    }
    Ok(())
}
