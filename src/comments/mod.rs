//! Comment store - one JSON file of comments per page
//!
//! Comments for a page titled `hello.md` live in `<dir>/hello.md.json` as a
//! JSON array of `{"name": ..., "content": ...}` objects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{BlogError, Result};

/// A named text annotation attached to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub name: String,
    pub content: String,
}

impl Comment {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Reject titles taken from a URL that are not a plain file name
pub fn validate_title(title: &str) -> Result<&str> {
    validate_key(title)?;
    if title.contains('\\') {
        return Err(BlogError::InvalidTitle(title.to_string()));
    }
    Ok(title)
}

/// Reject store keys that would escape the store directory.
///
/// Looser than [`validate_title`]: file names read from disk may contain
/// any character the platform does not treat as a separator.
fn validate_key(title: &str) -> Result<&str> {
    let bad = title.is_empty()
        || title == "."
        || title == ".."
        || title.contains('\0')
        || title.chars().any(std::path::is_separator);
    if bad {
        return Err(BlogError::InvalidTitle(title.to_string()));
    }
    Ok(title)
}

/// Flat-file comment storage keyed by page title
#[derive(Debug, Clone)]
pub struct CommentStore {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl CommentStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the comment file for a page
    pub fn path_for(&self, title: &str) -> Result<PathBuf> {
        let title = validate_key(title)?;
        Ok(self.dir.join(format!("{}.json", title)))
    }

    /// Load all comments of a page. A missing file means no comments yet.
    pub fn load(&self, title: &str) -> Result<Vec<Comment>> {
        let path = self.path_for(title)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BlogError::io(path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| BlogError::Decode { path, source })
    }

    /// Replace the stored comments of a page.
    ///
    /// The list is written to a temporary sibling and renamed over the target,
    /// so a shorter list never leaves bytes of a longer one behind.
    pub fn save(&self, title: &str, comments: &[Comment]) -> Result<()> {
        let path = self.path_for(title)?;
        fs::create_dir_all(&self.dir).map_err(|e| BlogError::io(&self.dir, e))?;

        let mut json = serde_json::to_vec(comments).map_err(|source| BlogError::Encode {
            path: path.clone(),
            source,
        })?;
        json.push(b'\n');

        let tmp = self.dir.join(format!(".{}.json.tmp", title));
        fs::write(&tmp, &json).map_err(|e| BlogError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(BlogError::io(path, e));
        }

        tracing::debug!("Saved {} comments to {:?}", comments.len(), path);
        Ok(())
    }

    /// Append one comment, holding the page's lock across load and save.
    /// Returns the full list as stored.
    pub fn append(&self, title: &str, comment: Comment) -> Result<Vec<Comment>> {
        validate_title(title)?;
        let lock = self.lock_for(title);

        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.load(title).and_then(|mut comments| {
                comments.push(comment);
                self.save(title, &comments)?;
                Ok(comments)
            })
        };

        self.release(title, lock);
        result
    }

    fn lock_for(&self, title: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(title.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other writer holds the page's lock
    fn release(&self, title: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(title);
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, CommentStore) {
        let dir = TempDir::new().unwrap();
        let store = CommentStore::new(dir.path().join("comments"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        assert!(store.load("hello.md").unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store();
        let comments = vec![Comment::new("Ann", "First"), Comment::new("Bob", "Nice!")];
        store.save("hello.md", &comments).unwrap();
        assert_eq!(store.load("hello.md").unwrap(), comments);
    }

    #[test]
    fn test_shorter_save_leaves_no_trailing_bytes() {
        let (_dir, store) = store();
        let long = vec![
            Comment::new("Ann", "a rather long comment body"),
            Comment::new("Bob", "another long comment body"),
        ];
        store.save("hello.md", &long).unwrap();

        let short = vec![Comment::new("C", "x")];
        store.save("hello.md", &short).unwrap();

        assert_eq!(store.load("hello.md").unwrap(), short);
        let raw = fs::read_to_string(store.path_for("hello.md").unwrap()).unwrap();
        assert_eq!(raw, "[{\"name\":\"C\",\"content\":\"x\"}]\n");
    }

    #[test]
    fn test_append_preserves_order() {
        let (_dir, store) = store();
        store.append("post.md", Comment::new("Ann", "one")).unwrap();
        store.append("post.md", Comment::new("Bob", "two")).unwrap();
        let all = store.append("post.md", Comment::new("Cid", "three")).unwrap();

        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Ann", "Bob", "Cid"]);
        assert_eq!(store.load("post.md").unwrap(), all);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let (_dir, store) = store();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .append("busy.md", Comment::new(format!("user{}", i), "hi"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.load("busy.md").unwrap().len(), 8);
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for("bad.md").unwrap(), "{not json").unwrap();

        let err = store.load("bad.md").unwrap_err();
        assert!(matches!(err, BlogError::Decode { .. }));
    }

    #[test]
    fn test_invalid_titles_rejected() {
        let (dir, store) = store();
        for title in ["", ".", "..", "../escape", "a/b"] {
            assert!(
                matches!(store.load(title), Err(BlogError::InvalidTitle(_))),
                "title {:?} should be rejected",
                title
            );
            assert!(store.append(title, Comment::new("x", "y")).is_err());
        }
        assert!(!dir.path().join("escape.json").exists());
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_backslash_title_only_rejected_from_urls() {
        assert!(matches!(
            validate_title("a\\b"),
            Err(BlogError::InvalidTitle(_))
        ));

        let (_dir, store) = store();
        assert!(store.append("a\\b", Comment::new("x", "y")).is_err());

        #[cfg(unix)]
        {
            store.save("a\\b", &[Comment::new("x", "y")]).unwrap();
            assert_eq!(store.load("a\\b").unwrap(), vec![Comment::new("x", "y")]);
        }
    }

    #[test]
    fn test_lock_map_is_emptied_after_append() {
        let (_dir, store) = store();
        for i in 0..20 {
            store
                .append(&format!("page{}.md", i), Comment::new("a", "b"))
                .unwrap();
        }
        assert_eq!(store.lock_count(), 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.append("shared.md", Comment::new("a", "b")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.lock_count(), 0);
        assert_eq!(store.load("shared.md").unwrap().len(), 8);
    }

    #[test]
    fn test_comment_json_keys() {
        let json = serde_json::to_string(&Comment::new("Bob", "Nice!")).unwrap();
        assert_eq!(json, r#"{"name":"Bob","content":"Nice!"}"#);
    }
}
