//! Temporary asset directories for thumbnail tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Relative directory thumbnails live in under the assets root.
pub const THUMBNAIL_SUBDIR: &str = "img/mapthumbs";

/// An assets directory with an empty `img/mapthumbs/` inside, removed on drop.
pub struct TempAssets {
    dir: TempDir,
}

impl TempAssets {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join(THUMBNAIL_SUBDIR))?;
        Ok(Self { dir })
    }

    /// Root of the assets directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.dir.path().join(THUMBNAIL_SUBDIR)
    }

    /// Place a thumbnail file named `name` and return its full path.
    pub fn add_thumbnail(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.thumbnail_dir().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Whether `img/mapthumbs/<name>` exists.
    pub fn has_thumbnail(&self, name: &str) -> bool {
        self.thumbnail_dir().join(name).is_file()
    }

    /// Write a file relative to the assets root, creating parents.
    pub fn write_file(&self, relative: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}
