//! Disk abstraction behind the local fetcher.
//!
//! The VFS itself never touches disk; only a [`Fetcher`](crate::Fetcher)
//! reads through this trait to populate it. Tests substitute in-memory
//! implementations.

use std::io;

use camino::Utf8Path;
use camino::Utf8PathBuf;

pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file.
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String>;

    /// Check if a path exists and is a file.
    fn is_file(&self, path: &Utf8Path) -> bool;

    /// Every file under `root`, recursively.
    fn walk_files(&self, root: &Utf8Path) -> Vec<Utf8PathBuf>;
}

/// Standard file system implementation over `std::fs`.
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
        std::fs::read_to_string(path.as_std_path())
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn walk_files(&self, root: &Utf8Path) -> Vec<Utf8PathBuf> {
        walkdir::WalkDir::new(root.as_std_path())
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
            .collect()
    }
}
