mod real;

pub use real::RealFileSystem;

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("Failed to {operation} {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),
}

impl FileSystemError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileSystemError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> Option<io::ErrorKind> {
        match self {
            FileSystemError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

pub fn is_pseudo_entry(name: &OsStr) -> bool {
    name == "." || name == ".."
}

/// Lazy listing of the entry names of one directory, without `.` and `..`.
pub struct DirEntries<'a> {
    path: PathBuf,
    inner: Box<dyn Iterator<Item = io::Result<OsString>> + 'a>,
}

impl<'a> DirEntries<'a> {
    pub fn new<I>(path: impl Into<PathBuf>, inner: I) -> Self
    where
        I: Iterator<Item = io::Result<OsString>> + 'a,
    {
        Self {
            path: path.into(),
            inner: Box::new(inner),
        }
    }
}

impl Iterator for DirEntries<'_> {
    type Item = Result<OsString>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(name) if is_pseudo_entry(&name) => continue,
                Ok(name) => return Some(Ok(name)),
                Err(e) => return Some(Err(FileSystemError::io("list directory", &self.path, e))),
            }
        }
    }
}

impl std::fmt::Debug for DirEntries<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirEntries").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Native operations on a single path. Batching and logging happen in `PathOperations`.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> Result<bool>;

    fn is_directory(&self, path: &Path) -> bool;

    fn list_directory(&self, path: &Path) -> Result<DirEntries<'_>>;

    /// Creates `path` and any missing parents. An existing directory is fine.
    fn create_directory(&self, path: &Path, mode: u32) -> Result<()>;

    /// Removes a file or a whole tree. A missing path is not an error.
    fn remove(&self, path: &Path) -> Result<()>;

    fn copy_file(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()>;

    fn touch(&self, path: &Path, modified: SystemTime, accessed: SystemTime) -> Result<()>;

    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<()>;

    fn chgrp(&self, path: &Path, group: &str, recursive: bool) -> Result<()>;

    fn chmod(&self, path: &Path, mode: u32, umask: u32, recursive: bool) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()>;

    fn dump_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    fn append_to_file(&self, path: &Path, content: &[u8]) -> Result<()>;
}
