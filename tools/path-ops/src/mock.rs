use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::Level;
use nix::errno::Errno;

use crate::filesystem::{DirEntries, FileSystem, FileSystemError, Result};
use crate::logger::{LogContext, Logger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntryKind {
    File(Vec<u8>),
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEntry {
    pub kind: MockEntryKind,
    pub mode: u32,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub modified: SystemTime,
    pub accessed: SystemTime,
}

impl MockEntry {
    fn file(content: Vec<u8>) -> Self {
        Self {
            kind: MockEntryKind::File(content),
            mode: 0o644,
            owner: None,
            group: None,
            modified: UNIX_EPOCH,
            accessed: UNIX_EPOCH,
        }
    }

    fn directory(mode: u32) -> Self {
        Self {
            kind: MockEntryKind::Directory,
            mode,
            owner: None,
            group: None,
            modified: UNIX_EPOCH,
            accessed: UNIX_EPOCH,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == MockEntryKind::Directory
    }
}

type Entries = BTreeMap<PathBuf, MockEntry>;

/// In-memory backend. `/` always exists; listings include `.` and `..`
/// the way `readdir` does.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<Entries>>,
    listed: Arc<Mutex<Vec<PathBuf>>>,
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new("/")
}

fn is_directory_in(entries: &Entries, path: &Path) -> bool {
    is_root(path) || entries.get(path).map(MockEntry::is_directory).unwrap_or(false)
}

fn error(operation: &'static str, path: &Path, kind: io::ErrorKind) -> FileSystemError {
    FileSystemError::io(operation, path, io::Error::from(kind))
}

fn errno(operation: &'static str, path: &Path, errno: Errno) -> FileSystemError {
    FileSystemError::io(operation, path, errno.into())
}

fn require_parent(entries: &Entries, operation: &'static str, path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !is_directory_in(entries, parent) => {
            Err(error(operation, path, io::ErrorKind::NotFound))
        }
        _ => Ok(()),
    }
}

fn create_directories(
    entries: &mut Entries,
    operation: &'static str,
    path: &Path,
    mode: u32,
) -> Result<()> {
    let mut chain: Vec<&Path> = path.ancestors().filter(|a| !is_root(a)).collect();
    chain.reverse();

    for ancestor in chain {
        match entries.get(ancestor) {
            Some(entry) if entry.is_directory() => continue,
            Some(_) => return Err(error(operation, path, io::ErrorKind::AlreadyExists)),
            None => {
                entries.insert(ancestor.to_path_buf(), MockEntry::directory(mode));
            }
        }
    }
    Ok(())
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, creating its parent directories.
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            create_directories(&mut entries, "add file", parent, 0o755).unwrap();
        }
        entries.insert(path, MockEntry::file(content.into()));
    }

    pub fn add_directory(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut entries = self.entries.lock().unwrap();
        create_directories(&mut entries, "add directory", &path, 0o755).unwrap();
    }

    pub fn get_file_content(&self, path: &Path) -> Option<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path).map(|e| &e.kind) {
            Some(MockEntryKind::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn entry(&self, path: &Path) -> Option<MockEntry> {
        self.entries.lock().unwrap().get(path).cloned()
    }

    pub fn list_all_files(&self) -> Vec<PathBuf> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|(_, entry)| !entry.is_directory())
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<PathBuf, MockEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Every directory passed to `list_directory`, in call order.
    pub fn listed_directories(&self) -> Vec<PathBuf> {
        self.listed.lock().unwrap().clone()
    }

    fn update_tree<F>(&self, operation: &'static str, path: &Path, recursive: bool, mut update: F) -> Result<()>
    where
        F: FnMut(&mut MockEntry),
    {
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(path) {
            return Err(error(operation, path, io::ErrorKind::NotFound));
        }

        for (entry_path, entry) in entries.iter_mut() {
            if entry_path == path || (recursive && entry_path.starts_with(path)) {
                update(entry);
            }
        }
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> Result<bool> {
        let entries = self.entries.lock().unwrap();
        Ok(is_root(path) || entries.contains_key(path))
    }

    fn is_directory(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        is_directory_in(&entries, path)
    }

    fn list_directory(&self, path: &Path) -> Result<DirEntries<'_>> {
        let entries = self.entries.lock().unwrap();
        if !is_directory_in(&entries, path) {
            return Err(match entries.get(path) {
                Some(_) => errno("list directory", path, Errno::ENOTDIR),
                None => error("list directory", path, io::ErrorKind::NotFound),
            });
        }
        self.listed.lock().unwrap().push(path.to_path_buf());

        let mut names = vec![OsString::from("."), OsString::from("..")];
        names.extend(
            entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .filter_map(|p| p.file_name().map(|name| name.to_os_string())),
        );

        Ok(DirEntries::new(path, names.into_iter().map(Ok)))
    }

    fn create_directory(&self, path: &Path, mode: u32) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        create_directories(&mut entries, "create directory", path, mode)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|entry_path, _| !entry_path.starts_with(path));
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();

        let source = match entries.get(from) {
            Some(entry) if entry.is_directory() => return Err(errno("copy", from, Errno::EISDIR)),
            Some(entry) => entry.clone(),
            None => return Err(error("copy", from, io::ErrorKind::NotFound)),
        };

        match entries.get(to) {
            Some(entry) if entry.is_directory() => return Err(errno("copy to", to, Errno::EISDIR)),
            Some(_) if !override_existing => {
                return Err(error("copy to", to, io::ErrorKind::AlreadyExists))
            }
            _ => {}
        }
        if let Some(parent) = to.parent() {
            create_directories(&mut entries, "copy to", parent, 0o777)?;
        }

        entries.insert(to.to_path_buf(), source);
        Ok(())
    }

    fn touch(&self, path: &Path, modified: SystemTime, accessed: SystemTime) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(path) {
            require_parent(&entries, "touch", path)?;
            entries.insert(path.to_path_buf(), MockEntry::file(Vec::new()));
        }

        if let Some(entry) = entries.get_mut(path) {
            entry.modified = modified;
            entry.accessed = accessed;
        }
        Ok(())
    }

    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<()> {
        self.update_tree("change owner of", path, recursive, |entry| {
            entry.owner = Some(owner.to_string());
        })
    }

    fn chgrp(&self, path: &Path, group: &str, recursive: bool) -> Result<()> {
        self.update_tree("change group of", path, recursive, |entry| {
            entry.group = Some(group.to_string());
        })
    }

    fn chmod(&self, path: &Path, mode: u32, umask: u32, recursive: bool) -> Result<()> {
        self.update_tree("change permissions of", path, recursive, |entry| {
            entry.mode = mode & !umask;
        })
    }

    fn rename(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();

        let source_is_directory = match entries.get(from) {
            Some(entry) => entry.is_directory(),
            None => return Err(error("rename", from, io::ErrorKind::NotFound)),
        };

        if let Some(target) = entries.get(to) {
            if !override_existing {
                return Err(error("rename to", to, io::ErrorKind::AlreadyExists));
            }
            if from == to {
                return Ok(());
            }
            if target.is_directory() && !source_is_directory {
                return Err(errno("rename to", to, Errno::EISDIR));
            }
            entries.retain(|entry_path, _| !entry_path.starts_with(to));
        }
        require_parent(&entries, "rename to", to)?;

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old_path in moved {
            let entry = entries.remove(&old_path).unwrap();
            let relative = old_path.strip_prefix(from).unwrap();
            let new_path = if relative.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(relative)
            };
            entries.insert(new_path, entry);
        }
        Ok(())
    }

    fn dump_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            create_directories(&mut entries, "write", parent, 0o777)?;
        }

        match entries.get_mut(path) {
            Some(entry) if entry.is_directory() => Err(errno("write", path, Errno::EISDIR)),
            Some(entry) => {
                entry.kind = MockEntryKind::File(content.to_vec());
                Ok(())
            }
            None => {
                entries.insert(path.to_path_buf(), MockEntry::file(content.to_vec()));
                Ok(())
            }
        }
    }

    fn append_to_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            create_directories(&mut entries, "append to", parent, 0o777)?;
        }

        match entries.get_mut(path).map(|entry| &mut entry.kind) {
            Some(MockEntryKind::Directory) => Err(errno("append to", path, Errno::EISDIR)),
            Some(MockEntryKind::File(existing)) => {
                existing.extend_from_slice(content);
                Ok(())
            }
            None => {
                entries.insert(path.to_path_buf(), MockEntry::file(content.to_vec()));
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub context: LogContext,
}

/// Logger spy that keeps every record. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str, context: &LogContext) {
        self.records.lock().unwrap().push(LogRecord {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }
}
