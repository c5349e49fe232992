use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{self as unix_fs, DirBuilderExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::{set_file_times, FileTime};
use log::debug;
use nix::errno::Errno;
use nix::unistd::{Group, User};
use tempfile::Builder;
use walkdir::WalkDir;

use super::{DirEntries, FileSystem, FileSystemError, Result};

#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Falls back to copy-then-remove when a rename crosses devices.
    fn move_across_devices(&self, from: &Path, to: &Path) -> Result<()> {
        debug!("Rename crosses devices, copying {} to {}", from.display(), to.display());

        if fs::symlink_metadata(from).map(|m| m.is_dir()).unwrap_or(false) {
            for entry in WalkDir::new(from) {
                let entry = entry.map_err(|e| walk_error("move", from, e))?;
                let relative = entry.path().strip_prefix(from).map_err(|e| {
                    FileSystemError::io("move", entry.path(), io::Error::new(io::ErrorKind::Other, e))
                })?;
                let target = to.join(relative);
                let file_type = entry.file_type();

                if file_type.is_dir() {
                    fs::create_dir_all(&target)
                        .map_err(|e| FileSystemError::io("create directory", &target, e))?;
                    let permissions = entry
                        .metadata()
                        .map_err(|e| walk_error("move", entry.path(), e))?
                        .permissions();
                    fs::set_permissions(&target, permissions)
                        .map_err(|e| FileSystemError::io("change permissions of", &target, e))?;
                } else if file_type.is_symlink() {
                    let link = fs::read_link(entry.path())
                        .map_err(|e| FileSystemError::io("read link", entry.path(), e))?;
                    unix_fs::symlink(&link, &target)
                        .map_err(|e| FileSystemError::io("create link", &target, e))?;
                } else {
                    fs::copy(entry.path(), &target)
                        .map_err(|e| FileSystemError::io("copy", entry.path(), e))?;
                }
            }
        } else {
            fs::copy(from, to).map_err(|e| FileSystemError::io("copy", from, e))?;
        }

        self.remove(from)
    }
}

fn walk_error(operation: &'static str, root: &Path, error: walkdir::Error) -> FileSystemError {
    let at = error.path().unwrap_or(root).to_path_buf();
    FileSystemError::io(operation, at, error.into())
}

/// Paths touched by an attribute change, children before their directory.
/// The flag marks symlinks found below the root.
fn attribute_targets(
    path: &Path,
    recursive: bool,
    operation: &'static str,
) -> Result<Vec<(PathBuf, bool)>> {
    if !recursive {
        return Ok(vec![(path.to_path_buf(), false)]);
    }

    let mut targets = Vec::new();
    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|e| walk_error(operation, path, e))?;
        let is_link = entry.depth() > 0 && entry.path_is_symlink();
        targets.push((entry.into_path(), is_link));
    }
    debug!("{} entries under {}", targets.len(), path.display());

    Ok(targets)
}

fn resolve_uid(owner: &str) -> Result<u32> {
    if let Ok(uid) = owner.parse::<u32>() {
        return Ok(uid);
    }
    match User::from_name(owner) {
        Ok(Some(user)) => Ok(user.uid.as_raw()),
        Ok(None) => Err(FileSystemError::UnknownUser(owner.to_string())),
        Err(errno) => Err(FileSystemError::io("look up user", owner, errno.into())),
    }
}

fn resolve_gid(group: &str) -> Result<u32> {
    if let Ok(gid) = group.parse::<u32>() {
        return Ok(gid);
    }
    match Group::from_name(group) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        Ok(None) => Err(FileSystemError::UnknownGroup(group.to_string())),
        Err(errno) => Err(FileSystemError::io("look up group", group, errno.into())),
    }
}

fn set_ownership(
    path: &Path,
    uid: Option<u32>,
    gid: Option<u32>,
    recursive: bool,
    operation: &'static str,
) -> Result<()> {
    for (target, is_link) in attribute_targets(path, recursive, operation)? {
        let outcome = if is_link {
            unix_fs::lchown(&target, uid, gid)
        } else {
            unix_fs::chown(&target, uid, gid)
        };
        outcome.map_err(|e| FileSystemError::io(operation, &target, e))?;
    }
    Ok(())
}

// Hard links and "a/../a" style spellings count as the same file
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent)
                .map_err(|e| FileSystemError::io("create directory", parent, e))?;
        }
    }
    Ok(())
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_directory(&self, path: &Path) -> Result<DirEntries<'_>> {
        let entries =
            fs::read_dir(path).map_err(|e| FileSystemError::io("list directory", path, e))?;

        Ok(DirEntries::new(
            path,
            entries.map(|entry| entry.map(|e| e.file_name())),
        ))
    }

    fn create_directory(&self, path: &Path, mode: u32) -> Result<()> {
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .map_err(|e| FileSystemError::io("create directory", path, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FileSystemError::io("remove", path, e)),
        };

        let outcome = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        outcome.map_err(|e| FileSystemError::io("remove", path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()> {
        ensure_parent(to)?;

        if override_existing {
            fs::copy(from, to).map_err(|e| FileSystemError::io("copy", from, e))?;
            return Ok(());
        }

        // create_new makes an existing target an AlreadyExists failure
        let mut source = File::open(from).map_err(|e| FileSystemError::io("copy", from, e))?;
        let permissions = source
            .metadata()
            .map_err(|e| FileSystemError::io("copy", from, e))?
            .permissions();
        let mut target = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(to)
            .map_err(|e| FileSystemError::io("copy to", to, e))?;

        io::copy(&mut source, &mut target).map_err(|e| FileSystemError::io("copy", from, e))?;
        target
            .set_permissions(permissions)
            .map_err(|e| FileSystemError::io("change permissions of", to, e))
    }

    fn touch(&self, path: &Path, modified: SystemTime, accessed: SystemTime) -> Result<()> {
        if !path.is_dir() {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| FileSystemError::io("touch", path, e))?;
        }

        set_file_times(
            path,
            FileTime::from_system_time(accessed),
            FileTime::from_system_time(modified),
        )
        .map_err(|e| FileSystemError::io("touch", path, e))
    }

    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<()> {
        let uid = resolve_uid(owner)?;
        set_ownership(path, Some(uid), None, recursive, "change owner of")
    }

    fn chgrp(&self, path: &Path, group: &str, recursive: bool) -> Result<()> {
        let gid = resolve_gid(group)?;
        set_ownership(path, None, Some(gid), recursive, "change group of")
    }

    fn chmod(&self, path: &Path, mode: u32, umask: u32, recursive: bool) -> Result<()> {
        let permissions = fs::Permissions::from_mode(mode & !umask);

        for (target, is_link) in attribute_targets(path, recursive, "change permissions of")? {
            // chmod on a link would change whatever it points at
            if is_link {
                continue;
            }
            fs::set_permissions(&target, permissions.clone())
                .map_err(|e| FileSystemError::io("change permissions of", &target, e))?;
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path, override_existing: bool) -> Result<()> {
        let target = fs::symlink_metadata(to).ok();

        if let Some(target) = target {
            if !override_existing {
                return Err(FileSystemError::io(
                    "rename to",
                    to,
                    io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"),
                ));
            }
            // Removing the target would delete the source too
            if let Ok(source) = fs::symlink_metadata(from) {
                if same_file(&source, &target) {
                    debug!("{} and {} are the same file", from.display(), to.display());
                    return Ok(());
                }
            }
            if target.is_dir() && self.is_directory(from) {
                debug!("Replacing directory {}", to.display());
                self.remove(to)?;
            }
        }

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(Errno::EXDEV as i32) => {
                self.move_across_devices(from, to)
            }
            Err(e) => Err(FileSystemError::io("rename", from, e)),
        }
    }

    fn dump_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Write beside the target and rename over it, so readers never see a partial file.
        // New files get 0666 less the umask, like a plain create.
        let mut temp = Builder::new()
            .prefix(".path-ops")
            .permissions(fs::Permissions::from_mode(0o666))
            .tempfile_in(directory)
            .map_err(|e| FileSystemError::io("create temporary file in", directory, e))?;
        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| FileSystemError::io("write", temp.path(), e))?;

        if let Ok(existing) = fs::metadata(path) {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(|e| FileSystemError::io("change permissions of", temp.path(), e))?;
        }

        temp.persist(path)
            .map(|_| ())
            .map_err(|e| FileSystemError::io("write", path, e.error))
    }

    fn append_to_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FileSystemError::io("append to", path, e))?;

        file.write_all(content)
            .map_err(|e| FileSystemError::io("append to", path, e))
    }
}
