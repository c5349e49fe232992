mod copy;

use std::path::Path;
use std::time::SystemTime;

use log::Level;

use crate::config::PathOpsConfig;
use crate::filesystem::{FileSystem, Result};
use crate::format::{normalize_mode, paths_string, unix_seconds};
use crate::logger::{LogContext, Logger};

/// Prepended to the message of every simulated operation.
pub const DRY_RUN_PREFIX: &str = "DRYRUN: ";

/// Filesystem mutations with optional dry-run and one log line per call.
/// A failed call logs nothing.
pub struct PathOperations<FS: FileSystem, L: Logger> {
    filesystem: FS,
    logger: L,
    config: PathOpsConfig,
}

impl<FS: FileSystem, L: Logger> PathOperations<FS, L> {
    pub fn new(filesystem: FS, logger: L) -> Self {
        Self::with_config(filesystem, logger, PathOpsConfig::default())
    }

    pub fn with_config(filesystem: FS, logger: L, config: PathOpsConfig) -> Self {
        Self {
            filesystem,
            logger,
            config,
        }
    }

    pub fn filesystem(&self) -> &FS {
        &self.filesystem
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    pub fn config(&self) -> &PathOpsConfig {
        &self.config
    }

    fn perform<F>(
        &self,
        operation: &'static str,
        description: String,
        dryrun: bool,
        effect: F,
    ) -> Result<()>
    where
        F: FnOnce(&FS) -> Result<()>,
    {
        let mut context = LogContext::new();
        context.insert("operation", operation.to_string());
        context.insert("dryrun", dryrun.to_string());

        // Success is logged only after the effect, so failures stay silent
        if dryrun {
            let message = format!("{}{}", DRY_RUN_PREFIX, description);
            self.logger.log(Level::Info, &message, &context);
            return Ok(());
        }

        effect(&self.filesystem)?;
        self.logger.log(Level::Info, &description, &context);
        Ok(())
    }

    pub fn mkdir<P: AsRef<Path>>(&self, paths: &[P], mode: u32, dryrun: bool) -> Result<()> {
        // Nothing to do, nothing to log
        if paths.is_empty() {
            return Ok(());
        }
        let description = format!(
            "The {} is created with mode {}",
            paths_string(paths),
            normalize_mode(mode)
        );

        self.perform("mkdir", description, dryrun, |fs| {
            for path in paths {
                fs.create_directory(path.as_ref(), mode)?;
            }
            Ok(())
        })
    }

    pub fn remove<P: AsRef<Path>>(&self, paths: &[P], dryrun: bool) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let description = format!("The {} deleted", paths_string(paths));

        self.perform("remove", description, dryrun, |fs| {
            for path in paths {
                fs.remove(path.as_ref())?;
            }
            Ok(())
        })
    }

    pub fn exists<P: AsRef<Path>>(&self, paths: &[P]) -> Result<bool> {
        for path in paths {
            if !self.filesystem.exists(path.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Creates the file if needed and sets its timestamps. `None` means now.
    pub fn touch(
        &self,
        path: &Path,
        modified: Option<SystemTime>,
        accessed: Option<SystemTime>,
        dryrun: bool,
    ) -> Result<()> {
        let modified = modified.unwrap_or_else(SystemTime::now);
        let accessed = accessed.unwrap_or_else(SystemTime::now);
        let description = format!(
            "Touched the file {} with modification time {} and access: {}",
            path.display(),
            unix_seconds(modified),
            unix_seconds(accessed)
        );

        self.perform("touch", description, dryrun, |fs| {
            fs.touch(path, modified, accessed)
        })
    }

    pub fn chown<P: AsRef<Path>>(
        &self,
        paths: &[P],
        owner: &str,
        group: Option<&str>,
        recursive: bool,
        dryrun: bool,
    ) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let group_part = group
            .map(|group| format!(" and group {}", group))
            .unwrap_or_default();
        let description = format!(
            "Changed the owner of {} to {}{} with recursive flag: {}",
            paths_string(paths),
            owner,
            group_part,
            recursive
        );

        self.perform("chown", description, dryrun, |fs| {
            // owners first, groups after
            for path in paths {
                fs.chown(path.as_ref(), owner, recursive)?;
            }
            if let Some(group) = group {
                for path in paths {
                    fs.chgrp(path.as_ref(), group, recursive)?;
                }
            }
            Ok(())
        })
    }

    pub fn chmod<P: AsRef<Path>>(
        &self,
        paths: &[P],
        mode: u32,
        umask: u32,
        recursive: bool,
        dryrun: bool,
    ) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let description = format!(
            "Changed the permission of {} to mode: {} and umask: {} with recursive flag: {}",
            paths_string(paths),
            normalize_mode(mode),
            normalize_mode(umask),
            recursive
        );

        self.perform("chmod", description, dryrun, |fs| {
            for path in paths {
                fs.chmod(path.as_ref(), mode, umask, recursive)?;
            }
            Ok(())
        })
    }

    /// Fails if `destination` exists and `override_existing` is false.
    pub fn rename(
        &self,
        source: &Path,
        destination: &Path,
        override_existing: bool,
        dryrun: bool,
    ) -> Result<()> {
        let description = format!(
            "{} is renamed to {} with override flag: {}",
            source.display(),
            destination.display(),
            override_existing
        );

        self.perform("rename", description, dryrun, |fs| {
            fs.rename(source, destination, override_existing)
        })
    }

    /// Same as [`PathOperations::rename`].
    pub fn move_path(
        &self,
        source: &Path,
        destination: &Path,
        override_existing: bool,
        dryrun: bool,
    ) -> Result<()> {
        self.rename(source, destination, override_existing, dryrun)
    }

    pub fn dump_file(&self, path: &Path, content: impl AsRef<[u8]>, dryrun: bool) -> Result<()> {
        let description = format!("Wrote the content to {}", path.display());

        self.perform("dump_file", description, dryrun, |fs| {
            fs.dump_file(path, content.as_ref())
        })
    }

    pub fn append_to_file(
        &self,
        path: &Path,
        content: impl AsRef<[u8]>,
        dryrun: bool,
    ) -> Result<()> {
        let description = format!("Appended the content to {}", path.display());

        self.perform("append_to_file", description, dryrun, |fs| {
            fs.append_to_file(path, content.as_ref())
        })
    }
}

impl<FS, L> std::fmt::Debug for PathOperations<FS, L>
where
    FS: FileSystem + std::fmt::Debug,
    L: Logger + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathOperations")
            .field("filesystem", &self.filesystem)
            .field("logger", &self.logger)
            .field("config", &self.config)
            .finish()
    }
}
