use std::path::Path;

use log::debug;

use super::PathOperations;
use crate::filesystem::{FileSystem, Result};
use crate::logger::Logger;

impl<FS: FileSystem, L: Logger> PathOperations<FS, L> {
    /// Copies a file or a directory tree. An existing destination directory
    /// makes the whole call a no-op; its children are never visited.
    pub fn copy(
        &self,
        source: &Path,
        destination: &Path,
        mode: u32,
        override_existing: bool,
        dryrun: bool,
    ) -> Result<()> {
        if !self.filesystem.is_directory(source) {
            let description = format!("Copied {} to {}", source.display(), destination.display());
            return self.perform("copy", description, dryrun, |fs| {
                fs.copy_file(source, destination, override_existing)
            });
        }

        if self.filesystem.exists(destination)? {
            debug!(
                "Destination {} already exists, not descending into {}",
                destination.display(),
                source.display()
            );
            return Ok(());
        }

        self.mkdir(&[destination], mode, dryrun)?;

        // Entries in listing order

        for name in self.filesystem.list_directory(source)? {
            let name = name?;
            self.copy(
                &source.join(&name),
                &destination.join(&name),
                mode,
                override_existing,
                dryrun,
            )?;
        }

        Ok(())
    }
}
