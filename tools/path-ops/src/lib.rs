pub mod config;
pub mod filesystem;
pub mod format;
pub mod logger;
pub mod operations;

pub mod mock;

pub use config::{PathOpsConfig, DEFAULT_MODE, DEFAULT_UMASK};
pub use filesystem::{DirEntries, FileSystem, FileSystemError, RealFileSystem, Result};
pub use logger::{FacadeLogger, LogContext, Logger, NoopLogger};
pub use operations::{PathOperations, DRY_RUN_PREFIX};
