use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use path_ops::format::paths_string;
use path_ops::{FacadeLogger, PathOperations, RealFileSystem};

#[derive(Parser, Debug)]
#[command(name = "path-ops")]
#[command(about = "Filesystem operations with dry-run support", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log what would be done without changing anything
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create directories, including missing parents
    Mkdir {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory mode in octal (defaults to 777)
        #[arg(short, long, value_parser = parse_octal)]
        mode: Option<u32>,
    },

    /// Remove files or directory trees
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check that every path exists
    Exists {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy a file or a directory tree
    Copy {
        source: PathBuf,
        destination: PathBuf,

        /// Mode in octal for created directories (defaults to 777)
        #[arg(short, long, value_parser = parse_octal)]
        mode: Option<u32>,

        /// Replace existing destination files
        #[arg(short, long = "override")]
        override_existing: bool,
    },

    /// Create a file or update its timestamps
    Touch {
        path: PathBuf,

        /// Modification time, as Unix seconds or RFC 3339 (defaults to now)
        #[arg(long, value_parser = parse_time)]
        modified: Option<SystemTime>,

        /// Access time, as Unix seconds or RFC 3339 (defaults to now)
        #[arg(long, value_parser = parse_time)]
        access: Option<SystemTime>,
    },

    /// Change owner and optionally group
    Chown {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// User name or uid
        #[arg(short, long)]
        owner: String,

        /// Group name or gid
        #[arg(short, long)]
        group: Option<String>,

        #[arg(short = 'R', long)]
        recursive: bool,
    },

    /// Change permission bits
    Chmod {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Mode in octal
        #[arg(short, long, value_parser = parse_octal)]
        mode: u32,

        /// Bits in octal to clear from the mode (defaults to 0)
        #[arg(short, long, value_parser = parse_octal)]
        umask: Option<u32>,

        #[arg(short = 'R', long)]
        recursive: bool,
    },

    /// Rename or move a path
    #[command(alias = "move")]
    Rename {
        source: PathBuf,
        destination: PathBuf,

        /// Replace an existing destination
        #[arg(short, long = "override")]
        override_existing: bool,
    },

    /// Replace the content of a file
    Dump { path: PathBuf, content: String },

    /// Append to a file, creating it if needed
    Append { path: PathBuf, content: String },
}

fn parse_octal(value: &str) -> std::result::Result<u32, String> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal value '{}': {}", value, e))
}

fn parse_time(value: &str) -> std::result::Result<SystemTime, String> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(UNIX_EPOCH + Duration::from_secs(seconds));
    }
    DateTime::parse_from_rfc3339(value)
        .map(SystemTime::from)
        .map_err(|e| format!("invalid time '{}': {}", value, e))
}

fn run(command: Commands, dry_run: bool) -> Result<()> {
    let ops = PathOperations::new(RealFileSystem::new(), FacadeLogger::new());
    let defaults = *ops.config();

    match command {
        Commands::Mkdir { paths, mode } => {
            let mode = mode.unwrap_or(defaults.default_mode);
            ops.mkdir(&paths, mode, dry_run)
                .with_context(|| format!("Failed to create {}", paths_string(&paths)))?;
        }
        Commands::Remove { paths } => {
            ops.remove(&paths, dry_run)
                .with_context(|| format!("Failed to remove {}", paths_string(&paths)))?;
        }
        Commands::Exists { paths } => {
            let all_exist = ops
                .exists(&paths)
                .with_context(|| format!("Failed to check {}", paths_string(&paths)))?;
            println!("{}", all_exist);
            if !all_exist {
                std::process::exit(1);
            }
        }
        Commands::Copy {
            source,
            destination,
            mode,
            override_existing,
        } => {
            let mode = mode.unwrap_or(defaults.default_mode);
            ops.copy(&source, &destination, mode, override_existing, dry_run)
                .with_context(|| {
                    format!("Failed to copy {} to {}", source.display(), destination.display())
                })?;
        }
        Commands::Touch {
            path,
            modified,
            access,
        } => {
            ops.touch(&path, modified, access, dry_run)
                .with_context(|| format!("Failed to touch {}", path.display()))?;
        }
        Commands::Chown {
            paths,
            owner,
            group,
            recursive,
        } => {
            ops.chown(&paths, &owner, group.as_deref(), recursive, dry_run)
                .with_context(|| format!("Failed to change owner of {}", paths_string(&paths)))?;
        }
        Commands::Chmod {
            paths,
            mode,
            umask,
            recursive,
        } => {
            let umask = umask.unwrap_or(defaults.default_umask);
            ops.chmod(&paths, mode, umask, recursive, dry_run)
                .with_context(|| {
                    format!("Failed to change permissions of {}", paths_string(&paths))
                })?;
        }
        Commands::Rename {
            source,
            destination,
            override_existing,
        } => {
            ops.rename(&source, &destination, override_existing, dry_run)
                .with_context(|| {
                    format!("Failed to rename {} to {}", source.display(), destination.display())
                })?;
        }
        Commands::Dump { path, content } => {
            ops.dump_file(&path, content, dry_run)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Commands::Append { path, content } => {
            ops.append_to_file(&path, content, dry_run)
                .with_context(|| format!("Failed to append to {}", path.display()))?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Dry-run output is only useful if the info lines are shown
    let log_level = if cli.verbose || cli.dry_run {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .target(env_logger::Target::Stderr)
        .init();

    run(cli.command, cli.dry_run)
}
