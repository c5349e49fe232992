/// Mode used for directories when the caller has no preference.
pub const DEFAULT_MODE: u32 = 0o777;

/// Umask applied by `chmod` when the caller has no preference.
pub const DEFAULT_UMASK: u32 = 0o000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOpsConfig {
    pub default_mode: u32,
    pub default_umask: u32,
}

impl Default for PathOpsConfig {
    fn default() -> Self {
        Self {
            default_mode: DEFAULT_MODE,
            default_umask: DEFAULT_UMASK,
        }
    }
}
