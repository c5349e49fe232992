use std::collections::BTreeMap;

use log::Level;

pub type LogContext = BTreeMap<&'static str, String>;

/// The logging collaborator injected into `PathOperations`.
pub trait Logger {
    fn log(&self, level: Level, message: &str, context: &LogContext);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _message: &str, _context: &LogContext) {}
}

/// Forwards messages to the `log` facade under a fixed target.
#[derive(Debug, Clone)]
pub struct FacadeLogger {
    target: String,
}

impl FacadeLogger {
    pub const DEFAULT_TARGET: &'static str = "path_ops";

    pub fn new() -> Self {
        Self::with_target(Self::DEFAULT_TARGET)
    }

    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for FacadeLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for FacadeLogger {
    fn log(&self, level: Level, message: &str, context: &LogContext) {
        let target: &str = &self.target;
        if context.is_empty() {
            log::log!(target: target, level, "{}", message);
        } else {
            log::log!(target: target, level, "{} [{}]", message, render_context(context));
        }
    }
}

pub fn render_context(context: &LogContext) -> String {
    context
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}
