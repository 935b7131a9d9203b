//! Injected logging capability.
//!
//! Components receive an `Arc<dyn EventLog>` at construction time instead of
//! reaching for a process-wide logger. Production code hands out a
//! [`TracingLog`]; tests hand out a [`MemoryLog`] and assert on what was
//! recorded.

use std::sync::{Arc, Mutex};

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A sink for operational log lines.
pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards events to `tracing`, tagged with the owning component.
#[derive(Debug, Clone)]
pub struct TracingLog {
    component: String,
}

impl TracingLog {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Convenience constructor returning the shared trait object.
    pub fn shared(component: impl Into<String>) -> Arc<dyn EventLog> {
        Arc::new(Self::new(component))
    }
}

impl EventLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{message}");
    }
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.lock().clone()
    }

    /// Messages recorded at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// True if any message at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    fn record(&self, level: LogLevel, message: &str) {
        self.lock().push((level, message.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(LogLevel, String)>> {
        // a panic while holding the lock only ever happens inside a failing test
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl EventLog for MemoryLog {
    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_keeps_order_and_levels() {
        let log = MemoryLog::new();
        log.info("starting");
        log.warn("slow response");
        log.error("gave up");

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.messages(LogLevel::Warn), vec!["slow response".to_string()]);
        assert!(log.contains(LogLevel::Error, "gave"));
        assert!(!log.contains(LogLevel::Info, "gave"));
    }

    #[test]
    fn tracing_log_is_usable_as_trait_object() {
        let log: Arc<dyn EventLog> = TracingLog::shared("test");
        log.info("no subscriber installed, still fine");
    }
}
