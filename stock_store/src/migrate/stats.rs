use std::fmt;

use serde::Serialize;

/// Counters and the old → new key pairs of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    /// Keys listed under the prefix.
    pub total: usize,
    /// Keys copied (or, in a dry run, that would have been).
    pub migrated: usize,
    /// Keys whose conversion or copy failed.
    pub failed: usize,
    /// Unknown keys and keys already in the target layout.
    pub skipped: usize,
    /// `(source, destination)` for every migrated key, in listing order.
    pub pairs: Vec<(String, String)>,
}

impl MigrationStats {
    /// True when at least one key failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub(super) fn record_migrated(&mut self, source: &str, destination: String) {
        self.migrated += 1;
        self.pairs.push((source.to_string(), destination));
    }
}

impl fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} migrated={} failed={} skipped={}",
            self.total, self.migrated, self.failed, self.skipped
        )
    }
}
