//! Batch rewrite of stored objects from older key layouts to a target layout.
//!
//! ## What this does
//! - Lists every key under a prefix (draining pagination).
//! - Decodes each key; unknown shapes and keys already in the target layout
//!   are skipped.
//! - Converts the rest with [`keys::convert_parsed`], copies old → new, and
//!   optionally deletes the source.
//!
//! ## Failure model
//! Only the listing can abort a run. Per-key conversion or copy failures are
//! counted in [`MigrationStats::failed`] and the run continues. A failed
//! source delete is a warning: the object was still migrated.
//!
//! ## Dry-run
//! With [`MigrateOptions::dry_run`] the decode/convert step runs as usual and
//! produces the same counts and pairs, but nothing is copied or deleted.
//!
//! Existing destination objects are overwritten.

mod stats;

use std::sync::Arc;

use shared_utils::event_log::EventLog;
use thiserror::Error;

use crate::{
    blob::BlobStore,
    error::StoreError,
    keys::{self, ConvertOptions, DataKind, Environment, KeyVersion, ParsedKey},
};

pub use stats::MigrationStats;

/// Options for a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Only keys starting with this prefix are considered.
    pub prefix: String,
    /// Layout to rewrite keys into.
    pub target_version: KeyVersion,
    /// Data kind for `v2` destinations.
    pub data_kind: DataKind,
    /// Environment for `v2` destinations; see [`ConvertOptions::environment`].
    pub environment: Option<Environment>,
    /// Prefix for `v1` destinations.
    pub v1_prefix: String,
    /// Delete each source object after a successful copy.
    pub delete_source: bool,
    /// Log what would happen without writing.
    pub dry_run: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        let convert = ConvertOptions::default();
        Self {
            prefix: String::new(),
            target_version: keys::CURRENT_VERSION,
            data_kind: convert.data_kind,
            environment: convert.environment,
            v1_prefix: convert.v1_prefix,
            delete_source: false,
            dry_run: false,
        }
    }
}

impl MigrateOptions {
    fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            data_kind: self.data_kind,
            environment: self.environment,
            v1_prefix: self.v1_prefix.clone(),
        }
    }
}

/// A migration that could not run at all.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Listing the source prefix failed.
    #[error("failed to list objects under {prefix:?}: {source}")]
    List {
        /// Prefix being listed.
        prefix: String,
        /// Store failure.
        source: StoreError,
    },
}

enum Outcome {
    Migrated(String),
    Skipped,
    Failed,
}

/// Rewrites keys in a [`BlobStore`] from one layout to another.
pub struct MigrationRunner {
    store: Arc<dyn BlobStore>,
    log: Arc<dyn EventLog>,
}

impl MigrationRunner {
    /// Runner over `store`, reporting through `log`.
    pub fn new(store: Arc<dyn BlobStore>, log: Arc<dyn EventLog>) -> Self {
        Self { store, log }
    }

    /// Migrate every key under `opts.prefix`.
    pub async fn migrate(&self, opts: &MigrateOptions) -> Result<MigrationStats, MigrationError> {
        let keys = self
            .store
            .list(&opts.prefix)
            .await
            .map_err(|source| MigrationError::List {
                prefix: opts.prefix.clone(),
                source,
            })?;

        self.log.info(&format!(
            "migrating {} objects under {:?} to {}{}",
            keys.len(),
            opts.prefix,
            opts.target_version,
            if opts.dry_run { " (dry run)" } else { "" }
        ));

        let convert_opts = opts.convert_options();
        let mut stats = MigrationStats {
            total: keys.len(),
            ..Default::default()
        };

        for key in &keys {
            match self.migrate_one(key, opts, &convert_opts).await {
                Outcome::Migrated(destination) => stats.record_migrated(key, destination),
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Failed => stats.failed += 1,
            }
        }

        self.log.info(&format!("migration finished: {stats}"));
        Ok(stats)
    }

    async fn migrate_one(
        &self,
        key: &str,
        opts: &MigrateOptions,
        convert_opts: &ConvertOptions,
    ) -> Outcome {
        let parsed = keys::decode(key);
        if let ParsedKey::Unknown { .. } = parsed {
            self.log.warn(&format!("unknown key format, skipping: {key}"));
            return Outcome::Skipped;
        }
        if parsed.version() == opts.target_version {
            self.log
                .info(&format!("already in {} format: {key}", opts.target_version));
            return Outcome::Skipped;
        }

        let destination = match keys::convert_parsed(&parsed, opts.target_version, convert_opts) {
            Ok(conversion) => conversion.into_key(),
            Err(err) => {
                self.log.error(&format!("cannot convert {key}: {err}"));
                return Outcome::Failed;
            }
        };

        if opts.dry_run {
            self.log
                .info(&format!("[dry run] would copy {key} to {destination}"));
            if opts.delete_source {
                self.log.info(&format!("[dry run] would delete {key}"));
            }
            return Outcome::Migrated(destination);
        }

        if let Err(err) = self.store.copy(key, &destination).await {
            self.log
                .error(&format!("failed to copy {key} to {destination}: {err}"));
            return Outcome::Failed;
        }
        self.log.info(&format!("copied {key} to {destination}"));

        if opts.delete_source {
            match self.store.delete(key).await {
                Ok(()) => self.log.info(&format!("deleted {key}")),
                Err(err) => self
                    .log
                    .warn(&format!("migrated {key} but failed to delete it: {err}")),
            }
        }

        Outcome::Migrated(destination)
    }
}
