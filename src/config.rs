//! Centralized configuration and builder for the copier.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - CopyConfig::from_env() reads NEST_* variables; CLI flags override on top.
//! - CopyBuilder gives a fluent way to assemble a CopyConfig in code/tests.
//!
//! Defaults follow the plain replay policy:
//! - batch_entries = false (one write transaction per entry)
//! - fsync = true (every destination commit is durable)
//! - verify = false, progress = true

use std::fmt;

use crate::copy::replay::ReplayOptions;
use crate::store::StoreOptions;
use crate::util::env_flag;

#[derive(Clone, Debug)]
pub struct CopyConfig {
    /// fsync destination after every commit.
    /// Env: NEST_FSYNC (default true)
    pub fsync: bool,

    /// Insert all entries of a container in one write transaction.
    /// Env: NEST_BATCH_ENTRIES (default false)
    pub batch_entries: bool,

    /// Re-open the destination after replay and compare it with the snapshot.
    /// Env: NEST_VERIFY (default false)
    pub verify: bool,

    /// Print "Bucket path / Entries" lines while replaying.
    /// Env: NEST_PROGRESS (default true)
    pub progress: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            fsync: true,
            batch_entries: false,
            verify: false,
            progress: true,
        }
    }
}

impl CopyConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(on) = env_flag("NEST_FSYNC") {
            cfg.fsync = on;
        }
        if let Some(on) = env_flag("NEST_BATCH_ENTRIES") {
            cfg.batch_entries = on;
        }
        if let Some(on) = env_flag("NEST_VERIFY") {
            cfg.verify = on;
        }
        if let Some(on) = env_flag("NEST_PROGRESS") {
            cfg.progress = on;
        }
        cfg
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }

    pub fn with_batch_entries(mut self, on: bool) -> Self {
        self.batch_entries = on;
        self
    }

    pub fn with_verify(mut self, on: bool) -> Self {
        self.verify = on;
        self
    }

    pub fn with_progress(mut self, on: bool) -> Self {
        self.progress = on;
        self
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default().with_fsync(self.fsync)
    }

    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            batch_entries: self.batch_entries,
        }
    }
}

impl fmt::Display for CopyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CopyConfig {{ fsync: {}, batch_entries: {}, verify: {}, progress: {} }}",
            self.fsync, self.batch_entries, self.verify, self.progress
        )
    }
}

/// Lightweight builder that produces a CopyConfig.
#[derive(Clone, Debug)]
pub struct CopyBuilder {
    cfg: CopyConfig,
}

impl Default for CopyBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: CopyConfig::from_env(),
        }
    }
}

impl CopyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: CopyConfig::default(),
        }
    }

    pub fn fsync(mut self, on: bool) -> Self {
        self.cfg.fsync = on;
        self
    }

    pub fn batch_entries(mut self, on: bool) -> Self {
        self.cfg.batch_entries = on;
        self
    }

    pub fn verify(mut self, on: bool) -> Self {
        self.cfg.verify = on;
        self
    }

    pub fn progress(mut self, on: bool) -> Self {
        self.cfg.progress = on;
        self
    }

    pub fn build(self) -> CopyConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_from_default_ignores_env() {
        let cfg = CopyBuilder::from_default()
            .batch_entries(true)
            .verify(true)
            .fsync(false)
            .build();
        assert!(cfg.batch_entries);
        assert!(cfg.verify);
        assert!(!cfg.fsync);
        assert!(cfg.progress);
        assert!(!cfg.store_options().fsync);
        assert!(cfg.replay_options().batch_entries);
        assert!(cfg.to_string().contains("batch_entries: true"));
    }
}
