//! The configuration store shared with every collaborator.
//!
//! One writer (the initial load, then each hot reload in arrival order),
//! arbitrarily many readers. Publication is an atomic pointer swap of an
//! immutable snapshot: a reader either sees the whole previous aggregate or
//! the whole next one, never a mixture.

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ConfigError, Result};
use crate::loader::{self, FileStatus};
use crate::types::{CacheConfig, DbConfig, LogConfig, ServerConfig};
use crate::watcher;

/// Holds the current [`ServerConfig`] snapshot for the process lifetime.
///
/// Construct one per process (or per test) and hand references to the
/// collaborators that need it; there is no global instance.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<ServerConfig>,
    path: PathBuf,
}

impl ConfigStore {
    /// Build defaults, then perform the blocking initial load from `path`.
    ///
    /// A missing or inaccessible file is logged and the defaults stand. A file
    /// that exists but fails to parse or validate is fatal: the process was
    /// explicitly pointed at it and must not serve traffic on unknown state.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut defaults = ServerConfig::default();
        defaults.conf_file_path = path.clone();

        let initial = match loader::probe(&path) {
            FileStatus::Exists => {
                let bytes = loader::read_file(&path)?;
                let merged = loader::overlay(&defaults, &bytes, &path)?;
                info!("configuration loaded from {}", path.display());
                merged
            }
            FileStatus::NotFound => {
                warn!(
                    "config file {} does not exist, using built-in defaults",
                    path.display()
                );
                defaults
            }
            FileStatus::AccessDenied(e) => {
                warn!(
                    "config file {} is not accessible ({e}), using built-in defaults",
                    path.display()
                );
                defaults
            }
        };

        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            path,
        })
    }

    /// [`load`](Self::load) from the default location, the working directory
    /// joined with `conf/server.json`.
    pub fn load_default() -> Result<Self> {
        Self::load(loader::default_conf_path())
    }

    /// The current snapshot. Lock-free; never blocks on a reload.
    pub fn current(&self) -> Arc<ServerConfig> {
        self.current.load_full()
    }

    /// Path of the configuration file this store reads and watches.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logging section, for the logging collaborator.
    pub fn log(&self) -> LogConfig {
        self.current.load().log.clone()
    }

    /// Read-endpoint database section, for datastore clients.
    pub fn db_read(&self) -> DbConfig {
        self.current.load().db_read.clone()
    }

    /// Write-endpoint database section, for datastore clients.
    pub fn db_write(&self) -> DbConfig {
        self.current.load().db_write.clone()
    }

    /// Cache section, for the cache client.
    pub fn cache(&self) -> CacheConfig {
        self.current.load().cache.clone()
    }

    /// Re-read the file and overlay it onto the current snapshot.
    ///
    /// The new aggregate is built completely off to the side and published
    /// with one atomic swap. On any failure the published snapshot is left
    /// untouched, down to the pointer.
    pub fn reload(&self) -> Result<()> {
        let prev = self.current.load_full();
        let bytes = loader::read_file(&self.path)?;
        let next = loader::overlay(&prev, &bytes, &self.path)?;
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// [`reload`](Self::reload) under the hot-reload failure policy: any
    /// failure is logged once and swallowed, and the previous snapshot keeps
    /// serving. An unavailable file is a warning; everything else an error.
    ///
    /// This is what the watch loop runs per notification; it is public for
    /// callers driving reloads from their own loop or signal handler.
    pub fn reload_with_recovery(&self) {
        match self.reload() {
            Ok(()) => info!("configuration reloaded"),
            Err(e @ (ConfigError::NotFound { .. } | ConfigError::AccessDenied { .. })) => {
                warn!("config file unavailable, keeping current configuration: {e}");
            }
            Err(e) => {
                error!("config reload failed, keeping current configuration: {e}");
            }
        }
    }

    /// Subscribe to file changes and drive
    /// [`reload_with_recovery`](Self::reload_with_recovery) from a background
    /// task, one attempt per notification.
    ///
    /// Establishing the subscription is the only fatal step. Once watching,
    /// reload failures are logged and watching continues; a later correction
    /// to the file is picked up normally.
    pub fn spawn_watch(self: &Arc<Self>) -> Result<ReloadTask> {
        let mut handle = watcher::watch_file(&self.path)?;
        let store = Arc::clone(self);

        let task = tokio::spawn(async move {
            while let Some(event) = handle.wait_for_change().await {
                info!("config file changed: {}", event.path.display());
                store.reload_with_recovery();
            }
            info!("config watcher stopped");
        });

        Ok(ReloadTask { task })
    }
}

/// Handle to the background reload loop started by
/// [`ConfigStore::spawn_watch`].
///
/// [`shutdown`](Self::shutdown) releases the filesystem subscription. The
/// loop only yields between reload attempts, so an attempt already under way
/// completes or fails normally rather than being torn mid-merge.
pub struct ReloadTask {
    task: tokio::task::JoinHandle<()>,
}

impl ReloadTask {
    /// Stop watching and release the underlying filesystem subscription.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_conf(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("server.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.json");

        let store = ConfigStore::load(&path).unwrap();
        let config = store.current();

        let mut expected = ServerConfig::default();
        expected.conf_file_path = path;
        assert_eq!(*config, expected);
    }

    #[test]
    fn load_overlays_file_onto_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"TCPPort": 9100, "Name": "edge-gateway"}"#);

        let store = ConfigStore::load(&path).unwrap();
        let config = store.current();

        assert_eq!(config.tcp_port, 9100);
        assert_eq!(config.name, "edge-gateway");
        // Untouched fields keep their defaults.
        assert_eq!(config.max_conn, 12_000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn initial_parse_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, "{broken");

        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn initial_validation_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"Env": "staging"}"#);

        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn reload_applies_new_file_content() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"TCPPort": 9100}"#);

        let store = ConfigStore::load(&path).unwrap();
        std::fs::write(&path, r#"{"TCPPort": 9200, "MaxConn": 64}"#).unwrap();
        store.reload().unwrap();

        let config = store.current();
        assert_eq!(config.tcp_port, 9200);
        assert_eq!(config.max_conn, 64);
    }

    #[test]
    fn failed_reload_keeps_the_exact_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"TCPPort": 9100}"#);

        let store = ConfigStore::load(&path).unwrap();
        let before = store.current();

        std::fs::write(&path, "{]").unwrap();
        assert!(store.reload().is_err());

        // Not merely equal: the very same snapshot is still published.
        assert!(Arc::ptr_eq(&before, &store.current()));
    }

    #[test]
    fn type_mismatch_during_reload_applies_nothing() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"TCPPort": 9100}"#);

        let store = ConfigStore::load(&path).unwrap();
        std::fs::write(&path, r#"{"MaxConn": 64, "TCPPort": "oops"}"#).unwrap();
        assert!(store.reload().is_err());

        let config = store.current();
        assert_eq!(config.tcp_port, 9100);
        assert_eq!(config.max_conn, 12_000);
    }

    #[test]
    fn successive_reloads_apply_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, r#"{"TCPPort": 9100}"#);

        let store = ConfigStore::load(&path).unwrap();
        let after_first = store.current();

        std::fs::write(&path, r#"{"TCPPort": 9200}"#).unwrap();
        store.reload().unwrap();
        std::fs::write(&path, r#"{"TCPPort": 9100}"#).unwrap();
        store.reload().unwrap();

        // The second reload reverted the only changed field.
        assert_eq!(*store.current(), *after_first);
    }

    #[test]
    fn section_reads_reflect_current_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(
            &dir,
            r#"{
                "LogConfig": {"level": "debug"},
                "DbWriteConfig": {"Path": "10.0.0.9:3306", "Username": "writer"},
                "CacheConfig": {"DB": 3, "Addr": "10.0.0.10:6379"}
            }"#,
        );

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.log().level, "debug");
        assert_eq!(store.log().format, "console");
        assert_eq!(store.db_write().path, "10.0.0.9:3306");
        assert_eq!(store.db_write().username, "writer");
        assert_eq!(store.db_read(), DbConfig::default());
        assert_eq!(store.cache().db, 3);
        assert_eq!(store.cache().addr, "10.0.0.10:6379");
    }
}
