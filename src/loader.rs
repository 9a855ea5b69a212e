//! Locating, parsing, and overlaying the configuration file.
//!
//! Policy lives with the caller: the same [`overlay`] serves both the initial
//! load (where a parse error is fatal) and hot reloads (where it is logged and
//! the previous aggregate stands).

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::merge::deep_merge;
use crate::types::{DEFAULT_CONF_SUBPATH, ServerConfig};

/// Outcome of probing the configuration file path.
///
/// `AccessDenied` is anything that is not a clean "no such file": permission
/// problems, a path component that is not a directory, and so on. Both
/// non-`Exists` outcomes mean "skip the overlay", but callers logging
/// diagnostics need to tell them apart.
#[derive(Debug)]
pub enum FileStatus {
    Exists,
    NotFound,
    AccessDenied(io::Error),
}

/// Probe whether the configuration file exists. Pure query, no side effects.
pub fn probe(path: &Path) -> FileStatus {
    match std::fs::metadata(path) {
        Ok(_) => FileStatus::Exists,
        Err(e) if e.kind() == io::ErrorKind::NotFound => FileStatus::NotFound,
        Err(e) => FileStatus::AccessDenied(e),
    }
}

/// Resolve the default configuration file path: the process's working
/// directory joined with [`DEFAULT_CONF_SUBPATH`].
pub fn default_conf_path() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(DEFAULT_CONF_SUBPATH),
        Err(_) => PathBuf::from(DEFAULT_CONF_SUBPATH),
    }
}

/// Read the raw bytes of the configuration file, classifying failures.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        io::ErrorKind::PermissionDenied => ConfigError::AccessDenied {
            path: path.to_path_buf(),
            source,
        },
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Overlay file bytes onto the current aggregate, producing a new one.
///
/// The current aggregate is serialized to a JSON tree, the file is merged onto
/// it field-by-field at every nesting level, and the result is deserialized
/// back and validated. A type mismatch anywhere fails the whole merge; the
/// input aggregate is never touched.
pub fn overlay(current: &ServerConfig, bytes: &[u8], path: &Path) -> Result<ServerConfig> {
    let file_value: Value =
        serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if !file_value.is_object() {
        return Err(ConfigError::Invalid {
            reason: format!(
                "config file {} must contain a JSON object at the root",
                path.display()
            ),
        });
    }

    let base = serde_json::to_value(current).map_err(|source| ConfigError::Invalid {
        reason: format!("current configuration is not serializable: {source}"),
    })?;

    let merged = deep_merge(base, file_value);
    let next: ServerConfig =
        serde_json::from_value(merged).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    next.validate()?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn probe_distinguishes_missing_from_inaccessible() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("server.json");
        assert!(matches!(probe(&missing), FileStatus::NotFound));

        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(probe(&file), FileStatus::Exists));

        // A path routed through a regular file fails with something other
        // than "not found".
        let through_file = file.join("child.json");
        assert!(matches!(probe(&through_file), FileStatus::AccessDenied(_)));
    }

    #[test]
    fn read_file_maps_missing_to_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn overlay_applies_subset_and_keeps_rest() {
        let current = ServerConfig::default();
        let next = overlay(&current, br#"{"TCPPort": 9100}"#, Path::new("t.json")).unwrap();

        assert_eq!(next.tcp_port, 9100);

        // Every other field still equals its prior value.
        let mut expected = current.clone();
        expected.tcp_port = 9100;
        assert_eq!(next, expected);
    }

    #[test]
    fn overlay_of_nested_section_keeps_sibling_fields() {
        let mut current = ServerConfig::default();
        current.db_read.path = "10.0.0.5:3306".to_string();
        current.db_read.username = "reader".to_string();

        let next = overlay(
            &current,
            br#"{"LogConfig": {"level": "debug"}, "DbReadConfig": {"Password": "secret"}}"#,
            Path::new("t.json"),
        )
        .unwrap();

        assert_eq!(next.log.level, "debug");
        assert_eq!(next.log.format, "console");
        assert_eq!(next.log.link_name, "latest_log");
        assert_eq!(next.db_read.path, "10.0.0.5:3306");
        assert_eq!(next.db_read.username, "reader");
        assert_eq!(next.db_read.password, "secret");
    }

    #[test]
    fn overlay_ignores_unknown_keys() {
        let current = ServerConfig::default();
        let next = overlay(
            &current,
            br#"{"NotARealKey": true, "MaxConn": 500}"#,
            Path::new("t.json"),
        )
        .unwrap();
        assert_eq!(next.max_conn, 500);
    }

    #[test]
    fn overlay_rejects_malformed_json() {
        let current = ServerConfig::default();
        let err = overlay(&current, b"{not json", Path::new("t.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn overlay_rejects_non_object_root() {
        let current = ServerConfig::default();
        let err = overlay(&current, b"[1, 2, 3]", Path::new("t.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn type_mismatch_rejects_the_whole_file() {
        let current = ServerConfig::default();
        // MaxConn is valid on its own; the bad TCPPort must sink both.
        let err = overlay(
            &current,
            br#"{"MaxConn": 500, "TCPPort": "ninety-one-hundred"}"#,
            Path::new("t.json"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn overlay_rejects_invariant_violations() {
        let current = ServerConfig::default();
        let err = overlay(&current, br#"{"Host": ""}"#, Path::new("t.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn reapplying_the_same_file_is_idempotent() {
        let current = ServerConfig::default();
        let bytes: &[u8] = br#"{"TCPPort": 9100, "LogConfig": {"level": "debug"}}"#;
        let once = overlay(&current, bytes, Path::new("t.json")).unwrap();
        let twice = overlay(&once, bytes, Path::new("t.json")).unwrap();
        assert_eq!(once, twice);
    }
}
