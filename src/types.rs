//! Configuration types and structures.
//!
//! [`ServerConfig`] is the single aggregate shared with every collaborator.
//! JSON wire keys keep the names existing deployment files already use
//! (`TCPPort`, `MaxConn`, `LogConfig`, ...), so field renames here never break
//! a config file in the field.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default listen port for the server.
pub const DEFAULT_TCP_PORT: u16 = 8999;

/// Relative path of the configuration file, joined onto the process's
/// working directory unless an explicit path is supplied.
pub const DEFAULT_CONF_SUBPATH: &str = "conf/server.json";

/// The root configuration aggregate.
///
/// Every field carries a serde default, so a configuration file may specify
/// any subset of keys; unspecified keys keep their current values when the
/// file is overlaid (defaults on first load, previously-applied values on
/// reload). Unknown keys in the file are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server application name.
    #[serde(rename = "Name", default = "default_name")]
    pub name: String,

    /// Server version string.
    #[serde(rename = "Version", default = "default_version")]
    pub version: String,

    /// Environment tag: "develop" or "production".
    #[serde(rename = "Env", default = "default_env")]
    pub env: String,

    /// Bind host.
    #[serde(rename = "Host", default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(rename = "TCPPort", default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Largest packet the server will read, in bytes.
    #[serde(rename = "MaxPacketSize", default = "default_max_packet_size")]
    pub max_packet_size: u32,

    /// Maximum concurrent connections.
    #[serde(rename = "MaxConn", default = "default_max_conn")]
    pub max_conn: u32,

    /// Size of the business-logic worker pool.
    #[serde(rename = "WorkerPoolSize", default = "default_worker_pool_size")]
    pub worker_pool_size: u32,

    /// Maximum queued tasks per worker.
    #[serde(rename = "MaxWorkerTaskLen", default = "default_max_worker_task_len")]
    pub max_worker_task_len: u32,

    /// Maximum buffered outbound messages per connection.
    #[serde(rename = "MaxMsgChanLen", default = "default_max_msg_chan_len")]
    pub max_msg_chan_len: u32,

    /// Heartbeat interval in seconds; 0 disables heartbeats.
    #[serde(rename = "HeartbeatTime", default = "default_sixty")]
    pub heartbeat_secs: u64,

    /// Connection read timeout in seconds; 0 means never time out.
    #[serde(rename = "ConnReadTimeout", default = "default_sixty")]
    pub conn_read_timeout_secs: u64,

    /// Connection write timeout in seconds; 0 means never time out.
    #[serde(rename = "ConnWriteTimeout", default = "default_sixty")]
    pub conn_write_timeout_secs: u64,

    /// Logging section, consumed by the logging collaborator.
    #[serde(rename = "LogConfig", default)]
    pub log: LogConfig,

    /// Read-endpoint database connection.
    #[serde(rename = "DbReadConfig", default)]
    pub db_read: DbConfig,

    /// Write-endpoint database connection.
    #[serde(rename = "DbWriteConfig", default)]
    pub db_write: DbConfig,

    /// Cache connection.
    #[serde(rename = "CacheConfig", default)]
    pub cache: CacheConfig,

    /// Resolved path of the configuration file being watched.
    #[serde(rename = "ConfFilePath", default = "default_conf_file_path")]
    pub conf_file_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            env: default_env(),
            host: default_host(),
            tcp_port: default_tcp_port(),
            max_packet_size: default_max_packet_size(),
            max_conn: default_max_conn(),
            worker_pool_size: default_worker_pool_size(),
            max_worker_task_len: default_max_worker_task_len(),
            max_msg_chan_len: default_max_msg_chan_len(),
            heartbeat_secs: default_sixty(),
            conn_read_timeout_secs: default_sixty(),
            conn_write_timeout_secs: default_sixty(),
            log: LogConfig::default(),
            db_read: DbConfig::default(),
            db_write: DbConfig::default(),
            cache: CacheConfig::default(),
            conf_file_path: default_conf_file_path(),
        }
    }
}

fn default_name() -> String {
    "SocketServerApp".to_string()
}

fn default_version() -> String {
    "v0.1.0".to_string()
}

fn default_env() -> String {
    "production".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_max_packet_size() -> u32 {
    4096
}

fn default_max_conn() -> u32 {
    12_000
}

fn default_worker_pool_size() -> u32 {
    10
}

fn default_max_worker_task_len() -> u32 {
    1024
}

fn default_max_msg_chan_len() -> u32 {
    1024
}

fn default_sixty() -> u64 {
    60
}

fn default_conf_file_path() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(DEFAULT_CONF_SUBPATH),
        Err(_) => PathBuf::from(DEFAULT_CONF_SUBPATH),
    }
}

impl ServerConfig {
    /// Heartbeat interval, or `None` when heartbeats are disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        nonzero_secs(self.heartbeat_secs)
    }

    /// Connection read timeout, or `None` for "never times out".
    pub fn read_timeout(&self) -> Option<Duration> {
        nonzero_secs(self.conn_read_timeout_secs)
    }

    /// Connection write timeout, or `None` for "never times out".
    pub fn write_timeout(&self) -> Option<Duration> {
        nonzero_secs(self.conn_write_timeout_secs)
    }

    /// Check aggregate invariants.
    ///
    /// A configuration that fails validation is rejected as a whole; the
    /// merge that produced it is never published.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(invalid("Name must not be empty"));
        }
        if self.version.is_empty() {
            return Err(invalid("Version must not be empty"));
        }
        if self.host.is_empty() {
            return Err(invalid("Host must not be empty"));
        }
        if self.env != "develop" && self.env != "production" {
            return Err(ConfigError::Invalid {
                reason: format!("Env must be \"develop\" or \"production\", got {:?}", self.env),
            });
        }
        Ok(())
    }
}

fn nonzero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_string(),
    }
}

/// Logging section.
///
/// Wire keys are kebab-case (`link-name`, `stacktrace-key`, ...), matching
/// the layout the logging collaborator has always consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format, e.g. "console" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Prefix prepended to every log line.
    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    /// Directory log files are written to.
    #[serde(default = "default_log_director")]
    pub director: String,

    /// Name of the rotation symlink pointing at the newest log file.
    #[serde(default = "default_log_link_name")]
    pub link_name: String,

    /// Include source file and line in log output.
    #[serde(default = "default_true")]
    pub show_line: bool,

    /// Level encoder name.
    #[serde(default = "default_encode_level")]
    pub encode_level: String,

    /// Key under which stack traces are recorded.
    #[serde(default = "default_stacktrace_key")]
    pub stacktrace_key: String,

    /// Mirror log output to the console.
    #[serde(default = "default_true")]
    pub log_in_console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            prefix: default_log_prefix(),
            director: default_log_director(),
            link_name: default_log_link_name(),
            show_line: default_true(),
            encode_level: default_encode_level(),
            stacktrace_key: default_stacktrace_key(),
            log_in_console: default_true(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

fn default_log_prefix() -> String {
    "[hotconf]".to_string()
}

fn default_log_director() -> String {
    "log".to_string()
}

fn default_log_link_name() -> String {
    "latest_log".to_string()
}

fn default_encode_level() -> String {
    "LowercaseColorLevelEncoder".to_string()
}

fn default_stacktrace_key() -> String {
    "stacktrace".to_string()
}

fn default_true() -> bool {
    true
}

/// One database connection descriptor. The aggregate carries two of these,
/// one for the read endpoint and one for the write endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbConfig {
    /// Server address as host:port.
    pub path: String,
    /// Advanced driver options appended to the DSN.
    pub config: String,
    /// Database name.
    pub dbname: String,
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
    /// Maximum idle connections in the pool.
    pub max_idle_conns: u32,
    /// Maximum open connections in the pool.
    pub max_open_conns: u32,
    /// Driver log mode.
    pub log_mode: String,
}

/// Cache connection descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CacheConfig {
    /// Logical database index.
    #[serde(rename = "DB")]
    pub db: u32,
    /// Server address as host:port.
    pub addr: String,
    /// Password.
    pub password: String,
}
