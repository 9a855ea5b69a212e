//! Hot-reloadable runtime configuration for long-running network servers.
//!
//! The crate holds one [`ServerConfig`] aggregate per process: built from
//! hardcoded defaults, overlaid with a JSON configuration file when one is
//! present, and kept current by re-applying the file whenever it changes on
//! disk. Readers always see a complete snapshot; a malformed edit to the file
//! never disturbs the configuration already being served.

pub mod error;
pub mod loader;
pub mod merge;
pub mod store;
pub mod types;
pub mod watcher;

pub use error::ConfigError;
pub use store::ConfigStore;
pub use types::ServerConfig;
