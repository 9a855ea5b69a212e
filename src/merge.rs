//! Field-by-field overlay of JSON configuration trees.
//!
//! The configuration file is an overlay, not a replacement: keys it specifies
//! win, keys it omits keep whatever the aggregate currently holds. That rule
//! applies at every nesting level, so a file carrying only
//! `{"LogConfig": {"level": "debug"}}` changes one field of the logging
//! section and nothing else.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base,
///   keys absent from overlay are preserved
/// - Arrays, strings, numbers and booleans are replaced entirely
/// - A null in overlay means "not specified" and preserves the base value
///
/// # Example
/// ```
/// use serde_json::json;
/// use hotconf::merge::deep_merge;
///
/// let current = json!({
///     "TCPPort": 8999,
///     "LogConfig": { "level": "info", "format": "console" }
/// });
/// let file = json!({
///     "TCPPort": 9100,
///     "LogConfig": { "level": "debug" }
/// });
/// let merged = deep_merge(current, file);
/// assert_eq!(merged["TCPPort"], 9100);
/// assert_eq!(merged["LogConfig"]["level"], "debug");
/// assert_eq!(merged["LogConfig"]["format"], "console");
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        // Overlay is null: preserve base
        (base, Value::Null) => base,
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}
