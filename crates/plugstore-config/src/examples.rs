// crates/plugstore-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `plugstore config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example lists every section with its default values, so it doubles as
//! reference documentation. It must always load and validate cleanly.

/// Returns a canonical example `plugstore.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[bus]
namespace = "db"
channel_capacity = 1024

[store]
path = "data/plugstore.db"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[search]
max_rows = 1000

[gateway]
enabled = false
bind = "127.0.0.1:8470"
max_body_bytes = 1048576
request_timeout_ms = 2000

[logging]
level = "info"
format = "pretty"
"#,
    )
}
