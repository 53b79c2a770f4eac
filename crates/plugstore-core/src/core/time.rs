// crates/plugstore-core/src/core/time.rs
// ============================================================================
// Module: Plugstore Timestamps
// Description: Wall-clock timestamps for system row fields.
// Purpose: Produce sortable RFC 3339 strings for created_at/updated_at.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Row timestamps are RFC 3339 UTC strings with a fixed three-digit
//! millisecond fraction, so lexical order matches chronological order inside
//! the store.

use time::OffsetDateTime;

/// Returns the current UTC time as a fixed-width RFC 3339 string.
#[must_use]
pub fn now_rfc3339() -> String {
    format_rfc3339_millis(OffsetDateTime::now_utc())
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC.
#[must_use]
pub fn format_rfc3339_millis(value: OffsetDateTime) -> String {
    let utc = value.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second(),
        utc.millisecond()
    )
}
