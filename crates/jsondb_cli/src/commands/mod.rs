//! CLI command implementations.

pub mod archive;
pub mod backup;
pub mod collections;
pub mod validate;

use jsondb_core::Timestamp;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Renders epoch milliseconds as RFC 3339 UTC, or the raw number if out of
/// range.
pub(crate) fn format_timestamp(ts: Timestamp) -> String {
    let nanos = i128::from(ts.as_millis()) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{} ms since epoch", ts))
}

/// Output format of listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Text,
    Json,
}

impl Format {
    pub(crate) fn parse(format: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown format: {other} (expected text or json)").into()),
        }
    }
}
