//! JSON wire format for the persisted tables.
//!
//! Both tables are bare JSON arrays of camelCase records
//! (`scheduled_sessions.json`, `memory_stability.json`). Import is lenient:
//! a record that fails to parse is dropped with a warning so one bad entry
//! does not lose the rest of the table.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::session::ScheduledSession;
use crate::stability::StabilityRecord;

pub const SESSIONS_FILE: &str = "scheduled_sessions.json";
pub const STABILITY_FILE: &str = "memory_stability.json";

/// Serialize records as a pretty-printed JSON array.
pub fn export_json<T: Serialize>(records: &[T]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Parse a JSON array, failing on the first malformed record.
pub fn import_json<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Parse a JSON array, skipping records that do not match `T`.
///
/// Fails only when the document itself is not an array.
pub fn import_json_lenient<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value(v) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!("dropping malformed record #{i}: {e}");
                None
            }
        })
        .collect();
    if records.len() != total {
        tracing::warn!("loaded {} of {total} records", records.len());
    }
    Ok(records)
}

pub fn export_sessions(sessions: &[ScheduledSession]) -> Result<String, serde_json::Error> {
    export_json(sessions)
}

pub fn import_sessions(json: &str) -> Result<Vec<ScheduledSession>, serde_json::Error> {
    import_json_lenient(json)
}

pub fn export_stability(records: &[StabilityRecord]) -> Result<String, serde_json::Error> {
    export_json(records)
}

pub fn import_stability(json: &str) -> Result<Vec<StabilityRecord>, serde_json::Error> {
    import_json_lenient(json)
}
