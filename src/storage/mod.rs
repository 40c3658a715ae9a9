//! Storage abstractions for seen-set persistence.
//!
//! The seen set is a single JSON file that the scheduler keeps between runs:
//!
//! ```text
//! {
//!   "updated_at": "2026-10-18T09:30:00Z",
//!   "count": 2,
//!   "seen_ids": ["homes:b-1234567", "suumo:jnc_000011112222"]
//! }
//! ```
//!
//! A bare JSON array of identifiers is accepted on read as well.

pub mod local;
pub mod lock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::SeenSet;

// Re-export for convenience
pub use local::LocalStorage;
pub use lock::StateLock;

/// Where the loaded seen set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// Read from an existing, well-formed state file
    Loaded,
    /// No state file yet (first run)
    Missing,
    /// The file existed but could not be read or parsed
    Recovered,
}

/// Seen set as loaded at the start of a run.
#[derive(Debug, Clone)]
pub struct SeenState {
    pub ids: SeenSet,
    pub origin: StateOrigin,
    /// Last write time recorded in the file, when known
    pub updated_at: Option<DateTime<Utc>>,
}

impl SeenState {
    pub fn missing() -> Self {
        Self {
            ids: SeenSet::new(),
            origin: StateOrigin::Missing,
            updated_at: None,
        }
    }

    pub fn recovered() -> Self {
        Self {
            ids: SeenSet::new(),
            origin: StateOrigin::Recovered,
            updated_at: None,
        }
    }

    pub fn loaded(ids: SeenSet, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            ids,
            origin: StateOrigin::Loaded,
            updated_at,
        }
    }
}

/// On-disk layout written by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Number of identifiers
    pub count: usize,
    /// Sorted identifiers
    pub seen_ids: SeenSet,
}

impl StateFile {
    pub fn new(seen_ids: SeenSet) -> Self {
        Self {
            updated_at: Utc::now(),
            count: seen_ids.len(),
            seen_ids,
        }
    }
}

/// Layouts accepted when reading.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StateFileRepr {
    List(Vec<String>),
    Object {
        /// Kept loose so a bad timestamp never discards the identifiers
        #[serde(default)]
        updated_at: Option<serde_json::Value>,
        #[serde(default)]
        seen_ids: Vec<String>,
    },
}

/// Parse state file bytes in either accepted layout.
pub fn parse_state(bytes: &[u8]) -> Result<SeenState> {
    let state = match serde_json::from_slice::<StateFileRepr>(bytes)? {
        StateFileRepr::List(ids) => SeenState::loaded(ids.into_iter().collect(), None),
        StateFileRepr::Object {
            updated_at,
            seen_ids,
        } => SeenState::loaded(
            seen_ids.into_iter().collect(),
            updated_at.as_ref().and_then(parse_timestamp),
        ),
    };
    Ok(state)
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    match DateTime::parse_from_rfc3339(text) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            log::warn!("Ignoring unparsable updated_at {:?}: {}", text, e);
            None
        }
    }
}

/// Trait for seen-set storage backends.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Load the seen set. Never fails: unreadable state degrades to an
    /// empty set with `StateOrigin::Recovered`.
    async fn load(&self) -> SeenState;

    /// Persist the full seen set, replacing what was stored.
    async fn save(&self, ids: &SeenSet) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_layout() {
        let state = parse_state(
            br#"{"updated_at":"2026-10-01T00:00:00Z","count":2,"seen_ids":["b","a"]}"#,
        )
        .unwrap();
        assert_eq!(state.origin, StateOrigin::Loaded);
        assert_eq!(state.ids.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(state.updated_at.is_some());
    }

    #[test]
    fn test_parse_bare_list() {
        let state = parse_state(br#"["suumo:1","suumo:1","homes:2"]"#).unwrap();
        assert_eq!(state.ids.len(), 2);
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn test_parse_object_without_ids() {
        let state = parse_state(br#"{"other": true}"#).unwrap();
        assert!(state.ids.is_empty());
        assert_eq!(state.origin, StateOrigin::Loaded);
    }

    #[test]
    fn test_bad_timestamp_keeps_identifiers() {
        let state =
            parse_state(br#"{"updated_at":"yesterday","seen_ids":["suumo:1","homes:2"]}"#)
                .unwrap();
        assert_eq!(state.origin, StateOrigin::Loaded);
        assert_eq!(state.ids.len(), 2);
        assert!(state.updated_at.is_none());

        let state = parse_state(br#"{"updated_at":1700000000,"seen_ids":["a"]}"#).unwrap();
        assert!(state.ids.contains("a"));
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_state(b"{not json").is_err());
        assert!(parse_state(br#"[1, 2]"#).is_err());
        assert!(parse_state(br#""text""#).is_err());
    }

    #[test]
    fn test_state_file_round_trip_is_sorted() {
        let ids: SeenSet = ["z", "a", "m"].iter().map(|s| s.to_string()).collect();
        let json = serde_json::to_string(&StateFile::new(ids)).unwrap();
        assert!(json.contains(r#""seen_ids":["a","m","z"]"#));
        assert!(json.contains(r#""count":3"#));
    }
}
