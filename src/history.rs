use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::storage::{read_json, write_json, KvStore, PLAYS_KEY};

const DEDUP_WINDOW_SECONDS: i64 = 10;

/// One play, stored oldest-first under `mysic_plays`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEntry {
    #[serde(rename = "trackId")]
    pub track_id: String,
    #[serde(rename = "timestamp")]
    pub played_at: DateTime<Utc>,
}

/// Bounded play log
pub struct PlayHistory {
    store: Arc<dyn KvStore>,
    max_entries: usize,
}

impl PlayHistory {
    pub fn new(store: Arc<dyn KvStore>, max_entries: usize) -> Self {
        Self {
            store,
            max_entries: max_entries.max(1),
        }
    }

    /// Append a play. Returns false when it repeats the same track within the dedup window.
    pub async fn record(&self, track_id: &str) -> Result<bool, CatalogError> {
        self.record_at(track_id, Utc::now()).await
    }

    pub async fn record_at(&self, track_id: &str, now: DateTime<Utc>) -> Result<bool, CatalogError> {
        let mut entries: Vec<PlayEntry> = read_json(self.store.as_ref(), PLAYS_KEY).await;

        let cutoff = now - Duration::seconds(DEDUP_WINDOW_SECONDS);
        let repeated = entries
            .iter()
            .rev()
            .take_while(|e| e.played_at >= cutoff)
            .any(|e| e.track_id == track_id);
        if repeated {
            tracing::debug!("Skipping repeated play of {}", track_id);
            return Ok(false);
        }

        entries.push(PlayEntry {
            track_id: track_id.to_string(),
            played_at: now,
        });

        // Trim to max size
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        write_json(self.store.as_ref(), PLAYS_KEY, &entries).await?;
        Ok(true)
    }

    /// Most recent plays first
    pub async fn recent(&self, limit: usize) -> Vec<PlayEntry> {
        let entries: Vec<PlayEntry> = read_json(self.store.as_ref(), PLAYS_KEY).await;
        entries.into_iter().rev().take(limit).collect()
    }
}
