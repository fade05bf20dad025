use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use crate::storage::KvStore;

use super::model::{DayRecord, Draft};

/// The two persisted blobs. Key names are versioned so a future shape
/// change can migrate instead of tripping over old data.
pub const DAYS_KEY: &str = "nutrilog.days.v1";
pub const DRAFT_KEY: &str = "nutrilog.draft.v1";

/// Owns the serialized representation of the days map and the draft.
/// Reads degrade silently: an unavailable store or malformed blob yields
/// empty state, never an error. Writes do surface failures.
#[derive(Clone)]
pub struct DayRepo {
    kv: Arc<dyn KvStore>,
}

impl DayRepo {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load_days(&self) -> BTreeMap<String, DayRecord> {
        let raw = match self.kv.get(DAYS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "days map read failed, treating as empty");
                return BTreeMap::new();
            }
        };

        let value: Value = match serde_json::from_slice(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "days map blob is not JSON, treating as empty");
                return BTreeMap::new();
            }
        };
        let Some(map) = value.as_object() else {
            warn!("days map blob is not an object, treating as empty");
            return BTreeMap::new();
        };

        map.iter()
            .filter_map(|(key, entry)| {
                match serde_json::from_value::<DayRecord>(entry.clone()) {
                    Ok(mut day) => {
                        // The map key is authoritative for the date.
                        if day.date_key.is_empty() {
                            day.date_key = key.clone();
                        }
                        Some((key.clone(), day))
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "dropping malformed day entry");
                        None
                    }
                }
            })
            .collect()
    }

    pub async fn save_days(&self, days: &BTreeMap<String, DayRecord>) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(days)?;
        self.kv.set(DAYS_KEY, Bytes::from(raw)).await
    }

    pub async fn load_draft(&self) -> Option<Draft> {
        let raw = match self.kv.get(DRAFT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "draft read failed, treating as absent");
                return None;
            }
        };
        match serde_json::from_slice::<Draft>(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(error = %e, "draft blob malformed, treating as absent");
                None
            }
        }
    }

    pub async fn save_draft(&self, draft: &Draft) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(draft)?;
        self.kv.set(DRAFT_KEY, Bytes::from(raw)).await
    }

    pub async fn clear_draft(&self) -> anyhow::Result<()> {
        self.kv.delete(DRAFT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use crate::tracker::model::{MealLog, Mode};
    use serde_json::json;

    fn repo() -> DayRepo {
        DayRepo::new(Arc::new(MemoryKv::new()))
    }

    fn sample_day(key: &str) -> DayRecord {
        DayRecord {
            date_key: key.to_string(),
            saved_at: None,
            mode: Mode::Maintain,
            goal: 2000,
            water_cups: 3,
            steps: 5000,
            burned: 200,
            meal_log: MealLog::default(),
            totals: None,
        }
    }

    #[tokio::test]
    async fn empty_store_yields_empty_state() {
        let repo = repo();
        assert!(repo.load_days().await.is_empty());
        assert!(repo.load_draft().await.is_none());
    }

    #[tokio::test]
    async fn days_roundtrip() {
        let repo = repo();
        let mut days = BTreeMap::new();
        days.insert("2024-01-01".to_string(), sample_day("2024-01-01"));
        days.insert("2024-01-02".to_string(), sample_day("2024-01-02"));
        repo.save_days(&days).await.unwrap();

        let loaded = repo.load_days().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["2024-01-02"].steps, 5000);
    }

    #[tokio::test]
    async fn corrupt_days_blob_is_treated_as_empty() {
        let repo = repo();
        repo.kv
            .set(DAYS_KEY, Bytes::from_static(b"{not json"))
            .await
            .unwrap();
        assert!(repo.load_days().await.is_empty());

        repo.kv
            .set(DAYS_KEY, Bytes::from_static(b"[1,2,3]"))
            .await
            .unwrap();
        assert!(repo.load_days().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_entry_is_dropped_but_good_entries_survive() {
        let repo = repo();
        let blob = json!({
            "2024-01-01": { "mode": "Maintain", "goal": 2000 },
            "2024-01-02": "not an object",
        });
        repo.kv
            .set(DAYS_KEY, Bytes::from(serde_json::to_vec(&blob).unwrap()))
            .await
            .unwrap();

        let days = repo.load_days().await;
        assert_eq!(days.len(), 1);
        // date key backfilled from the map key
        assert_eq!(days["2024-01-01"].date_key, "2024-01-01");
    }

    #[tokio::test]
    async fn draft_roundtrip_and_clear() {
        let repo = repo();
        let draft = Draft::empty("2024-01-01".into(), 1800, 2500);
        repo.save_draft(&draft).await.unwrap();
        assert_eq!(repo.load_draft().await.unwrap().daily_goal, 1800);

        repo.clear_draft().await.unwrap();
        assert!(repo.load_draft().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_draft_is_treated_as_absent() {
        let repo = repo();
        repo.kv
            .set(DRAFT_KEY, Bytes::from_static(b"????"))
            .await
            .unwrap();
        assert!(repo.load_draft().await.is_none());
    }
}
