//! Persistent table of per-item stability records.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use uuid::Uuid;

use cadence_core::{StabilityRecord, merge_records};

use crate::error::Result;
use crate::json_table::JsonTable;

pub struct StabilityStore {
    table: JsonTable<StabilityRecord>,
    records: Mutex<HashMap<Uuid, StabilityRecord>>,
}

impl StabilityStore {
    pub fn open(path: &Path) -> Result<Self> {
        let table: JsonTable<StabilityRecord> = JsonTable::new(path);
        let records: HashMap<Uuid, StabilityRecord> = table
            .load()?
            .into_iter()
            .map(|r| (r.item_id, r))
            .collect();
        tracing::info!("loaded {} stability records", records.len());
        Ok(Self {
            table,
            records: Mutex::new(records),
        })
    }

    fn persist(&self, records: &HashMap<Uuid, StabilityRecord>) -> Result<()> {
        let mut rows: Vec<&StabilityRecord> = records.values().collect();
        rows.sort_by_key(|r| r.item_id);
        let rows: Vec<StabilityRecord> = rows.into_iter().cloned().collect();
        self.table.save(&rows).inspect_err(|e| {
            tracing::error!("failed to save {}: {e}", self.table.path().display());
        })
    }

    pub fn get(&self, item_id: Uuid) -> Option<StabilityRecord> {
        self.records.lock().get(&item_id).cloned()
    }

    pub fn snapshot(&self) -> HashMap<Uuid, StabilityRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn upsert(&self, record: StabilityRecord) -> Result<()> {
        let mut guard = self.records.lock();
        let mut next = guard.clone();
        next.insert(record.item_id, record);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn remove(&self, item_id: Uuid) -> Result<bool> {
        let mut guard = self.records.lock();
        if !guard.contains_key(&item_id) {
            return Ok(false);
        }
        let mut next = guard.clone();
        next.remove(&item_id);
        self.persist(&next)?;
        *guard = next;
        Ok(true)
    }

    /// Replace the records of `old_ids` with one review-weighted record for
    /// `new_id`. Repeated ids count once. Returns `None` when none of the
    /// old items had a record.
    pub fn merge(&self, old_ids: &[Uuid], new_id: Uuid) -> Result<Option<StabilityRecord>> {
        let mut old_ids = old_ids.to_vec();
        old_ids.sort();
        old_ids.dedup();

        let mut guard = self.records.lock();
        let sources: Vec<StabilityRecord> = old_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect();
        let Some(merged) = merge_records(&sources, new_id) else {
            return Ok(None);
        };
        let mut next = guard.clone();
        for id in &old_ids {
            next.remove(id);
        }
        next.insert(new_id, merged.clone());
        self.persist(&next)?;
        *guard = next;
        tracing::info!(
            "merged {} stability records into {new_id} (S={:.2}, reviews={})",
            sources.len(),
            merged.stability,
            merged.review_count
        );
        Ok(Some(merged))
    }
}
