//! SQLite-backed owners, items, practice history and override log.

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use cadence_core::{
    HistoryEntry, Library, OverrideRecord, Owner, OwnerState, PracticeItem,
};

use crate::error::{Result, StoreError};
use crate::schema;

const ITEM_COLUMNS: &str = "id, owner_id, name, difficulty, completed_repetitions, foundation_stage,
     next_due_date, interval_days, last_practice_date, last_frustration_date, lifecycle,
     target_repetitions, attempts_till_success, tau_calibration, override_bias";

const HISTORY_COLUMNS: &str = "id, item_id, date, duration, repetitions, performance_score, outcome,
     total_failures, is_deleted";

pub struct LibraryStore {
    conn: Connection,
}

/// Raw `items` row before id and enum parsing.
struct ItemRow {
    id: String,
    owner_id: String,
    name: String,
    difficulty: String,
    completed_repetitions: u32,
    foundation_stage: i32,
    next_due_date: Option<NaiveDate>,
    interval_days: u32,
    last_practice_date: Option<NaiveDate>,
    last_frustration_date: Option<NaiveDate>,
    lifecycle: String,
    target_repetitions: u32,
    attempts_till_success: u32,
    tau_calibration: f64,
    override_bias: f64,
}

impl ItemRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            difficulty: row.get(3)?,
            completed_repetitions: row.get(4)?,
            foundation_stage: row.get(5)?,
            next_due_date: row.get(6)?,
            interval_days: row.get(7)?,
            last_practice_date: row.get(8)?,
            last_frustration_date: row.get(9)?,
            lifecycle: row.get(10)?,
            target_repetitions: row.get(11)?,
            attempts_till_success: row.get(12)?,
            tau_calibration: row.get(13)?,
            override_bias: row.get(14)?,
        })
    }

    fn into_item(self) -> Result<PracticeItem> {
        Ok(PracticeItem {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            name: self.name,
            difficulty: parse_enum(&self.difficulty)?,
            completed_repetitions: self.completed_repetitions,
            foundation_stage: self.foundation_stage,
            next_due_date: self.next_due_date,
            interval_days: self.interval_days,
            last_practice_date: self.last_practice_date,
            last_frustration_date: self.last_frustration_date,
            lifecycle: parse_enum(&self.lifecycle)?,
            target_repetitions: self.target_repetitions,
            attempts_till_success: self.attempts_till_success,
            tau_calibration: self.tau_calibration,
            override_bias: self.override_bias,
        })
    }
}

type HistoryRow = (String, String, NaiveDate, u32, u32, f64, String, u32, bool);

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get::<_, i32>(8)? != 0,
    ))
}

fn history_from_parts(raw: HistoryRow) -> Result<HistoryEntry> {
    let (id, item_id, date, duration, repetitions, performance_score, outcome, total_failures, is_deleted) =
        raw;
    Ok(HistoryEntry {
        id: parse_uuid(&id)?,
        item_id: parse_uuid(&item_id)?,
        date,
        duration,
        repetitions,
        performance_score,
        outcome: parse_enum(&outcome)?,
        total_failures,
        is_deleted,
    })
}

impl LibraryStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Owners ---

    pub fn add_owner(&self, owner: &Owner) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO owners (id, name, state) VALUES (?1, ?2, ?3)",
            params![owner.id.to_string(), owner.name, owner.state.as_str()],
        )?;
        Ok(())
    }

    pub fn set_owner_state(&self, id: Uuid, state: OwnerState) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE owners SET state = ?1 WHERE id = ?2",
            params![state.as_str(), id.to_string()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("owner {id}")));
        }
        Ok(())
    }

    pub fn owners(&self) -> Result<Vec<Owner>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, state FROM owners ORDER BY name, id")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter()
            .map(|(id, name, state)| {
                Ok(Owner {
                    id: parse_uuid(&id)?,
                    name,
                    state: parse_enum(&state)?,
                })
            })
            .collect()
    }

    // --- Items ---

    pub fn upsert_item(&self, item: &PracticeItem) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO items ({ITEM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                item.id.to_string(),
                item.owner_id.to_string(),
                item.name,
                item.difficulty.as_str(),
                item.completed_repetitions,
                item.foundation_stage,
                item.next_due_date,
                item.interval_days,
                item.last_practice_date,
                item.last_frustration_date,
                item.lifecycle.as_str(),
                item.target_repetitions,
                item.attempts_till_success,
                item.tau_calibration,
                item.override_bias,
            ],
        )?;
        Ok(())
    }

    pub fn item(&self, id: Uuid) -> Result<Option<PracticeItem>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                [id.to_string()],
                ItemRow::from_row,
            )
            .optional()?;
        row.map(ItemRow::into_item).transpose()
    }

    /// Like [`item`](Self::item) but a missing item is an error.
    pub fn require_item(&self, id: Uuid) -> Result<PracticeItem> {
        self.item(id)?
            .ok_or_else(|| StoreError::NotFound(format!("item {id}")))
    }

    pub fn items(&self) -> Result<Vec<PracticeItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY name, id"))?;
        let rows: Vec<ItemRow> = stmt
            .query_map([], ItemRow::from_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Delete the item row. History stays in the log.
    pub fn remove_item(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", [id.to_string()])?;
        Ok(rows > 0)
    }

    // --- History ---

    pub fn add_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO history ({HISTORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                entry.id.to_string(),
                entry.item_id.to_string(),
                entry.date,
                entry.duration,
                entry.repetitions,
                entry.performance_score,
                entry.outcome.as_str(),
                entry.total_failures,
                entry.is_deleted as i32,
            ],
        )?;
        Ok(())
    }

    /// Rewrite an existing entry in place (including soft deletion).
    pub fn update_history(&self, entry: &HistoryEntry) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE history SET item_id = ?2, date = ?3, duration = ?4, repetitions = ?5,
                 performance_score = ?6, outcome = ?7, total_failures = ?8, is_deleted = ?9
             WHERE id = ?1",
            params![
                entry.id.to_string(),
                entry.item_id.to_string(),
                entry.date,
                entry.duration,
                entry.repetitions,
                entry.performance_score,
                entry.outcome.as_str(),
                entry.total_failures,
                entry.is_deleted as i32,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("history entry {}", entry.id)));
        }
        Ok(())
    }

    /// Every entry for the item, deleted ones included, oldest first.
    pub fn history_for_item(&self, item_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history WHERE item_id = ?1 ORDER BY date, rowid"
        ))?;
        let rows: Vec<HistoryRow> = stmt
            .query_map([item_id.to_string()], history_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(history_from_parts).collect()
    }

    fn all_history(&self) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {HISTORY_COLUMNS} FROM history ORDER BY date, rowid"))?;
        let rows: Vec<HistoryRow> = stmt
            .query_map([], history_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().map(history_from_parts).collect()
    }

    /// Move history of merged items onto the surviving item.
    pub fn reassign_history(&self, from: &[Uuid], to: Uuid) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut moved = 0;
        {
            let mut stmt = tx.prepare("UPDATE history SET item_id = ?1 WHERE item_id = ?2")?;
            for id in from.iter().filter(|id| **id != to) {
                moved += stmt.execute(params![to.to_string(), id.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(moved)
    }

    // --- Overrides ---

    pub fn record_override(&self, record: &OverrideRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO overrides (item_id, date, computed_days, requested_days, final_days, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.item_id.to_string(),
                record.date,
                record.computed_days,
                record.requested_days,
                record.final_days,
                record.reason,
            ],
        )?;
        Ok(())
    }

    pub fn overrides_for_item(&self, item_id: Uuid) -> Result<Vec<OverrideRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, date, computed_days, requested_days, final_days, reason
             FROM overrides WHERE item_id = ?1 ORDER BY id",
        )?;
        let rows: Vec<(String, NaiveDate, u32, f64, u32, String)> = stmt
            .query_map([item_id.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter()
            .map(|(id, date, computed_days, requested_days, final_days, reason)| {
                Ok(OverrideRecord {
                    item_id: parse_uuid(&id)?,
                    date,
                    computed_days,
                    requested_days,
                    final_days,
                    reason,
                })
            })
            .collect()
    }

    // --- Snapshot ---

    /// Load owners, items and history into an in-memory [`Library`].
    pub fn load_library(&self) -> Result<Library> {
        Ok(Library::from_parts(
            self.owners()?,
            self.items()?,
            self.all_history()?,
        ))
    }

    pub fn count(&self, table: LibraryTable) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryTable {
    Owners,
    Items,
    History,
    Overrides,
}

impl LibraryTable {
    fn name(&self) -> &'static str {
        match self {
            LibraryTable::Owners => "owners",
            LibraryTable::Items => "items",
            LibraryTable::History => "history",
            LibraryTable::Overrides => "overrides",
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

fn parse_enum<T: FromStr<Err = String>>(s: &str) -> Result<T> {
    s.parse().map_err(StoreError::InvalidData)
}
