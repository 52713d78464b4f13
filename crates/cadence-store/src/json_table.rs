//! Atomic whole-file JSON array tables.
//!
//! A save writes the full table to a temp file in the same directory and
//! renames it over the target, so readers see either the old table or the
//! new one. A missing file is an empty table.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use cadence_core::serde_compat::{export_json, import_json_lenient};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct JsonTable<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonTable<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<T>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        import_json_lenient(&json).map_err(|e| {
            StoreError::InvalidData(format!("{} is not a JSON array: {e}", self.path.display()))
        })
    }

    pub fn save(&self, records: &[T]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let json = export_json(records)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        label: String,
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table: JsonTable<Row> = JsonTable::new(dir.path().join("absent.json"));
        assert!(table.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonTable::new(dir.path().join("nested").join("rows.json"));
        let rows = vec![
            Row { id: 1, label: "a".into() },
            Row { id: 2, label: "b".into() },
        ];
        table.save(&rows).unwrap();
        assert_eq!(table.load().unwrap(), rows);

        table.save(&rows[..1]).unwrap();
        assert_eq!(table.load().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(&path, "{not json").unwrap();
        let table: JsonTable<Row> = JsonTable::new(&path);
        assert!(matches!(table.load(), Err(StoreError::InvalidData(_))));
    }
}
