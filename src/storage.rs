//! Persistence of custom print records
//!
//! A custom print is a saved [`PrintEstimate`] that a cart line can refer to.
//! Records are stored as JSON; numbers are written with enough digits to
//! read back the exact same `f64` values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::PrintEstimate;

const FILE_PREFIX: &str = "custom-print-";
const FILE_SUFFIX: &str = ".json";

/// Identifier of a saved custom print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomPrintId(pub u64);

impl fmt::Display for CustomPrintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage capability for custom print records
pub trait CustomPrintStore {
    /// Persist an estimate and return its new id
    fn save(&mut self, estimate: &PrintEstimate) -> Result<CustomPrintId>;

    /// Load a previously saved estimate
    ///
    /// # Errors
    /// [`Error::NotFound`] when no record has this id.
    fn load(&self, id: CustomPrintId) -> Result<PrintEstimate>;

    /// Delete a saved estimate
    ///
    /// # Errors
    /// [`Error::NotFound`] when no record has this id.
    fn delete(&mut self, id: CustomPrintId) -> Result<()>;
}

fn encode(estimate: &PrintEstimate) -> Result<String> {
    serde_json::to_string_pretty(estimate).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode(id: CustomPrintId, json: &str) -> Result<PrintEstimate> {
    serde_json::from_str(json)
        .map_err(|e| Error::Serialization(format!("custom print {}: {}", id, e)))
}

fn not_found(id: CustomPrintId) -> Error {
    Error::NotFound(format!("custom print {}", id))
}

fn next_id(last_id: u64) -> Result<CustomPrintId> {
    last_id
        .checked_add(1)
        .map(CustomPrintId)
        .ok_or_else(|| Error::Serialization("custom print ids are exhausted".to_string()))
}

/// In-memory store, mostly useful for tests and single-process demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<CustomPrintId, String>,
    last_id: u64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CustomPrintStore for MemoryStore {
    fn save(&mut self, estimate: &PrintEstimate) -> Result<CustomPrintId> {
        let json = encode(estimate)?;
        let id = next_id(self.last_id)?;
        self.last_id = id.0;
        self.records.insert(id, json);
        Ok(id)
    }

    fn load(&self, id: CustomPrintId) -> Result<PrintEstimate> {
        let json = self.records.get(&id).ok_or_else(|| not_found(id))?;
        decode(id, json)
    }

    fn delete(&mut self, id: CustomPrintId) -> Result<()> {
        self.records.remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }
}

/// Store that keeps one `custom-print-<id>.json` file per record
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    last_id: u64,
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// New ids continue after the highest id already present.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut last_id = 0;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(parse_file_name) {
                last_id = last_id.max(id);
            }
        }
        debug!(root = %root.display(), last_id, "opened custom print directory");
        Ok(Self { root, last_id })
    }

    /// Directory holding the records
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: CustomPrintId) -> PathBuf {
        self.root
            .join(format!("{}{}{}", FILE_PREFIX, id.0, FILE_SUFFIX))
    }
}

fn parse_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

impl CustomPrintStore for DirectoryStore {
    fn save(&mut self, estimate: &PrintEstimate) -> Result<CustomPrintId> {
        let json = encode(estimate)?;
        let id = next_id(self.last_id)?;
        fs::write(self.path_for(id), json)?;
        self.last_id = id.0;
        debug!(%id, "saved custom print");
        Ok(id)
    }

    fn load(&self, id: CustomPrintId) -> Result<PrintEstimate> {
        match fs::read_to_string(self.path_for(id)) {
            Ok(json) => decode(id, &json),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, id: CustomPrintId) -> Result<()> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}
