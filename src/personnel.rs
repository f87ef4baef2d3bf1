//! Personnel directory seam.
//!
//! Person records are owned by the external personnel-management system;
//! the core only performs read-only lookups keyed by identity label.

use crate::error::{AccessError, Result};
use crate::policy::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// An enrolled person, keyed by their assigned identity label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Identity label - unique per enrolled person, immutable once assigned
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Free-form enrollment metadata (department, notes, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Read-only lookup of enrolled people
#[async_trait]
pub trait PersonnelDirectory: Send + Sync {
    /// Find the record for an identity label, if enrolled
    async fn lookup(&self, label: &str) -> Option<PersonRecord>;
}

/// Directory backed by an in-memory table, optionally loaded from a JSON
/// file of records.
pub struct InMemoryDirectory {
    records: HashMap<String, PersonRecord>,
}

impl InMemoryDirectory {
    pub fn new(records: Vec<PersonRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Load enrollment data from a JSON array of person records.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            AccessError::Config(format!("personnel file {}: {}", path.display(), e))
        })?;
        let records: Vec<PersonRecord> = serde_json::from_reader(file)
            .map_err(|e| AccessError::Config(format!("personnel file parse: {}", e)))?;
        info!("Loaded {} person records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PersonnelDirectory for InMemoryDirectory {
    async fn lookup(&self, label: &str) -> Option<PersonRecord> {
        self.records.get(label).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_unknown_role_parse() {
        let json = r#"[
            {"id": "ID_1", "name": "Alice Chen", "role": "resident"},
            {"id": "ID_2", "name": "Bob Park", "role": "staff"},
            {"id": "ID_3", "name": "Legacy Entry", "role": "contractor"}
        ]"#;
        let records: Vec<PersonRecord> = serde_json::from_str(json).unwrap();
        let directory = InMemoryDirectory::new(records);

        assert_eq!(directory.lookup("ID_1").await.unwrap().role, Role::Resident);
        assert_eq!(directory.lookup("ID_2").await.unwrap().role, Role::Staff);
        // Roles the policy does not know deserialize to the fail-closed variant
        assert_eq!(directory.lookup("ID_3").await.unwrap().role, Role::Unknown);
        assert!(directory.lookup("ID_99").await.is_none());
    }
}
