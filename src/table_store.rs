use crate::error::{AnalyticsError, Result};
use crate::schema::{Statement, StatementKind};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence boundary for whole statements. Implementations decide how a
/// statement is laid out; callers only load and save by key.
pub trait TableStore {
    fn load(&self, kind: StatementKind) -> Result<Statement>;
    fn save(&mut self, kind: StatementKind, statement: &Statement) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTableStore {
    statements: HashMap<StatementKind, Statement>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryTableStore {
    fn load(&self, kind: StatementKind) -> Result<Statement> {
        self.statements
            .get(&kind)
            .cloned()
            .ok_or_else(|| AnalyticsError::NotFound(format!("stored {} statement", kind)))
    }

    fn save(&mut self, kind: StatementKind, statement: &Statement) -> Result<()> {
        self.statements.insert(kind, statement.clone());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredStatement {
    saved_at: DateTime<Utc>,
    statement: Statement,
}

/// One pretty-printed JSON document per statement key under `root`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: StatementKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.key()))
    }

    /// When the stored statement was last saved.
    pub fn saved_at(&self, kind: StatementKind) -> Result<DateTime<Utc>> {
        Ok(self.read(kind)?.saved_at)
    }

    fn read(&self, kind: StatementKind) -> Result<StoredStatement> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Err(AnalyticsError::NotFound(format!(
                "stored {} statement at {}",
                kind,
                path.display()
            )));
        }

        let raw = fs::read_to_string(&path)?;
        let stored: StoredStatement = serde_json::from_str(&raw)?;

        if stored.statement.kind() != kind {
            return Err(AnalyticsError::Validation {
                code: kind.key().to_string(),
                details: format!(
                    "{} holds a {} statement",
                    path.display(),
                    stored.statement.kind()
                ),
            });
        }

        Ok(stored)
    }
}

impl TableStore for JsonFileStore {
    fn load(&self, kind: StatementKind) -> Result<Statement> {
        let stored = self.read(kind)?;
        debug!(
            "Loaded {} statement saved at {}",
            kind,
            stored.saved_at.to_rfc3339()
        );
        Ok(stored.statement)
    }

    fn save(&mut self, kind: StatementKind, statement: &Statement) -> Result<()> {
        if statement.kind() != kind {
            return Err(AnalyticsError::Validation {
                code: kind.key().to_string(),
                details: format!("cannot store a {} statement under this key", statement.kind()),
            });
        }

        fs::create_dir_all(&self.root)?;

        let stored = StoredStatement {
            saved_at: Utc::now(),
            statement: statement.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        // A failed save leaves the previous document in place.
        let path = self.path_for(kind);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!("Saved {} statement to {}", kind, path.display());
        Ok(())
    }
}
