use crate::error::{AnalyticsError, Result};
use crate::schema::{LineItem, Statement, StatementKind};
use log::{debug, info};
use std::collections::BTreeMap;

/// In-memory home of every loaded statement. Owns all raw values and the
/// rollup-derived totals.
#[derive(Debug, Default, Clone)]
pub struct LineItemStore {
    statements: BTreeMap<StatementKind, Statement>,
}

impl LineItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a statement, replacing any previously loaded statement of the
    /// same kind wholesale.
    pub fn insert(&mut self, statement: Statement) -> Option<Statement> {
        let kind = statement.kind();
        info!(
            "Loaded {} statement: {} items, years {:?}",
            kind,
            statement.items().len(),
            statement.years()
        );
        self.statements.insert(kind, statement)
    }

    pub fn get(&self, kind: StatementKind) -> Result<&Statement> {
        self.statements
            .get(&kind)
            .ok_or_else(|| AnalyticsError::NotFound(format!("no {} statement loaded", kind)))
    }

    pub(crate) fn get_mut(&mut self, kind: StatementKind) -> Result<&mut Statement> {
        self.statements
            .get_mut(&kind)
            .ok_or_else(|| AnalyticsError::NotFound(format!("no {} statement loaded", kind)))
    }

    pub fn find_by_code(&self, kind: StatementKind, code: &str) -> Result<&LineItem> {
        self.get(kind)?.find(code).ok_or_else(|| {
            AnalyticsError::NotFound(format!("code '{}' in {} statement", code, kind))
        })
    }

    /// Sets (or, with `None`, clears) one raw value.
    ///
    /// Total rows are rejected: their values only ever come from rollups.
    pub fn set_raw_value(
        &mut self,
        kind: StatementKind,
        code: &str,
        year: i32,
        value: Option<f64>,
    ) -> Result<()> {
        let statement = self.get_mut(kind)?;

        if statement.is_total(code) {
            return Err(AnalyticsError::Validation {
                code: code.to_string(),
                details: "total rows are rollup-derived and cannot be edited".to_string(),
            });
        }

        if let Some(v) = value {
            if !v.is_finite() {
                return Err(AnalyticsError::Validation {
                    code: code.to_string(),
                    details: format!("value {} is not numeric", v),
                });
            }
        }

        if !statement.years().contains(&year) {
            return Err(AnalyticsError::NotFound(format!(
                "year {} in {} statement",
                year, kind
            )));
        }

        let item = statement.find_mut(code).ok_or_else(|| {
            AnalyticsError::NotFound(format!("code '{}' in {} statement", code, kind))
        })?;

        let previous = match value {
            Some(v) => item.values.insert(year, v),
            None => item.values.remove(&year),
        };
        debug!("{} {} [{}]: {:?} -> {:?}", kind, code, year, previous, value);

        Ok(())
    }
}
