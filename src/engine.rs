//! Derivation engine: per-row growth and deviation, the per-year view model
//! and the rollup of total rows.

use crate::error::{AnalyticsError, Result};
use crate::schema::{LineItem, Statement, StatementKind};
use log::trace;
use serde::Serialize;

/// Derived columns of one row for one year. `None` means "not applicable",
/// which is never the same as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RowDerivation {
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub growth_rate: Option<f64>,
    pub absolute_deviation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRow {
    pub code: String,
    pub label: String,
    pub is_subitem: bool,
    pub is_total: bool,
    #[serde(flatten)]
    pub values: RowDerivation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSection {
    pub name: Option<String>,
    pub rows: Vec<DerivedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub kind: StatementKind,
    pub year: i32,
    pub sections: Vec<DerivedSection>,
}

impl DerivedView {
    pub fn rows(&self) -> impl Iterator<Item = &DerivedRow> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    pub fn row(&self, code: &str) -> Option<&DerivedRow> {
        self.rows().find(|r| !code.is_empty() && r.code == code)
    }
}

/// Derives one row for `year`. There is no prior year at or below
/// `min_year`.
pub fn derive_row(item: &LineItem, year: i32, min_year: Option<i32>) -> RowDerivation {
    let current = item.value(year);
    let previous = match min_year {
        Some(min) if year <= min => None,
        _ => year.checked_sub(1).and_then(|y| item.value(y)),
    };

    let growth_rate = match (current, previous) {
        (Some(c), Some(p)) if p != 0.0 => Some(c / p * 100.0),
        _ => None,
    };

    let absolute_deviation = match (current, previous) {
        (Some(c), Some(p)) => Some(c - p),
        _ => None,
    };

    RowDerivation {
        current,
        previous,
        growth_rate,
        absolute_deviation,
    }
}

/// A row is shown unless every one of its values, across all years, is
/// zero or absent. The decision does not depend on the selected year.
pub fn is_visible(item: &LineItem) -> bool {
    !item.is_blank()
}

pub fn derive_statement_row(statement: &Statement, item: &LineItem, year: i32) -> DerivedRow {
    DerivedRow {
        code: item.code.clone(),
        label: item.label.clone(),
        is_subitem: item.is_subitem,
        is_total: statement.is_total(&item.code),
        values: derive_row(item, year, statement.min_year()),
    }
}

pub fn derive_view(statement: &Statement, year: i32) -> Result<DerivedView> {
    if !statement.years().contains(&year) {
        return Err(AnalyticsError::NotFound(format!(
            "year {} in {} statement",
            year,
            statement.kind()
        )));
    }

    let sections = statement
        .sections()
        .iter()
        .filter_map(|section| {
            let rows: Vec<DerivedRow> = statement
                .section_items(section)
                .iter()
                .filter(|item| is_visible(item))
                .map(|item| derive_statement_row(statement, item, year))
                .collect();

            if rows.is_empty() {
                None
            } else {
                Some(DerivedSection {
                    name: section.name.clone(),
                    rows,
                })
            }
        })
        .collect();

    Ok(DerivedView {
        kind: statement.kind(),
        year,
        sections,
    })
}

/// Rewrites every total row of the statement for `year` as the sum of its
/// members, absent members counting as 0. Totals of totals are processed
/// after their members. Returns the totals written, in that order.
pub fn recompute_totals(statement: &mut Statement, year: i32) -> Vec<(String, f64)> {
    let descriptor = statement.descriptor();
    let mut written = Vec::new();

    for rollup in descriptor.rollups {
        if statement.find(rollup.total).is_none() {
            continue;
        }

        let sum: f64 = rollup
            .members
            .iter()
            .filter_map(|code| statement.find(code).and_then(|item| item.value(year)))
            .sum();

        if let Some(total) = statement.find_mut(rollup.total) {
            total.values.insert(year, sum);
            trace!("{} {} [{}] = {}", descriptor.kind, rollup.total, year, sum);
            written.push((rollup.total.to_string(), sum));
        }
    }

    written
}
