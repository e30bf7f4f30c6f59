//! Spreadsheet import.
//!
//! The workbook codec itself is abstracted behind [`WorkbookSource`]; this
//! module only knows how statement sheets are laid out (see
//! [`SheetLayout`](crate::chart_of_accounts::SheetLayout)) and turns their
//! rows into section markers and line items.

use crate::chart_of_accounts::{SheetLayout, StatementDescriptor};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::schema::{LineItem, Statement, StatementKind};
use crate::utils::parse_amount;
use log::{debug, info};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    /// Rows of the named sheet, starting at the sheet's first row and column.
    fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<Cell>>>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkbook {
    sheets: BTreeMap<String, Vec<Vec<Cell>>>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        self.sheets.insert(name.into(), rows);
        self
    }
}

impl WorkbookSource for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<Cell>>> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| AnalyticsError::Workbook(format!("sheet '{}' not found", name)))
    }
}

#[cfg(feature = "xlsx")]
pub use xlsx::XlsxWorkbook;

#[cfg(feature = "xlsx")]
mod xlsx {
    use super::{Cell, WorkbookSource};
    use crate::error::{AnalyticsError, Result};
    use calamine::{open_workbook_auto, Data, Reader, Sheets};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    pub struct XlsxWorkbook {
        inner: Sheets<BufReader<File>>,
    }

    impl XlsxWorkbook {
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let inner = open_workbook_auto(path).map_err(|e| {
                AnalyticsError::Workbook(format!("failed to open {}: {}", path.display(), e))
            })?;
            Ok(Self { inner })
        }
    }

    impl From<&Data> for Cell {
        fn from(data: &Data) -> Self {
            match data {
                Data::Empty => Cell::Empty,
                Data::Int(i) => Cell::Number(*i as f64),
                Data::Float(f) => Cell::Number(*f),
                Data::String(s) => Cell::from(s.as_str()),
                other => Cell::Text(other.to_string()),
            }
        }
    }

    impl WorkbookSource for XlsxWorkbook {
        fn sheet_names(&self) -> Vec<String> {
            self.inner.sheet_names()
        }

        fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<Cell>>> {
            let range = self.inner.worksheet_range(name).map_err(|e| {
                AnalyticsError::Workbook(format!("failed to read sheet '{}': {}", name, e))
            })?;

            // calamine ranges start at the first used cell; pad back to A1.
            let (first_row, first_col) = range.start().unwrap_or((0, 0));
            let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); first_row as usize];
            for row in range.rows() {
                let mut cells = vec![Cell::Empty; first_col as usize];
                cells.extend(row.iter().map(Cell::from));
                rows.push(cells);
            }
            Ok(rows)
        }
    }
}

/// The two statement sheets expected in one workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbookProfile {
    pub kinds: [StatementKind; 2],
}

impl WorkbookProfile {
    pub fn financial_results() -> Self {
        Self {
            kinds: [StatementKind::Balance, StatementKind::ProfitLoss],
        }
    }

    pub fn capital_and_costs() -> Self {
        Self {
            kinds: [StatementKind::Equity, StatementKind::ProductionCosts],
        }
    }
}

pub struct SpreadsheetLoader<'a> {
    config: &'a AnalyticsConfig,
    reporting_year: i32,
}

static EMPTY_CELL: Cell = Cell::Empty;

enum Record {
    Section(String),
    Item(LineItem),
}

impl<'a> SpreadsheetLoader<'a> {
    /// `reporting_year` is the year of each sheet's "current period" column.
    pub fn new(config: &'a AnalyticsConfig, reporting_year: i32) -> Self {
        Self {
            config,
            reporting_year,
        }
    }

    /// Reads every sheet of the profile. Either all statements load or none.
    pub fn load_workbook(
        &self,
        source: &mut dyn WorkbookSource,
        profile: WorkbookProfile,
    ) -> Result<Vec<Statement>> {
        profile
            .kinds
            .iter()
            .map(|kind| {
                let layout = StatementDescriptor::for_kind(*kind).layout;
                let rows = source.read_sheet(layout.sheet_name)?;
                self.load_sheet(*kind, &rows)
            })
            .collect()
    }

    pub fn load_sheet(&self, kind: StatementKind, rows: &[Vec<Cell>]) -> Result<Statement> {
        let layout = StatementDescriptor::for_kind(kind).layout;
        let years: Vec<i32> = layout
            .value_columns
            .iter()
            .map(|c| self.reporting_year + c.year_offset)
            .collect();

        let mut items = Vec::new();
        let mut section: Option<String> = None;

        for (idx, row) in rows.iter().enumerate().skip(layout.header_rows) {
            match self.parse_row(&layout, idx + 1, row)? {
                Some(Record::Section(name)) => {
                    debug!("{} row {}: section '{}'", kind, idx + 1, name);
                    section = Some(name);
                }
                Some(Record::Item(mut item)) => {
                    item.section = section.clone();
                    items.push(item);
                }
                None => {}
            }
        }

        info!(
            "Imported {} statement from sheet '{}': {} items",
            kind,
            layout.sheet_name,
            items.len()
        );

        Statement::new(kind, years, items)
    }

    fn parse_row(
        &self,
        layout: &SheetLayout,
        row_number: usize,
        row: &[Cell],
    ) -> Result<Option<Record>> {
        let cell = |column: usize| row.get(column).unwrap_or(&EMPTY_CELL);

        let raw_label = match cell(layout.label_column) {
            Cell::Text(text) => text.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        };
        let label = raw_label.trim().to_string();

        let code = parse_code(cell(layout.code_column)).map_err(|details| {
            AnalyticsError::Workbook(format!(
                "row {}, column {}: {}",
                row_number,
                layout.code_column + 1,
                details
            ))
        })?;

        let mut values = BTreeMap::new();
        for column in layout.value_columns {
            let at = |details: String| {
                AnalyticsError::Workbook(format!(
                    "row {}, column {}: {}",
                    row_number,
                    column.column + 1,
                    details
                ))
            };
            let value = match cell(column.column) {
                Cell::Empty => None,
                Cell::Number(n) if !n.is_finite() => {
                    return Err(at(format!("value {} is not finite", n)))
                }
                Cell::Number(n) => Some(*n),
                Cell::Text(text) => {
                    parse_amount(text, self.config).map_err(|e| at(e.to_string()))?
                }
            };
            if let Some(v) = value {
                values.insert(self.reporting_year + column.year_offset, v);
            }
        }

        if label.is_empty() && code.is_empty() && values.is_empty() {
            return Ok(None);
        }

        if code.is_empty() && values.is_empty() && is_section_heading(&label) {
            return Ok(Some(Record::Section(label)));
        }

        let is_subitem = code.is_empty()
            || raw_label.starts_with(char::is_whitespace)
            || label.to_lowercase().starts_with("в том числе");

        Ok(Some(Record::Item(LineItem {
            code,
            label,
            values,
            section: None,
            is_subitem,
        })))
    }
}

fn parse_code(cell: &Cell) -> std::result::Result<String, String> {
    match cell {
        Cell::Empty => Ok(String::new()),
        Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(format!("{}", *n as i64)),
        Cell::Number(n) => Err(format!("code {} is not an integer", n)),
        Cell::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(String::new())
            } else if text.chars().all(|c| c.is_ascii_digit()) {
                Ok(text.to_string())
            } else {
                Err(format!("code '{}' is not an integer", text))
            }
        }
    }
}

/// Section headings are printed in capitals: "I. ВНЕОБОРОТНЫЕ АКТИВЫ".
fn is_section_heading(label: &str) -> bool {
    label.chars().any(char::is_alphabetic) && !label.chars().any(char::is_lowercase)
}
