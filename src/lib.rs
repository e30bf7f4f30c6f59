//! # Statement Analytics
//!
//! Analytics core for Russian-format financial statements: balance sheet,
//! profit and loss, changes in equity and production costs.
//!
//! ## Core Concepts
//!
//! - **Line Items**: coded statement rows holding one value per fiscal year
//! - **Totals**: rows whose value is the sum of other rows; never edited directly
//! - **Derived View**: per-year growth rate and absolute deviation for every visible row
//! - **Coefficients**: solvency (K1, K2) and liquidity ratios for balance and equity statements
//! - **Controller**: serialises user edits through validate, mutate, recompute and notify
//!
//! ## Example
//!
//! ```rust
//! use statement_analytics::*;
//!
//! let statement = Statement::new(
//!     StatementKind::Balance,
//!     [2014, 2015],
//!     vec![
//!         LineItem::new("1150", "Основные средства")
//!             .with_value(2014, 1000.0)
//!             .with_value(2015, 1500.0),
//!         LineItem::new("1100", "Итого по разделу I"),
//!     ],
//! )
//! .unwrap();
//!
//! let mut controller = EditController::new(AnalyticsConfig::default());
//! controller.load(statement);
//!
//! let request = EditRequest::new(StatementKind::Balance, "1150", 2015, "2 000");
//! let outcomes = controller.submit(request);
//! let update = outcomes[0].as_ref().unwrap();
//! assert_eq!(update.view.row("1100").unwrap().values.current, Some(2000.0));
//! ```

pub mod chart_of_accounts;
pub mod coefficients;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod schema;
pub mod store;
pub mod table_store;
pub mod utils;

pub use chart_of_accounts::{
    CoefficientSource, Rollup, SheetLayout, StatementDescriptor, ValueColumn,
};
pub use coefficients::{compute_coefficients, CoefficientEngine, CoefficientInputs, Coefficients};
pub use config::{AnalyticsConfig, CoefficientRatios};
pub use controller::{
    ControllerState, EditController, EditOutcome, EditQueue, EditRejection, EditRequest,
    NoopObserver, ViewObserver, ViewUpdate,
};
pub use engine::{
    derive_row, derive_view, is_visible, recompute_totals, DerivedRow, DerivedSection,
    DerivedView, RowDerivation,
};
pub use error::{AnalyticsError, Result};
pub use export::{build_export_sheet, CsvSheetWriter, ExportRow, ExportSheet, SheetWriter};
pub use ingestion::*;
pub use schema::*;
pub use store::LineItemStore;
pub use table_store::{JsonFileStore, MemoryTableStore, TableStore};
pub use utils::{format_amount, format_optional, parse_amount};

use log::{debug, info};
use serde::Serialize;

/// Derived view and coefficients of one statement for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub view: DerivedView,
    /// `None` for statement kinds without a coefficient source.
    pub coefficients: Option<Coefficients>,
}

pub struct StatementAnalyzer;

impl StatementAnalyzer {
    /// Recomputes totals on a copy of `statement` and derives `year`.
    /// The input statement is left untouched.
    pub fn analyze(
        statement: &Statement,
        year: i32,
        config: &AnalyticsConfig,
    ) -> Result<AnalysisReport> {
        validate_year(statement, year)?;

        info!("Analyzing {} statement for {}", statement.kind(), year);

        let mut working = statement.clone();
        for y in working.years().clone() {
            let totals = recompute_totals(&mut working, y);
            debug!("Recomputed {} totals for {}", totals.len(), y);
        }

        let view = derive_view(&working, year)?;
        let coefficients = compute_coefficients(&working, &config.coefficient_ratios, year);

        Ok(AnalysisReport { view, coefficients })
    }
}

pub fn analyze_statement(
    statement: &Statement,
    year: i32,
    config: &AnalyticsConfig,
) -> Result<AnalysisReport> {
    StatementAnalyzer::analyze(statement, year, config)
}

fn validate_year(statement: &Statement, year: i32) -> Result<()> {
    if statement.years().contains(&year) {
        Ok(())
    } else {
        Err(AnalyticsError::NotFound(format!(
            "year {} in {} statement (known years: {:?})",
            year,
            statement.kind(),
            statement.years()
        )))
    }
}
