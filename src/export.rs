//! Spreadsheet export.
//!
//! [`build_export_sheet`] turns a derived view into a codec-neutral
//! [`ExportSheet`]: fixed headers, merged section rows, number format and
//! deviation fills. A [`SheetWriter`] renders it; [`CsvSheetWriter`] is the
//! built-in one and keeps values but drops styling.

use crate::config::AnalyticsConfig;
use crate::engine::DerivedView;
use crate::error::{AnalyticsError, Result};
use crate::utils::format_optional;
use log::debug;
use serde::Serialize;
use std::io::Write;

pub const EXPORT_HEADERS: [&str; 5] = [
    "Parameter",
    "Current Year",
    "Previous Year",
    "Growth Rate %",
    "Absolute Deviation",
];

pub const NUMBER_FORMAT: &str = "#,##0.00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviationFill {
    Negative,
    NonNegative,
}

impl DeviationFill {
    pub fn for_value(deviation: f64) -> Self {
        if deviation < 0.0 {
            Self::Negative
        } else {
            Self::NonNegative
        }
    }

    pub fn rgb(&self) -> &'static str {
        match self {
            Self::Negative => "#F8CBAD",
            Self::NonNegative => "#C6EFCE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExportRow {
    /// Styled heading merged across `span` columns.
    Section { title: String, span: usize },
    Item {
        label: String,
        indent: bool,
        bold: bool,
        current: Option<f64>,
        previous: Option<f64>,
        growth_rate: Option<f64>,
        absolute_deviation: Option<f64>,
        deviation_fill: Option<DeviationFill>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSheet {
    pub name: String,
    pub year: i32,
    pub headers: [&'static str; 5],
    pub number_format: &'static str,
    pub absent_marker: String,
    pub rows: Vec<ExportRow>,
}

pub fn build_export_sheet(view: &DerivedView, config: &AnalyticsConfig) -> ExportSheet {
    let mut rows = Vec::new();

    for section in &view.sections {
        if let Some(title) = &section.name {
            rows.push(ExportRow::Section {
                title: title.clone(),
                span: EXPORT_HEADERS.len(),
            });
        }

        for row in &section.rows {
            let values = row.values;
            rows.push(ExportRow::Item {
                label: row.label.clone(),
                indent: row.is_subitem,
                bold: row.is_total,
                current: values.current,
                previous: values.previous,
                growth_rate: values.growth_rate,
                absolute_deviation: values.absolute_deviation,
                deviation_fill: values.absolute_deviation.map(DeviationFill::for_value),
            });
        }
    }

    ExportSheet {
        name: view.kind.title().to_string(),
        year: view.year,
        headers: EXPORT_HEADERS,
        number_format: NUMBER_FORMAT,
        absent_marker: config.display_marker().to_string(),
        rows,
    }
}

pub trait SheetWriter {
    fn write_sheet(&mut self, sheet: &ExportSheet) -> Result<()>;
}

pub struct CsvSheetWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSheetWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(true).from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| AnalyticsError::IoError(e.into_error()))
    }
}

impl<W: Write> SheetWriter for CsvSheetWriter<W> {
    fn write_sheet(&mut self, sheet: &ExportSheet) -> Result<()> {
        self.writer.write_record(sheet.headers)?;

        for row in &sheet.rows {
            match row {
                ExportRow::Section { title, span } => {
                    let mut record = vec![title.clone()];
                    record.resize(*span, String::new());
                    self.writer.write_record(&record)?;
                }
                ExportRow::Item {
                    label,
                    indent,
                    current,
                    previous,
                    growth_rate,
                    absolute_deviation,
                    ..
                } => {
                    let label = if *indent {
                        format!("  {}", label)
                    } else {
                        label.clone()
                    };
                    self.writer.write_record([
                        label,
                        format_optional(*current, &sheet.absent_marker),
                        format_optional(*previous, &sheet.absent_marker),
                        format_optional(*growth_rate, &sheet.absent_marker),
                        format_optional(*absolute_deviation, &sheet.absent_marker),
                    ])?;
                }
            }
        }

        self.writer.flush()?;
        debug!("Wrote sheet '{}' ({} rows)", sheet.name, sheet.rows.len());
        Ok(())
    }
}
