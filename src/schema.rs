use crate::chart_of_accounts::StatementDescriptor;
use crate::error::{AnalyticsError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    #[schemars(description = "Balance sheet (form 1): assets, capital and liabilities")]
    Balance,

    #[schemars(description = "Profit and loss statement (form 2): revenue, expenses, results")]
    ProfitLoss,

    #[schemars(description = "Statement of changes in equity (form 3): capital movements")]
    Equity,

    #[schemars(description = "Production cost breakdown by cost element")]
    ProductionCosts,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        StatementKind::Balance,
        StatementKind::ProfitLoss,
        StatementKind::Equity,
        StatementKind::ProductionCosts,
    ];

    /// Stable key used by stores and file names.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::ProfitLoss => "profit_loss",
            Self::Equity => "equity",
            Self::ProductionCosts => "production_costs",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Balance => "Balance Sheet",
            Self::ProfitLoss => "Profit and Loss",
            Self::Equity => "Changes in Equity",
            Self::ProductionCosts => "Production Costs",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StatementKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == s.trim())
            .ok_or_else(|| AnalyticsError::NotFound(format!("unknown statement key '{}'", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LineItem {
    #[schemars(description = "Line code from the statement form ('1110'); empty for sub-items")]
    #[serde(default)]
    pub code: String,

    #[schemars(description = "Parameter name as printed on the form")]
    pub label: String,

    #[schemars(description = "Value per fiscal year. A missing year means 'no data', not zero.")]
    #[serde(default)]
    pub values: BTreeMap<i32, f64>,

    #[schemars(description = "Name of the section this row belongs to, if any")]
    #[serde(default)]
    pub section: Option<String>,

    #[schemars(description = "Indented detail row ('in particular ...'); display only")]
    #[serde(default)]
    pub is_subitem: bool,
}

impl LineItem {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            values: BTreeMap::new(),
            section: None,
            is_subitem: false,
        }
    }

    pub fn with_value(mut self, year: i32, value: f64) -> Self {
        self.values.insert(year, value);
        self
    }

    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn subitem(mut self) -> Self {
        self.is_subitem = true;
        self
    }

    pub fn value(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }

    /// True when every recorded value is zero (or there are none at all).
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| *v == 0.0)
    }
}

/// A run of consecutive items sharing the same `section` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: Option<String>,
    pub items: Range<usize>,
}

/// Serialised form of a [`Statement`]; sections are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "Statement")]
struct StatementParts {
    #[schemars(description = "Statement form")]
    kind: StatementKind,

    #[schemars(description = "Fiscal years covered. Years found in item values are added on load.")]
    #[serde(default)]
    years: Vec<i32>,

    #[schemars(description = "Rows in form order; consecutive rows of one section form a group")]
    items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StatementParts")]
pub struct Statement {
    kind: StatementKind,
    years: BTreeSet<i32>,
    items: Vec<LineItem>,
    #[serde(skip)]
    sections: Vec<Section>,
}

impl Statement {
    /// Builds a statement, materialising its section groups. Years found in
    /// item values are added to `years`.
    pub fn new(
        kind: StatementKind,
        years: impl IntoIterator<Item = i32>,
        items: Vec<LineItem>,
    ) -> Result<Self> {
        let mut years: BTreeSet<i32> = years.into_iter().collect();
        years.extend(items.iter().flat_map(|item| item.values.keys().copied()));

        validate_items(kind, &items)?;

        let sections = group_sections(&items);
        Ok(Self {
            kind,
            years,
            items,
            sections,
        })
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static StatementDescriptor {
        StatementDescriptor::for_kind(self.kind)
    }

    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn min_year(&self) -> Option<i32> {
        self.years.first().copied()
    }

    pub fn max_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_items(&self, section: &Section) -> &[LineItem] {
        &self.items[section.items.clone()]
    }

    pub fn find(&self, code: &str) -> Option<&LineItem> {
        if code.is_empty() {
            return None;
        }
        self.items.iter().find(|item| item.code == code)
    }

    pub(crate) fn find_mut(&mut self, code: &str) -> Option<&mut LineItem> {
        if code.is_empty() {
            return None;
        }
        self.items.iter_mut().find(|item| item.code == code)
    }

    pub fn is_total(&self, code: &str) -> bool {
        self.descriptor().is_total(code)
    }

    /// JSON schema of the serialised statement, as read and written by
    /// [`JsonFileStore`](crate::table_store::JsonFileStore).
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementParts)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

impl TryFrom<StatementParts> for Statement {
    type Error = AnalyticsError;

    fn try_from(parts: StatementParts) -> Result<Self> {
        Statement::new(parts.kind, parts.years, parts.items)
    }
}

fn validate_items(kind: StatementKind, items: &[LineItem]) -> Result<()> {
    let descriptor = StatementDescriptor::for_kind(kind);
    let mut seen: HashSet<&str> = HashSet::new();

    for item in items {
        if let Some((year, value)) = item.values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnalyticsError::Validation {
                code: item.code.clone(),
                details: format!("non-finite value {} for year {}", value, year),
            });
        }

        if item.code.is_empty() {
            continue;
        }

        if !seen.insert(item.code.as_str()) {
            let details = if descriptor.is_total(&item.code) {
                format!("total code appears more than once in the {} statement", kind)
            } else {
                format!("code appears more than once in the {} statement", kind)
            };
            return Err(AnalyticsError::Validation {
                code: item.code.clone(),
                details,
            });
        }
    }

    Ok(())
}

fn group_sections(items: &[LineItem]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        match sections.last_mut() {
            Some(last) if last.name == item.section => last.items.end = idx + 1,
            _ => sections.push(Section {
                name: item.section.clone(),
                items: idx..idx + 1,
            }),
        }
    }

    sections
}
