//! Static catalogue of the supported statement forms.
//!
//! Every statement kind is described by one [`StatementDescriptor`]: how its
//! sheet is laid out in a workbook, which rows are rollup totals of which
//! members, and whether (and from which rows) solvency coefficients are
//! computed. The rest of the crate is generic over this table.

use crate::schema::StatementKind;

/// One value column of a statement sheet. `year_offset` is relative to the
/// reporting year: 0 for the reporting year, -1 for the year before, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueColumn {
    pub column: usize,
    pub year_offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub sheet_name: &'static str,
    /// Rows above the first record (titles, column headers).
    pub header_rows: usize,
    pub label_column: usize,
    pub code_column: usize,
    pub value_columns: &'static [ValueColumn],
}

/// A total row and the rows it sums. Members may themselves be totals listed
/// earlier in the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    pub total: &'static str,
    pub members: &'static [&'static str],
}

/// Rows feeding the K1/K2/liquidity coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientSource {
    pub asset_code: &'static str,
    pub liability_codes: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementDescriptor {
    pub kind: StatementKind,
    pub layout: SheetLayout,
    pub rollups: &'static [Rollup],
    pub coefficients: Option<CoefficientSource>,
}

const DESCENDING_YEARS: &[ValueColumn] = &[
    ValueColumn { column: 2, year_offset: 0 },
    ValueColumn { column: 3, year_offset: -1 },
    ValueColumn { column: 4, year_offset: -2 },
];

const ASCENDING_YEARS: &[ValueColumn] = &[
    ValueColumn { column: 2, year_offset: -2 },
    ValueColumn { column: 3, year_offset: -1 },
    ValueColumn { column: 4, year_offset: 0 },
];

static BALANCE: StatementDescriptor = StatementDescriptor {
    kind: StatementKind::Balance,
    layout: SheetLayout {
        sheet_name: "Баланс",
        header_rows: 4,
        label_column: 0,
        code_column: 1,
        value_columns: DESCENDING_YEARS,
    },
    rollups: &[
        Rollup {
            total: "1100",
            members: &["1110", "1120", "1130", "1140", "1150", "1160", "1170", "1180", "1190"],
        },
        Rollup {
            total: "1200",
            members: &["1210", "1220", "1230", "1240", "1250", "1260"],
        },
        Rollup {
            total: "1600",
            members: &["1100", "1200"],
        },
        Rollup {
            total: "1300",
            members: &["1310", "1320", "1340", "1350", "1360", "1370"],
        },
        Rollup {
            total: "1400",
            members: &["1410", "1420", "1430", "1450"],
        },
        Rollup {
            total: "1500",
            members: &["1510", "1520", "1530", "1540", "1550"],
        },
        Rollup {
            total: "1700",
            members: &["1300", "1400", "1500"],
        },
    ],
    coefficients: Some(CoefficientSource {
        asset_code: "1600",
        liability_codes: &[
            "1410", "1420", "1430", "1450", "1510", "1520", "1530", "1540", "1550",
        ],
    }),
};

// Expense lines are recorded as negative numbers, the way the form prints
// them in parentheses, so every rollup is a plain sum.
static PROFIT_LOSS: StatementDescriptor = StatementDescriptor {
    kind: StatementKind::ProfitLoss,
    layout: SheetLayout {
        sheet_name: "Отчет о фин. результатах",
        header_rows: 3,
        label_column: 1,
        code_column: 0,
        value_columns: ASCENDING_YEARS,
    },
    rollups: &[
        Rollup {
            total: "2100",
            members: &["2110", "2120"],
        },
        Rollup {
            total: "2200",
            members: &["2100", "2210", "2220"],
        },
        Rollup {
            total: "2300",
            members: &["2200", "2310", "2320", "2330", "2340", "2350"],
        },
        Rollup {
            total: "2400",
            members: &["2300", "2410", "2430", "2450", "2460"],
        },
    ],
    coefficients: None,
};

static EQUITY: StatementDescriptor = StatementDescriptor {
    kind: StatementKind::Equity,
    layout: SheetLayout {
        sheet_name: "Отчет об изм. капитала",
        header_rows: 4,
        label_column: 0,
        code_column: 1,
        value_columns: ASCENDING_YEARS,
    },
    rollups: &[
        Rollup {
            total: "3210",
            members: &["3211", "3212", "3213", "3214", "3215", "3216"],
        },
        Rollup {
            total: "3220",
            members: &["3221", "3222", "3223", "3224", "3225", "3226", "3227"],
        },
        Rollup {
            total: "3300",
            members: &["3200", "3210", "3220", "3230", "3240"],
        },
    ],
    coefficients: Some(CoefficientSource {
        asset_code: "3300",
        liability_codes: &[
            "3211", "3212", "3213", "3214", "3215", "3216", "3221", "3222", "3223", "3224",
            "3225", "3226", "3227",
        ],
    }),
};

static PRODUCTION_COSTS: StatementDescriptor = StatementDescriptor {
    kind: StatementKind::ProductionCosts,
    layout: SheetLayout {
        sheet_name: "Затраты на производство",
        header_rows: 3,
        label_column: 0,
        code_column: 1,
        value_columns: DESCENDING_YEARS,
    },
    rollups: &[
        Rollup {
            total: "5660",
            members: &["5610", "5620", "5630", "5640", "5650"],
        },
        Rollup {
            total: "5600",
            members: &["5660", "5670", "5680"],
        },
    ],
    coefficients: None,
};

impl StatementDescriptor {
    pub fn for_kind(kind: StatementKind) -> &'static StatementDescriptor {
        match kind {
            StatementKind::Balance => &BALANCE,
            StatementKind::ProfitLoss => &PROFIT_LOSS,
            StatementKind::Equity => &EQUITY,
            StatementKind::ProductionCosts => &PRODUCTION_COSTS,
        }
    }

    pub fn is_total(&self, code: &str) -> bool {
        !code.is_empty() && self.rollups.iter().any(|r| r.total == code)
    }

    /// Totals whose value changes when `code` changes, including totals of
    /// totals, in rollup-table order.
    pub fn dependent_totals(&self, code: &str) -> Vec<&'static str> {
        let mut affected: Vec<&'static str> = Vec::new();

        for rollup in self.rollups {
            let touches = rollup
                .members
                .iter()
                .any(|m| *m == code || affected.contains(m));
            if touches {
                affected.push(rollup.total);
            }
        }

        affected
    }
}
