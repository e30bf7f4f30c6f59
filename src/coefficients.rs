use crate::chart_of_accounts::CoefficientSource;
use crate::config::CoefficientRatios;
use crate::error::{AnalyticsError, Result};
use crate::schema::Statement;
use crate::utils::safe_div;
use log::debug;
use serde::Serialize;

/// Solvency (K1, K2) and liquidity coefficients for one year.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coefficients {
    pub year: i32,
    pub k1: f64,
    pub k2: f64,
    pub liquidity: f64,
}

/// Intermediate aggregates behind a [`Coefficients`] value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CoefficientInputs {
    pub assets: f64,
    pub total_liabilities: f64,
    pub short_term_liabilities: f64,
    pub cash: f64,
    pub financial_investments: f64,
    pub non_overdue_liabilities: f64,
}

pub struct CoefficientEngine<'a> {
    source: &'a CoefficientSource,
    ratios: &'a CoefficientRatios,
}

impl<'a> CoefficientEngine<'a> {
    pub fn new(source: &'a CoefficientSource, ratios: &'a CoefficientRatios) -> Self {
        Self { source, ratios }
    }

    /// Engine for the statement's own coefficient source. Fails with
    /// `NotFound` when the statement kind carries no coefficients.
    pub fn for_statement(statement: &Statement, ratios: &'a CoefficientRatios) -> Result<Self> {
        let source = statement.descriptor().coefficients.as_ref().ok_or_else(|| {
            AnalyticsError::NotFound(format!(
                "coefficients for {} statement",
                statement.kind()
            ))
        })?;
        Ok(Self::new(source, ratios))
    }

    pub fn inputs(&self, statement: &Statement, year: i32) -> CoefficientInputs {
        let assets = statement
            .find(self.source.asset_code)
            .and_then(|item| item.value(year))
            .unwrap_or(0.0);

        let total_liabilities: f64 = self
            .source
            .liability_codes
            .iter()
            .filter_map(|code| statement.find(code).and_then(|item| item.value(year)))
            .map(f64::abs)
            .sum();

        CoefficientInputs {
            assets,
            total_liabilities,
            short_term_liabilities: total_liabilities * self.ratios.short_term_liabilities,
            cash: assets * self.ratios.cash,
            financial_investments: assets * self.ratios.financial_investments,
            non_overdue_liabilities: total_liabilities * self.ratios.non_overdue_liabilities,
        }
    }

    /// Never fails: every zero denominator yields a coefficient of 0.
    pub fn compute(&self, statement: &Statement, year: i32) -> Coefficients {
        let inputs = self.inputs(statement, year);

        let coefficients = Coefficients {
            year,
            k1: safe_div(inputs.total_liabilities, inputs.assets),
            k2: safe_div(inputs.non_overdue_liabilities, inputs.total_liabilities),
            liquidity: safe_div(
                inputs.cash + inputs.financial_investments,
                inputs.short_term_liabilities,
            ),
        };

        debug!(
            "{} coefficients [{}]: assets={} liabilities={} -> {:?}",
            statement.kind(),
            year,
            inputs.assets,
            inputs.total_liabilities,
            coefficients
        );

        coefficients
    }
}

/// Coefficients for `year` when the statement kind supports them.
pub fn compute_coefficients(
    statement: &Statement,
    ratios: &CoefficientRatios,
    year: i32,
) -> Option<Coefficients> {
    let source = statement.descriptor().coefficients.as_ref()?;
    Some(CoefficientEngine::new(source, ratios).compute(statement, year))
}
