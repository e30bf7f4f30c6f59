//! Edit/recompute controller.
//!
//! Every edit runs `Idle → Validating → Mutating → Recomputing → Notifying →
//! Idle` to completion before the next one starts. Requests that arrive in
//! the meantime (including follow-up edits an observer issues while being
//! notified) wait in a FIFO [`EditQueue`].

use crate::coefficients::{compute_coefficients, Coefficients};
use crate::config::AnalyticsConfig;
use crate::engine::{derive_row, derive_view, recompute_totals, DerivedView, RowDerivation};
use crate::error::{AnalyticsError, Result};
use crate::export::{build_export_sheet, SheetWriter};
use crate::schema::{Statement, StatementKind};
use crate::store::LineItemStore;
use crate::table_store::TableStore;
use crate::utils::parse_amount;
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Idle,
    Validating,
    Mutating,
    Recomputing,
    Notifying,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditRequest {
    pub kind: StatementKind,
    pub code: String,
    pub year: i32,
    pub raw_text: String,
}

impl EditRequest {
    pub fn new(
        kind: StatementKind,
        code: impl Into<String>,
        year: i32,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            year,
            raw_text: raw_text.into(),
        }
    }
}

/// Everything the presentation layer needs to refresh after a committed edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewUpdate {
    pub request: EditRequest,
    /// The value now stored for the edited cell (`None` = cleared).
    pub value: Option<f64>,
    /// The edited row derived for the edited year.
    pub row: RowDerivation,
    /// Totals rewritten for the edited year, in rollup order.
    pub totals: Vec<(String, f64)>,
    pub coefficients: Option<Coefficients>,
    /// The view for the year currently selected for this statement.
    pub view: DerivedView,
}

/// A refused edit. `committed_value` is what the cell should redisplay.
#[derive(Debug)]
pub struct EditRejection {
    pub request: EditRequest,
    pub error: AnalyticsError,
    pub committed_value: Option<f64>,
}

pub type EditOutcome = std::result::Result<ViewUpdate, EditRejection>;

/// An edit that passed validation and is ready to be written.
struct ValidatedEdit {
    committed_value: Option<f64>,
    value: Option<f64>,
    view_year: i32,
}

#[derive(Debug, Default)]
pub struct EditQueue {
    pending: VecDeque<EditRequest>,
}

impl EditQueue {
    pub fn push(&mut self, request: EditRequest) {
        self.pending.push_back(request);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn pop(&mut self) -> Option<EditRequest> {
        self.pending.pop_front()
    }
}

/// Presentation-side receiver of controller notifications. The queue handle
/// lets an observer schedule follow-up edits; they run after the current one.
pub trait ViewObserver {
    fn view_refreshed(&mut self, update: &ViewUpdate, queue: &mut EditQueue);

    fn edit_rejected(&mut self, _rejection: &EditRejection, _queue: &mut EditQueue) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ViewObserver for NoopObserver {
    fn view_refreshed(&mut self, _update: &ViewUpdate, _queue: &mut EditQueue) {}
}

pub struct EditController<O: ViewObserver = NoopObserver> {
    store: LineItemStore,
    config: AnalyticsConfig,
    selected_years: BTreeMap<StatementKind, i32>,
    state: ControllerState,
    queue: EditQueue,
    observer: O,
}

impl EditController<NoopObserver> {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self::with_observer(config, NoopObserver)
    }
}

impl<O: ViewObserver> EditController<O> {
    pub fn with_observer(config: AnalyticsConfig, observer: O) -> Self {
        Self {
            store: LineItemStore::new(),
            config,
            selected_years: BTreeMap::new(),
            state: ControllerState::Idle,
            queue: EditQueue::default(),
            observer,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn store(&self) -> &LineItemStore {
        &self.store
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Installs a statement, replacing any statement of the same kind. The
    /// selected year resets to the statement's latest year.
    pub fn load(&mut self, statement: Statement) {
        let kind = statement.kind();
        match statement.max_year() {
            Some(year) => {
                self.selected_years.insert(kind, year);
            }
            None => {
                self.selected_years.remove(&kind);
            }
        }
        self.store.insert(statement);
    }

    /// Replaces the statement with the one held by `table_store`. On failure
    /// the in-memory statement is left as it was.
    pub fn load_from(&mut self, table_store: &dyn TableStore, kind: StatementKind) -> Result<()> {
        match table_store.load(kind) {
            Ok(statement) => {
                self.load(statement);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load {} statement: {}", kind, e);
                Err(e)
            }
        }
    }

    pub fn save_to(&self, table_store: &mut dyn TableStore, kind: StatementKind) -> Result<()> {
        let statement = self.store.get(kind)?;
        table_store.save(kind, statement).inspect_err(|e| {
            warn!("Failed to save {} statement: {}", kind, e);
        })?;
        info!("Saved {} statement", kind);
        Ok(())
    }

    pub fn selected_year(&self, kind: StatementKind) -> Result<i32> {
        self.store.get(kind)?;
        self.selected_years
            .get(&kind)
            .copied()
            .ok_or_else(|| AnalyticsError::NotFound(format!("years in {} statement", kind)))
    }

    pub fn select_year(&mut self, kind: StatementKind, year: i32) -> Result<DerivedView> {
        let view = derive_view(self.store.get(kind)?, year)?;
        self.selected_years.insert(kind, year);
        debug!("Selected {} for {} statement", year, kind);
        Ok(view)
    }

    pub fn current_view(&self, kind: StatementKind) -> Result<DerivedView> {
        let year = self.selected_year(kind)?;
        derive_view(self.store.get(kind)?, year)
    }

    /// Coefficients for the selected year, when the statement supports them.
    pub fn coefficients(&self, kind: StatementKind) -> Result<Option<Coefficients>> {
        let year = self.selected_year(kind)?;
        let statement = self.store.get(kind)?;
        Ok(compute_coefficients(
            statement,
            &self.config.coefficient_ratios,
            year,
        ))
    }

    /// Writes the selected-year view of `kind`. Writer failures are returned
    /// and leave the statement untouched.
    pub fn export(&self, kind: StatementKind, writer: &mut dyn SheetWriter) -> Result<()> {
        let view = self.current_view(kind)?;
        let sheet = build_export_sheet(&view, &self.config);
        writer.write_sheet(&sheet).inspect_err(|e| {
            warn!("Export of {} statement failed: {}", kind, e);
        })
    }

    /// Queues an edit without processing it.
    pub fn enqueue(&mut self, request: EditRequest) {
        self.queue.push(request);
    }

    /// Queues an edit and processes the queue.
    pub fn submit(&mut self, request: EditRequest) -> Vec<EditOutcome> {
        self.enqueue(request);
        self.process_pending()
    }

    /// Processes queued edits strictly in arrival order, each to completion.
    pub fn process_pending(&mut self) -> Vec<EditOutcome> {
        if self.state != ControllerState::Idle {
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        while let Some(request) = self.queue.pop() {
            outcomes.push(self.process(request));
        }
        outcomes
    }

    fn transition(&mut self, next: ControllerState) {
        trace!("controller: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn process(&mut self, request: EditRequest) -> EditOutcome {
        let outcome = self.apply(request);

        if let Err(rejection) = &outcome {
            warn!(
                "Rejected edit of {} {} [{}] '{}': {}",
                rejection.request.kind,
                rejection.request.code,
                rejection.request.year,
                rejection.request.raw_text,
                rejection.error
            );
            self.transition(ControllerState::Notifying);
            self.observer.edit_rejected(rejection, &mut self.queue);
        }

        self.transition(ControllerState::Idle);
        outcome
    }

    fn apply(&mut self, request: EditRequest) -> EditOutcome {
        self.transition(ControllerState::Validating);

        let ValidatedEdit {
            committed_value,
            value,
            view_year,
        } = match self.validate(&request) {
            Ok(validated) => validated,
            Err((error, committed_value)) => {
                return Err(EditRejection {
                    request,
                    error,
                    committed_value,
                })
            }
        };

        self.transition(ControllerState::Mutating);
        if let Err(error) =
            self.store
                .set_raw_value(request.kind, &request.code, request.year, value)
        {
            let error = match error {
                AnalyticsError::Validation { code, .. } => AnalyticsError::ReadOnlyCell {
                    code,
                    year: request.year,
                },
                other => other,
            };
            return Err(EditRejection {
                request,
                error,
                committed_value,
            });
        }

        self.transition(ControllerState::Recomputing);
        let update = match self.recompute(&request, value, view_year) {
            Ok(update) => update,
            Err(error) => {
                return Err(EditRejection {
                    request,
                    error,
                    committed_value: value,
                })
            }
        };

        self.transition(ControllerState::Notifying);
        self.observer.view_refreshed(&update, &mut self.queue);

        Ok(update)
    }

    /// On failure returns the error and the value the cell should fall back to.
    fn validate(
        &self,
        request: &EditRequest,
    ) -> std::result::Result<ValidatedEdit, (AnalyticsError, Option<f64>)> {
        let item = self
            .store
            .find_by_code(request.kind, &request.code)
            .map_err(|e| (e, None))?;
        let committed_value = item.value(request.year);
        let fallback = |e| (e, committed_value);

        let view_year = self.selected_year(request.kind).map_err(fallback)?;
        let value = parse_amount(&request.raw_text, &self.config).map_err(fallback)?;

        Ok(ValidatedEdit {
            committed_value,
            value,
            view_year,
        })
    }

    fn recompute(
        &mut self,
        request: &EditRequest,
        value: Option<f64>,
        view_year: i32,
    ) -> Result<ViewUpdate> {
        let statement = self.store.get_mut(request.kind)?;

        let totals = if statement.descriptor().rollups.is_empty() {
            Vec::new()
        } else {
            recompute_totals(statement, request.year)
        };

        let min_year = statement.min_year();
        let row = statement
            .find(&request.code)
            .map(|item| derive_row(item, request.year, min_year))
            .unwrap_or_default();

        let coefficients =
            compute_coefficients(statement, &self.config.coefficient_ratios, request.year);

        let view = derive_view(statement, view_year)?;

        debug!(
            "Recomputed {} after {} [{}]: {} totals ({:?} affected), coefficients: {}",
            request.kind,
            request.code,
            request.year,
            totals.len(),
            statement.descriptor().dependent_totals(&request.code),
            coefficients.is_some()
        );

        Ok(ViewUpdate {
            request: request.clone(),
            value,
            row,
            totals,
            coefficients,
            view,
        })
    }
}
