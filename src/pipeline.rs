//! Pipeline runner.
//!
//! Wires the stages of one run: load, aggregate (three sources
//! concurrently), combine, window, merge. A failed run leaves the fact
//! table at its last committed state and reports the stage it failed in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, Span};
use uuid::Uuid;

use crate::combine::{combine, CombineError};
use crate::config::{ConfigError, RunConfig, RunMode, SourcesConfig};
use crate::export::{export_fact_table, ExportError};
use crate::interfaces::{FactTable, MergeOutcome, StorageError};
use crate::model::{
    LeadAggregate, LeadEvent, OrderAggregate, OrderEvent, WebAggregate, WebEvent,
};
use crate::sources::{
    aggregate, load_leads, load_orders, load_web, AggregateStats, Aggregated, Leads, Orders,
    SourceAggregator, SourceError, Web,
};
use crate::window::WindowSelector;
use crate::writer::MergeWriter;

/// Pipeline stage, as reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Aggregate,
    Combine,
    Window,
    Merge,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Aggregate => "aggregate",
            Stage::Combine => "combine",
            Stage::Window => "window",
            Stage::Merge => "merge",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a failed run.
#[derive(Debug, thiserror::Error)]
pub enum RunFailure {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Aggregation task failed: {0}")]
    Task(#[from] JoinError),
}

/// A failed run: where it failed and how many keys were affected.
#[derive(Debug, thiserror::Error)]
#[error("Run failed in {stage} stage ({affected_keys} keys affected): {cause}")]
pub struct RunError {
    pub stage: Stage,
    pub affected_keys: usize,
    #[source]
    pub cause: RunFailure,
}

impl RunError {
    pub fn new(stage: Stage, affected_keys: usize, cause: impl Into<RunFailure>) -> Self {
        Self {
            stage,
            affected_keys,
            cause: cause.into(),
        }
    }
}

/// Raw events for one run, one sequence per source kind.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub orders: Vec<OrderEvent>,
    pub leads: Vec<LeadEvent>,
    pub web: Vec<WebEvent>,
}

/// Summary of a committed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub as_of_date: NaiveDate,
    /// First date inside the incremental window.
    pub cutoff: Option<NaiveDate>,
    /// Per-source counters, in orders/leads/web order.
    pub sources: [AggregateStats; 3],
    /// Keys in the union of the three sources.
    pub combined: usize,
    /// Rows handed to the writer.
    pub candidates: usize,
    /// Combined rows left out by the window.
    pub excluded: usize,
    pub outcome: MergeOutcome,
}

struct SourceAggregates {
    orders: Aggregated<OrderAggregate>,
    leads: Aggregated<LeadAggregate>,
    web: Aggregated<WebAggregate>,
}

/// Runs the pipeline against one fact table.
#[derive(Clone)]
pub struct Pipeline {
    writer: MergeWriter,
}

impl Pipeline {
    pub fn new(table: Arc<dyn FactTable>) -> Self {
        Self {
            writer: MergeWriter::new(table),
        }
    }

    pub fn table(&self) -> &Arc<dyn FactTable> {
        self.writer.table()
    }

    /// Run over events already in memory.
    #[tracing::instrument(name = "pipeline.run", skip_all, fields(mode = ?config.mode))]
    pub async fn run(&self, batch: SourceBatch, config: &RunConfig) -> Result<RunReport, RunError> {
        config
            .validate()
            .map_err(|e| RunError::new(Stage::Window, 0, e))?;

        let SourceBatch { orders, leads, web } = batch;
        let aggregates = aggregate_sources(
            move || Ok(orders),
            move || Ok(leads),
            move || Ok(web),
        )
        .await?;

        self.merge(aggregates, config).await
    }

    /// Load the staged source files, then run over their events.
    #[tracing::instrument(name = "pipeline.run", skip_all, fields(mode = ?config.mode))]
    pub async fn run_from_sources(
        &self,
        sources: &SourcesConfig,
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        config
            .validate()
            .map_err(|e| RunError::new(Stage::Window, 0, e))?;

        let (orders, leads, web) = (
            sources.orders.clone(),
            sources.leads.clone(),
            sources.web.clone(),
        );
        let aggregates = aggregate_sources(
            move || load_orders(&orders),
            move || load_leads(&leads),
            move || load_web(&web),
        )
        .await?;

        self.merge(aggregates, config).await
    }

    /// Write the committed fact table to `dir` as CSV.
    pub async fn export(&self, dir: &Path) -> Result<PathBuf, RunError> {
        export_fact_table(self.table().as_ref(), dir)
            .await
            .map_err(|e| RunError::new(Stage::Export, 0, e))
    }

    async fn merge(
        &self,
        aggregates: SourceAggregates,
        config: &RunConfig,
    ) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let as_of_date = config.as_of();
        let SourceAggregates { orders, leads, web } = aggregates;
        let sources = [orders.stats, leads.stats, web.stats];

        let combined = combine(orders.rows, leads.rows, web.rows).map_err(|e| {
            error!(%run_id, error = %e, "Combine failed");
            RunError::new(Stage::Combine, e.affected_keys(), e)
        })?;
        let combined_count = combined.len();

        let selection = WindowSelector::new(config.strategy(), as_of_date).select(combined);
        let candidates = selection.rows.len();

        let outcome = self
            .writer
            .apply(&selection.rows)
            .await
            .map_err(|e| RunError::new(Stage::Merge, candidates, e))?;

        info!(
            %run_id,
            %as_of_date,
            cutoff = ?selection.cutoff,
            combined = combined_count,
            candidates,
            excluded = selection.excluded,
            inserted = outcome.inserted,
            replaced = outcome.replaced,
            "Run committed"
        );

        Ok(RunReport {
            run_id,
            mode: config.mode,
            as_of_date,
            cutoff: selection.cutoff,
            sources,
            combined: combined_count,
            candidates,
            excluded: selection.excluded,
            outcome,
        })
    }
}

/// Load and aggregate one source on the blocking pool.
fn spawn_source<A, F>(load: F) -> JoinHandle<Result<Aggregated<A::Row>, SourceError>>
where
    A: SourceAggregator + 'static,
    A::Row: Send + 'static,
    F: FnOnce() -> Result<Vec<A::Event>, SourceError> + Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| load().map(aggregate::<A, _>)))
}

/// The three sources are independent; the combiner waits for all of them.
async fn aggregate_sources<FO, FL, FW>(
    orders: FO,
    leads: FL,
    web: FW,
) -> Result<SourceAggregates, RunError>
where
    FO: FnOnce() -> Result<Vec<OrderEvent>, SourceError> + Send + 'static,
    FL: FnOnce() -> Result<Vec<LeadEvent>, SourceError> + Send + 'static,
    FW: FnOnce() -> Result<Vec<WebEvent>, SourceError> + Send + 'static,
{
    let (orders, leads, web) = tokio::try_join!(
        spawn_source::<Orders, _>(orders),
        spawn_source::<Leads, _>(leads),
        spawn_source::<Web, _>(web),
    )
    .map_err(|e| RunError::new(Stage::Aggregate, 0, e))?;

    let load_failed = |e: SourceError| {
        error!(error = %e, "Source load failed");
        RunError::new(Stage::Load, 0, e)
    };

    Ok(SourceAggregates {
        orders: orders.map_err(load_failed)?,
        leads: leads.map_err(load_failed)?,
        web: web.map_err(load_failed)?,
    })
}
