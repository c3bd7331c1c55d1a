use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::aggregate::{self, AggregationWindow, GroupBy, Metric, TrendReport};
use crate::config::StoreConfig;
use crate::db::Database;
use crate::error::Result;
use crate::loader::{LoadMode, LoadSummary, Loader, TableCount};
use crate::models::{ActivityRecord, FoodEntry, MarkerRecord};
use crate::pipeline::{self, ExportSet, TransformReport};
use crate::reconcile::MergeCollision;
use crate::reports::{
    self, ActivitySummary, CalorieRow, CalorieSummary, DailySummary, DateSelection, FoodQuery,
    FoodSummary, MacroRow, MacroSummary, Report, WeightSummary,
};
use crate::transformed;

/// Outcome of transforming an export and loading it in one go.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub report: TransformReport,
    pub collisions: Vec<MergeCollision>,
    pub loads: Vec<LoadSummary>,
}

/// Entry point for callers that want the whole pipeline behind one handle.
pub struct HealthService {
    db: Database,
    config: StoreConfig,
}

impl HealthService {
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let db = Database::from_connection_string(&config.connection_string)?;
        Ok(Self { db, config })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    // --- Ingest ---

    pub fn transform(&self, export_dir: &Path) -> Result<ExportSet> {
        pipeline::transform_export(export_dir)
    }

    pub fn load(&self, set: &ExportSet) -> Result<Vec<LoadSummary>> {
        self.load_with_mode(set, LoadMode::from_config(&self.config))
    }

    pub fn load_with_mode(&self, set: &ExportSet, mode: LoadMode) -> Result<Vec<LoadSummary>> {
        Loader::new(&self.db, &self.config)?.load_export(set, mode)
    }

    /// Load a directory written by [`transformed::write_transformed`].
    pub fn load_transformed(&self, dir: &Path, mode: LoadMode) -> Result<Vec<LoadSummary>> {
        let set = transformed::read_transformed(dir)?;
        self.load_with_mode(&set, mode)
    }

    /// Transform `export_dir` and load it using the configured mode.
    pub fn sync_export(&self, export_dir: &Path) -> Result<SyncOutcome> {
        let set = self.transform(export_dir)?;
        let loads = self.load(&set)?;
        Ok(SyncOutcome {
            collisions: set.collisions().cloned().collect(),
            report: set.report,
            loads,
        })
    }

    pub fn table_counts(&self) -> Result<Vec<TableCount>> {
        crate::loader::table_counts(&self.db)
    }

    // --- Queries ---

    pub fn selection(
        &self,
        date: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<DateSelection> {
        DateSelection::from_args(date, start_date, end_date, Self::today())
    }

    pub fn optional_selection(
        &self,
        date: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Option<DateSelection>> {
        DateSelection::optional(date, start_date, end_date, Self::today())
    }

    /// Metrics and dates are validated before the store is touched.
    pub fn trends<M: AsRef<str>>(
        &self,
        start_date: &str,
        end_date: &str,
        metrics: &[M],
        group_by: GroupBy,
    ) -> Result<TrendReport> {
        let metrics = metrics
            .iter()
            .map(|m| m.as_ref().parse::<Metric>())
            .collect::<Result<Vec<_>>>()?;
        let window = AggregationWindow::from_external(start_date, end_date, group_by, Self::today())?;
        aggregate::aggregate(&self.db, &metrics, &window)
    }

    pub fn weight(&self, selection: &DateSelection) -> Result<Report<MarkerRecord, WeightSummary>> {
        reports::weight_report(&self.db, selection)
    }

    pub fn calories(&self, selection: &DateSelection) -> Result<Report<CalorieRow, CalorieSummary>> {
        reports::calories_report(&self.db, selection)
    }

    pub fn activity(&self, selection: &DateSelection) -> Result<Report<ActivityRecord, ActivitySummary>> {
        reports::activity_report(&self.db, selection)
    }

    pub fn macros(&self, selection: &DateSelection) -> Result<Report<MacroRow, MacroSummary>> {
        reports::macros_report(&self.db, selection)
    }

    pub fn food_logs(&self, query: &FoodQuery) -> Result<Report<FoodEntry, FoodSummary>> {
        reports::food_logs(&self.db, query)
    }

    pub fn daily_summary(&self, date: &str) -> Result<DailySummary> {
        let day = crate::dates::parse_external(date, Self::today())?;
        reports::daily_summary(&self.db, day)
    }
}
