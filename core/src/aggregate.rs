//! Multi-metric trend aggregation over the canonical tables.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{Field, Table};
use crate::store::{SqlValue, Store};

/// Relative change between half-window means that counts as a trend.
const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Weight,
    BodyFat,
    Calories,
    ExerciseCalories,
    CalorieBudget,
    Tdee,
    Steps,
    SleepHours,
    ExerciseMinutes,
    Protein,
    Carbs,
    Fiber,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Weight,
        Metric::BodyFat,
        Metric::Calories,
        Metric::ExerciseCalories,
        Metric::CalorieBudget,
        Metric::Tdee,
        Metric::Steps,
        Metric::SleepHours,
        Metric::ExerciseMinutes,
        Metric::Protein,
        Metric::Carbs,
        Metric::Fiber,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Metric::Weight => "weight",
            Metric::BodyFat => "body_fat",
            Metric::Calories => "calories",
            Metric::ExerciseCalories => "exercise_calories",
            Metric::CalorieBudget => "calorie_budget",
            Metric::Tdee => "tdee",
            Metric::Steps => "steps",
            Metric::SleepHours => "sleep_hours",
            Metric::ExerciseMinutes => "exercise_minutes",
            Metric::Protein => "protein",
            Metric::Carbs => "carbs",
            Metric::Fiber => "fiber",
        }
    }

    /// The stored column behind this metric.
    #[must_use]
    pub fn field(self) -> Field {
        match self {
            Metric::Weight => Field::Weight,
            Metric::BodyFat => Field::BodyFat,
            Metric::Calories => Field::FoodCalories,
            Metric::ExerciseCalories => Field::ExerciseCalories,
            Metric::CalorieBudget => Field::CalorieBudget,
            Metric::Tdee => Field::Tdee,
            Metric::Steps => Field::Steps,
            Metric::SleepHours => Field::SleepHours,
            Metric::ExerciseMinutes => Field::ExerciseMinutes,
            Metric::Protein => Field::ProteinGrams,
            Metric::Carbs => Field::CarbsGrams,
            Metric::Fiber => Field::FiberGrams,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownMetric(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
}

impl GroupBy {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GroupBy::Day => "day",
            GroupBy::Week => "week",
            GroupBy::Month => "month",
        }
    }

    /// Sortable period key and its display label.
    fn period(self, date: NaiveDate) -> (String, String) {
        match self {
            GroupBy::Day => (dates::to_key(date), dates::to_external(date)),
            GroupBy::Week => {
                let label = dates::iso_week_label(date);
                (label.clone(), label)
            }
            GroupBy::Month => {
                let label = dates::month_label(date);
                (label.clone(), label)
            }
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(GroupBy::Day),
            "week" => Ok(GroupBy::Week),
            "month" => Ok(GroupBy::Month),
            other => Err(Error::Validation(format!(
                "group_by must be day, week, or month (got '{other}')"
            ))),
        }
    }
}

/// Inclusive date range plus grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub group_by: GroupBy,
}

impl AggregationWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, group_by: GroupBy) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(format!(
                "start date {} is after end date {}",
                dates::to_external(start),
                dates::to_external(end)
            )));
        }
        Ok(Self {
            start,
            end,
            group_by,
        })
    }

    /// Build from `MM/DD/YYYY` (or `today`/`yesterday`) arguments.
    pub fn from_external(start: &str, end: &str, group_by: GroupBy, today: NaiveDate) -> Result<Self> {
        Self::new(
            dates::parse_external(start, today)?,
            dates::parse_external(end, today)?,
            group_by,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendStatistic {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Absent with fewer than two periods.
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPoint {
    pub period_label: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub period: GroupBy,
    pub data: Vec<PeriodPoint>,
    /// `None` for an empty window. A metric with no values maps to `None`.
    pub statistics: Option<BTreeMap<String, Option<TrendStatistic>>>,
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compare the mean of the first half of `values` with the second half. With
/// an odd count the middle value belongs to neither half.
#[must_use]
pub fn classify_trend(values: &[f64]) -> Option<Trend> {
    if values.len() < 2 {
        return None;
    }
    let half = values.len() / 2;
    let first = mean(&values[..half]);
    let second = mean(&values[values.len() - half..]);

    Some(if second > first * (1.0 + TREND_THRESHOLD) {
        Trend::Increasing
    } else if second < first * (1.0 - TREND_THRESHOLD) {
        Trend::Decreasing
    } else {
        Trend::Stable
    })
}

#[must_use]
pub fn statistic(values: &[f64]) -> Option<TrendStatistic> {
    if values.is_empty() {
        return None;
    }
    Some(TrendStatistic {
        avg: mean(values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        trend: classify_trend(values),
    })
}

fn dedup(metrics: &[Metric]) -> Vec<Metric> {
    let mut out: Vec<Metric> = Vec::with_capacity(metrics.len());
    for m in metrics {
        if !out.contains(m) {
            out.push(*m);
        }
    }
    out
}

/// Per-date values of `metrics` within the window, keyed by canonical date.
fn daily_values<S: Store + ?Sized>(
    store: &S,
    metrics: &[Metric],
    window: &AggregationWindow,
) -> Result<BTreeMap<NaiveDate, HashMap<Metric, f64>>> {
    let mut by_table: BTreeMap<Table, Vec<Metric>> = BTreeMap::new();
    for m in metrics {
        by_table.entry(m.field().table()).or_default().push(*m);
    }

    let bounds = [
        SqlValue::from(dates::to_key(window.start)),
        SqlValue::from(dates::to_key(window.end)),
    ];
    let mut days: BTreeMap<NaiveDate, HashMap<Metric, f64>> = BTreeMap::new();

    for (table, wanted) in by_table {
        let columns: Vec<&str> = wanted.iter().map(|m| m.field().column()).collect();
        let sql = format!(
            "SELECT date, {} FROM {table} WHERE date >= ?1 AND date <= ?2 ORDER BY date",
            columns.join(", ")
        );
        let result = store.query(&sql, &bounds)?;

        for row in &result.rows {
            let Some(key) = row.first().and_then(SqlValue::as_str) else {
                continue;
            };
            let Some(date) = dates::parse_key(key) else {
                tracing::warn!(table = %table, date = key, "skipping row with non-canonical date");
                continue;
            };
            for (idx, metric) in wanted.iter().enumerate() {
                if let Some(v) = row.get(idx + 1).and_then(SqlValue::as_f64) {
                    days.entry(date).or_default().insert(*metric, v);
                }
            }
        }
    }
    Ok(days)
}

/// Aggregate `metrics` over `window`.
///
/// Days where none of the requested metrics has a value do not exist for the
/// purpose of the means. An empty window is not an error.
pub fn aggregate<S: Store + ?Sized>(
    store: &S,
    metrics: &[Metric],
    window: &AggregationWindow,
) -> Result<TrendReport> {
    let metrics = dedup(metrics);
    if metrics.is_empty() {
        return Err(Error::Validation("at least one metric is required".to_string()));
    }

    let days = daily_values(store, &metrics, window)?;

    // period key -> (label, metric -> daily values)
    let mut periods: BTreeMap<String, (String, HashMap<Metric, Vec<f64>>)> = BTreeMap::new();
    for (date, values) in days {
        let (key, label) = window.group_by.period(date);
        let bucket = periods.entry(key).or_insert_with(|| (label, HashMap::new()));
        for (metric, v) in values {
            bucket.1.entry(metric).or_default().push(v);
        }
    }

    if periods.is_empty() {
        tracing::info!(group_by = %window.group_by, "no data in window");
        return Ok(TrendReport {
            period: window.group_by,
            data: Vec::new(),
            statistics: None,
        });
    }

    let data: Vec<PeriodPoint> = periods
        .into_values()
        .map(|(label, values)| PeriodPoint {
            period_label: label,
            values: metrics
                .iter()
                .map(|m| (m.name().to_string(), values.get(m).map(|v| mean(v))))
                .collect(),
        })
        .collect();

    let statistics = metrics
        .iter()
        .map(|m| {
            let series: Vec<f64> = data
                .iter()
                .filter_map(|p| p.values.get(m.name()).copied().flatten())
                .collect();
            (m.name().to_string(), statistic(&series))
        })
        .collect();

    tracing::debug!(periods = data.len(), metrics = metrics.len(), "aggregated window");
    Ok(TrendReport {
        period: window.group_by,
        data,
        statistics: Some(statistics),
    })
}
