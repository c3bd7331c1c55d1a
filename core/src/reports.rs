//! Point and range reports over the canonical tables.
//!
//! Every report takes external `MM/DD/YYYY` dates, validates them before any
//! I/O, binds every filter as a parameter, and returns external dates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{ActivityRecord, CalorieRecord, FoodEntry, MacroRecord, MarkerRecord, TableRow};
use crate::store::{SqlValue, Store};

pub const DEFAULT_FOOD_LIMIT: usize = 100;

/// A single day or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    Day(NaiveDate),
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateSelection {
    /// `date` wins when given; otherwise both range ends are required.
    pub fn from_args(
        date: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self> {
        Self::optional(date, start_date, end_date, today)?.ok_or_else(|| {
            Error::Validation("Must provide either date or both start_date and end_date".to_string())
        })
    }

    /// Like [`DateSelection::from_args`] but nothing at all is allowed. Half a
    /// range is still rejected.
    pub fn optional(
        date: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Option<Self>> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }
        match (present(date), present(start_date), present(end_date)) {
            (Some(d), _, _) => Ok(Some(DateSelection::Day(dates::parse_external(d, today)?))),
            (None, Some(s), Some(e)) => {
                let start = dates::parse_external(s, today)?;
                let end = dates::parse_external(e, today)?;
                if start > end {
                    return Err(Error::Validation(format!(
                        "start_date {s} is after end_date {e}"
                    )));
                }
                Ok(Some(DateSelection::Range { start, end }))
            }
            (None, None, None) => Ok(None),
            _ => Err(Error::Validation(
                "start_date and end_date must be given together".to_string(),
            )),
        }
    }
}

/// WHERE-clause builder that only ever emits positional placeholders.
#[derive(Default)]
struct Filter {
    conditions: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filter {
    fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    fn dates(&mut self, selection: &DateSelection) {
        let cond = match selection {
            DateSelection::Day(d) => format!("date = {}", self.bind(dates::to_key(*d))),
            DateSelection::Range { start, end } => {
                let lo = self.bind(dates::to_key(*start));
                let hi = self.bind(dates::to_key(*end));
                format!("date >= {lo} AND date <= {hi}")
            }
        };
        self.conditions.push(cond);
    }

    fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    fn clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

fn select<R: TableRow, S: Store + ?Sized>(store: &S, filter: &Filter, tail: &str) -> Result<Vec<R>> {
    let sql = format!(
        "SELECT {} FROM {}{}{tail}",
        R::TABLE.columns().join(", "),
        R::TABLE,
        filter.clause()
    );
    let result = store.query(&sql, &filter.params)?;
    Ok(result.rows.iter().map(|r| R::from_values(r)).collect())
}

#[allow(clippy::cast_precision_loss)]
fn avg(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

/// Rows plus a summary that is only computed for multi-record results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report<R, S> {
    pub records: Vec<R>,
    pub summary: Option<S>,
}

// --- Weight ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSummary {
    pub avg_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Last minus first recorded weight.
    pub weight_change: f64,
}

pub fn weight_report<S: Store + ?Sized>(
    store: &S,
    selection: &DateSelection,
) -> Result<Report<MarkerRecord, WeightSummary>> {
    let mut filter = Filter::default();
    filter.dates(selection);
    filter.push("(weight IS NOT NULL OR body_fat IS NOT NULL)".to_string());
    let mut records: Vec<MarkerRecord> = select(store, &filter, " ORDER BY date")?;

    let weights: Vec<f64> = records.iter().filter_map(|r| r.weight).collect();
    let summary = if records.len() > 1 && !weights.is_empty() {
        let (min_weight, max_weight) = min_max(&weights);
        Some(WeightSummary {
            avg_weight: avg(&weights).unwrap_or_default(),
            min_weight,
            max_weight,
            weight_change: weights[weights.len() - 1] - weights[0],
        })
    } else {
        None
    };

    for r in &mut records {
        r.date = dates::denormalize(&r.date);
    }
    Ok(Report { records, summary })
}

// --- Calories ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieRow {
    #[serde(flatten)]
    pub record: CalorieRecord,
    /// Food minus exercise, absent values counting as zero.
    pub net_calories: f64,
    /// Food minus budget, absent values counting as zero.
    pub surplus_deficit: f64,
}

impl From<CalorieRecord> for CalorieRow {
    fn from(record: CalorieRecord) -> Self {
        let food = record.food_calories.unwrap_or(0.0);
        let net_calories = food - record.exercise_calories.unwrap_or(0.0);
        let surplus_deficit = food - record.calorie_budget.unwrap_or(0.0);
        Self {
            record,
            net_calories,
            surplus_deficit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieSummary {
    pub avg_food_calories: f64,
    pub avg_net_calories: f64,
    pub total_surplus_deficit: f64,
    pub days_over_budget: usize,
    pub days_under_budget: usize,
}

pub fn calories_report<S: Store + ?Sized>(
    store: &S,
    selection: &DateSelection,
) -> Result<Report<CalorieRow, CalorieSummary>> {
    let mut filter = Filter::default();
    filter.dates(selection);
    let rows: Vec<CalorieRecord> = select(store, &filter, " ORDER BY date")?;
    let mut records: Vec<CalorieRow> = rows.into_iter().map(CalorieRow::from).collect();

    let logged: Vec<&CalorieRow> = records
        .iter()
        .filter(|r| r.record.food_calories.is_some())
        .collect();
    let summary = if records.len() > 1 && !logged.is_empty() {
        let food: Vec<f64> = logged.iter().filter_map(|r| r.record.food_calories).collect();
        let net: Vec<f64> = logged.iter().map(|r| r.net_calories).collect();
        let over = logged.iter().filter(|r| r.surplus_deficit > 0.0).count();
        Some(CalorieSummary {
            avg_food_calories: avg(&food).unwrap_or_default(),
            avg_net_calories: avg(&net).unwrap_or_default(),
            total_surplus_deficit: logged.iter().map(|r| r.surplus_deficit).sum(),
            days_over_budget: over,
            days_under_budget: logged.len() - over,
        })
    } else {
        None
    };

    for r in &mut records {
        r.record.date = dates::denormalize(&r.record.date);
    }
    Ok(Report { records, summary })
}

// --- Activity ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub avg_steps: Option<f64>,
    pub avg_sleep_hours: Option<f64>,
    pub total_exercise_minutes: f64,
    pub days_exercised: usize,
}

#[allow(clippy::cast_precision_loss)]
pub fn activity_report<S: Store + ?Sized>(
    store: &S,
    selection: &DateSelection,
) -> Result<Report<ActivityRecord, ActivitySummary>> {
    let mut filter = Filter::default();
    filter.dates(selection);
    let mut records: Vec<ActivityRecord> = select(store, &filter, " ORDER BY date")?;

    let summary = (records.len() > 1).then(|| {
        let steps: Vec<f64> = records.iter().filter_map(|r| r.steps).map(|s| s as f64).collect();
        let sleep: Vec<f64> = records.iter().filter_map(|r| r.sleep_hours).collect();
        let exercised: Vec<&ActivityRecord> = records
            .iter()
            .filter(|r| r.exercise_count.is_some_and(|c| c > 0))
            .collect();
        ActivitySummary {
            avg_steps: avg(&steps),
            avg_sleep_hours: avg(&sleep),
            total_exercise_minutes: exercised
                .iter()
                .map(|r| r.exercise_minutes.unwrap_or(0.0))
                .sum(),
            days_exercised: exercised.len(),
        }
    });

    for r in &mut records {
        r.date = dates::denormalize(&r.date);
    }
    Ok(Report { records, summary })
}

// --- Macros ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroRow {
    #[serde(flatten)]
    pub record: MacroRecord,
    pub protein_calories: Option<f64>,
    pub carb_calories: Option<f64>,
}

impl From<MacroRecord> for MacroRow {
    fn from(record: MacroRecord) -> Self {
        Self {
            protein_calories: record.protein_grams.map(|g| g * 4.0),
            carb_calories: record.carbs_grams.map(|g| g * 4.0),
            record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSummary {
    pub avg_protein: Option<f64>,
    pub avg_carbs: Option<f64>,
    pub avg_fiber: Option<f64>,
}

pub fn macros_report<S: Store + ?Sized>(
    store: &S,
    selection: &DateSelection,
) -> Result<Report<MacroRow, MacroSummary>> {
    let mut filter = Filter::default();
    filter.dates(selection);
    let rows: Vec<MacroRecord> = select(store, &filter, " ORDER BY date")?;
    let mut records: Vec<MacroRow> = rows.into_iter().map(MacroRow::from).collect();

    let any_logged = records
        .iter()
        .any(|r| r.record.protein_grams.is_some() || r.record.carbs_grams.is_some());
    let summary = if records.len() > 1 && any_logged {
        let values_of = |f: fn(&MacroRecord) -> Option<f64>| -> Vec<f64> {
            records.iter().filter_map(|r| f(&r.record)).collect()
        };
        Some(MacroSummary {
            avg_protein: avg(&values_of(|r| r.protein_grams)),
            avg_carbs: avg(&values_of(|r| r.carbs_grams)),
            avg_fiber: avg(&values_of(|r| r.fiber_grams)),
        })
    } else {
        None
    };

    for r in &mut records {
        r.record.date = dates::denormalize(&r.record.date);
    }
    Ok(Report { records, summary })
}

// --- Food logs ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodQuery {
    pub selection: Option<DateSelection>,
    /// Exact meal name.
    pub meal: Option<String>,
    /// Substring of the food name.
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodSummary {
    pub total_entries: usize,
    pub total_calories: f64,
    pub by_meal: BTreeMap<String, f64>,
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub fn food_logs<S: Store + ?Sized>(
    store: &S,
    query: &FoodQuery,
) -> Result<Report<FoodEntry, FoodSummary>> {
    let meal = query.meal.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if query.selection.is_none() && meal.is_none() && search.is_none() {
        return Err(Error::Validation(
            "Must provide date, date range, meal, or search criteria".to_string(),
        ));
    }
    let limit = query.limit.unwrap_or(DEFAULT_FOOD_LIMIT);
    if limit == 0 {
        return Err(Error::Validation("limit must be greater than 0".to_string()));
    }

    let mut filter = Filter::default();
    if let Some(selection) = &query.selection {
        filter.dates(selection);
    }
    if let Some(meal) = meal {
        let p = filter.bind(meal);
        filter.push(format!("meal = {p}"));
    }
    if let Some(search) = search {
        let p = filter.bind(format!("%{}%", escape_like(search)));
        filter.push(format!("food_name LIKE {p} ESCAPE '\\'"));
    }
    let limit_param = filter.bind(i64::try_from(limit).unwrap_or(i64::MAX));
    let mut records: Vec<FoodEntry> =
        select(store, &filter, &format!(" ORDER BY date, id LIMIT {limit_param}"))?;

    if records.is_empty() {
        return Ok(Report {
            records,
            summary: None,
        });
    }

    let mut by_meal: BTreeMap<String, f64> = BTreeMap::new();
    for r in &records {
        if !r.meal.is_empty() {
            *by_meal.entry(r.meal.clone()).or_default() += r.calories.unwrap_or(0.0);
        }
    }
    let summary = FoodSummary {
        total_entries: records.len(),
        total_calories: records.iter().filter_map(|r| r.calories).sum(),
        by_meal,
    };

    for r in &mut records {
        r.date = dates::denormalize(&r.date);
    }
    Ok(Report {
        records,
        summary: Some(summary),
    })
}

// --- Daily summary ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSection {
    pub weight: Option<f64>,
    pub body_fat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieSection {
    pub food_calories: Option<f64>,
    pub exercise_calories: Option<f64>,
    pub calorie_budget: Option<f64>,
    pub tdee: Option<f64>,
    pub net_calories: f64,
    pub surplus_deficit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySection {
    pub steps: Option<i64>,
    pub sleep_hours: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub exercise_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSection {
    pub protein_grams: Option<f64>,
    pub carbs_grams: Option<f64>,
    pub fiber_grams: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodDaySummary {
    pub total_items: i64,
    pub by_meal: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub markers: Option<MarkerSection>,
    pub calories: Option<CalorieSection>,
    pub activity: Option<ActivitySection>,
    pub macros: Option<MacroSection>,
    pub food_summary: Option<FoodDaySummary>,
}

fn one<R: TableRow, S: Store + ?Sized>(store: &S, day: NaiveDate) -> Result<Option<R>> {
    let mut filter = Filter::default();
    filter.dates(&DateSelection::Day(day));
    Ok(select::<R, S>(store, &filter, " LIMIT 1")?.into_iter().next())
}

pub fn daily_summary<S: Store + ?Sized>(store: &S, day: NaiveDate) -> Result<DailySummary> {
    let markers = one::<MarkerRecord, S>(store, day)?
        .filter(|m| m.weight.is_some() || m.body_fat.is_some())
        .map(|m| MarkerSection {
            weight: m.weight,
            body_fat: m.body_fat,
        });

    let calories = one::<CalorieRecord, S>(store, day)?
        .filter(|c| {
            c.food_calories.is_some()
                || c.exercise_calories.is_some()
                || c.calorie_budget.is_some()
                || c.tdee.is_some()
        })
        .map(|c| {
            let row = CalorieRow::from(c);
            CalorieSection {
                food_calories: row.record.food_calories,
                exercise_calories: row.record.exercise_calories,
                calorie_budget: row.record.calorie_budget,
                tdee: row.record.tdee,
                net_calories: row.net_calories,
                surplus_deficit: row.surplus_deficit,
            }
        });

    let activity = one::<ActivityRecord, S>(store, day)?
        .filter(|a| {
            a.steps.is_some()
                || a.sleep_hours.is_some()
                || a.exercise_minutes.is_some()
                || a.exercise_count.is_some()
        })
        .map(|a| ActivitySection {
            steps: a.steps,
            sleep_hours: a.sleep_hours,
            exercise_minutes: a.exercise_minutes,
            exercise_count: a.exercise_count,
        });

    let macros = one::<MacroRecord, S>(store, day)?
        .filter(|m| m.protein_grams.is_some() || m.carbs_grams.is_some() || m.fiber_grams.is_some())
        .map(|m| MacroSection {
            protein_grams: m.protein_grams,
            carbs_grams: m.carbs_grams,
            fiber_grams: m.fiber_grams,
        });

    let result = store.query(
        "SELECT meal, COUNT(*), SUM(calories) FROM food WHERE date = ?1 GROUP BY meal ORDER BY meal",
        &[dates::to_key(day).into()],
    )?;
    let mut total_items = 0;
    let mut by_meal = BTreeMap::new();
    for row in &result.rows {
        let meal = row.first().and_then(SqlValue::as_str).unwrap_or_default();
        total_items += row.get(1).and_then(SqlValue::as_i64).unwrap_or(0);
        by_meal.insert(
            meal.to_string(),
            row.get(2).and_then(SqlValue::as_f64).unwrap_or(0.0),
        );
    }
    let food_summary = (total_items > 0).then_some(FoodDaySummary {
        total_items,
        by_meal,
    });

    Ok(DailySummary {
        date: dates::to_external(day),
        markers,
        calories,
        activity,
        macros,
        food_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2024, 11, 30)
    }

    fn range(start: &str, end: &str) -> DateSelection {
        DateSelection::from_args(None, Some(start), Some(end), today()).unwrap()
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        for sql in [
            "INSERT INTO markers (date, weight, body_fat) VALUES
                ('2024-11-14', 181.0, NULL), ('2024-11-15', 180.2, 22.1), ('2024-11-16', 179.6, NULL),
                ('2024-11-17', NULL, NULL)",
            "INSERT INTO calories (date, food_calories, exercise_calories, calorie_budget, tdee) VALUES
                ('2024-11-15', 2100, 300, 2000, 2400), ('2024-11-16', 1800, NULL, 2000, 2400),
                ('2024-11-17', NULL, 200, 2000, NULL)",
            "INSERT INTO activity (date, steps, sleep_hours, exercise_minutes, exercise_count) VALUES
                ('2024-11-15', 8000, 7.0, 30, 1), ('2024-11-16', 10000, NULL, NULL, 0)",
            "INSERT INTO macros (date, protein_grams, carbs_grams, fiber_grams) VALUES
                ('2024-11-15', 100, 200, NULL), ('2024-11-16', 120, NULL, 30)",
            "INSERT INTO food (date, food_name, meal, calories, nutrients) VALUES
                ('2024-11-15', 'Eggs', 'Breakfast', 140, '{\"protein\":12}'),
                ('2024-11-15', 'Toast', 'Breakfast', 90, '{}'),
                ('2024-11-15', '100% Juice', 'Lunch', 110, '{}'),
                ('2024-11-16', 'Salad', 'Lunch', NULL, '{}')",
        ] {
            db.query(sql, &[]).unwrap();
        }
        db
    }

    #[test]
    fn test_selection_requires_date_or_full_range() {
        assert!(matches!(
            DateSelection::from_args(None, None, None, today()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            DateSelection::from_args(None, Some("11/01/2024"), None, today()),
            Err(Error::Validation(_))
        ));
        assert_eq!(
            DateSelection::from_args(Some("yesterday"), None, None, today()).unwrap(),
            DateSelection::Day(ymd(2024, 11, 29))
        );
        assert!(DateSelection::from_args(Some("2024-11-01"), None, None, today()).is_err());
        assert_eq!(DateSelection::optional(None, None, None, today()).unwrap(), None);
    }

    #[test]
    fn test_optional_selection_ignores_blank_arguments() {
        assert_eq!(DateSelection::optional(Some("  "), Some(""), None, today()).unwrap(), None);
        assert_eq!(
            DateSelection::optional(Some(" "), Some(" 11/01/2024 "), Some("11/03/2024"), today()).unwrap(),
            Some(DateSelection::Range {
                start: ymd(2024, 11, 1),
                end: ymd(2024, 11, 3),
            })
        );
        assert!(matches!(
            DateSelection::optional(None, Some("11/03/2024"), Some("11/01/2024"), today()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_weight_report() {
        let db = seeded();
        let report = weight_report(&db, &range("11/14/2024", "11/17/2024")).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0].date, "11/14/2024");
        let s = report.summary.unwrap();
        assert_eq!(s.min_weight, 179.6);
        assert_eq!(s.max_weight, 181.0);
        assert!((s.weight_change - (179.6 - 181.0)).abs() < 1e-9);
    }

    #[test]
    fn test_single_day_has_no_summary() {
        let db = seeded();
        let report = weight_report(&db, &DateSelection::Day(ymd(2024, 11, 15))).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].body_fat, Some(22.1));
        assert!(report.summary.is_none());
    }

    #[test]
    fn test_calories_report() {
        let db = seeded();
        let report = calories_report(&db, &range("11/15/2024", "11/17/2024")).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[0].net_calories, 1800.0);
        assert_eq!(report.records[0].surplus_deficit, 100.0);
        let s = report.summary.unwrap();
        assert_eq!(s.avg_food_calories, 1950.0);
        assert_eq!(s.total_surplus_deficit, -100.0);
        assert_eq!(s.days_over_budget, 1);
        assert_eq!(s.days_under_budget, 1);

        let json = serde_json::to_value(&report.records[0]).unwrap();
        assert_eq!(json["date"], "11/15/2024");
        assert_eq!(json["food_calories"], 2100.0);
    }

    #[test]
    fn test_activity_report() {
        let db = seeded();
        let report = activity_report(&db, &range("11/01/2024", "11/30/2024")).unwrap();
        let s = report.summary.unwrap();
        assert_eq!(s.avg_steps, Some(9000.0));
        assert_eq!(s.avg_sleep_hours, Some(7.0));
        assert_eq!(s.total_exercise_minutes, 30.0);
        assert_eq!(s.days_exercised, 1);
    }

    #[test]
    fn test_macros_report() {
        let db = seeded();
        let report = macros_report(&db, &range("11/15/2024", "11/16/2024")).unwrap();
        assert_eq!(report.records[0].protein_calories, Some(400.0));
        assert_eq!(report.records[1].carb_calories, None);
        let s = report.summary.unwrap();
        assert_eq!(s.avg_protein, Some(110.0));
        assert_eq!(s.avg_carbs, Some(200.0));
        assert_eq!(s.avg_fiber, Some(30.0));
    }

    #[test]
    fn test_food_logs_filters() {
        let db = seeded();
        let by_meal = food_logs(
            &db,
            &FoodQuery {
                meal: Some("Breakfast".into()),
                ..FoodQuery::default()
            },
        )
        .unwrap();
        assert_eq!(by_meal.records.len(), 2);
        let s = by_meal.summary.unwrap();
        assert_eq!(s.total_calories, 230.0);
        assert_eq!(s.by_meal["Breakfast"], 230.0);
        assert_eq!(by_meal.records[0].nutrients["protein"], 12.0);

        // '%' in the search text is literal
        let search = food_logs(
            &db,
            &FoodQuery {
                search: Some("100%".into()),
                ..FoodQuery::default()
            },
        )
        .unwrap();
        assert_eq!(search.records.len(), 1);
        assert_eq!(search.records[0].food_name, "100% Juice");
    }

    #[test]
    fn test_food_logs_limit_and_selection() {
        let db = seeded();
        let report = food_logs(
            &db,
            &FoodQuery {
                selection: Some(range("11/15/2024", "11/16/2024")),
                limit: Some(2),
                ..FoodQuery::default()
            },
        )
        .unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].date, "11/15/2024");
    }

    #[test]
    fn test_food_logs_requires_criteria() {
        let db = seeded();
        assert!(matches!(
            food_logs(&db, &FoodQuery::default()),
            Err(Error::Validation(_))
        ));
        let none = food_logs(
            &db,
            &FoodQuery {
                search: Some("pizza".into()),
                ..FoodQuery::default()
            },
        )
        .unwrap();
        assert!(none.records.is_empty());
        assert!(none.summary.is_none());
    }

    #[test]
    fn test_daily_summary() {
        let db = seeded();
        let s = daily_summary(&db, ymd(2024, 11, 15)).unwrap();
        assert_eq!(s.date, "11/15/2024");
        assert_eq!(s.markers.unwrap().weight, Some(180.2));
        assert_eq!(s.calories.unwrap().net_calories, 1800.0);
        assert_eq!(s.activity.unwrap().steps, Some(8000));
        let food = s.food_summary.unwrap();
        assert_eq!(food.total_items, 3);
        assert_eq!(food.by_meal["Lunch"], 110.0);

        let empty = daily_summary(&db, ymd(2024, 11, 17)).unwrap();
        assert!(empty.markers.is_none());
        assert!(empty.calories.is_some());
        assert!(empty.macros.is_none());
        assert!(empty.food_summary.is_none());
    }
}
