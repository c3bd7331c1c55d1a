//! Field mapping: raw source rows to `(date, field, value)` triples.
//!
//! Transform mode maps each well-known export file onto fixed canonical
//! fields. Combine mode keeps every column, namespaced by the file it came
//! from.

use std::collections::BTreeMap;

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{Field, FoodEntry, Table};
use crate::source::{RawRow, SourceRows};

const DATE_ALIASES: &[&str] = &["date", "datetime", "timestamp", "created", "date created"];

/// Where a mapped value comes from within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    Column(&'static str),
    /// Every dated row contributes `1`.
    RowCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub extract: Extract,
    pub field: Field,
}

const fn col(name: &'static str, field: Field) -> ColumnMap {
    ColumnMap {
        extract: Extract::Column(name),
        field,
    }
}

/// A well-known export file and the canonical fields it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: &'static str,
    /// Accepted file names, first match wins.
    pub file_names: &'static [&'static str],
    pub table: Table,
    pub columns: &'static [ColumnMap],
}

/// Fixed source catalogue in processing order. Within a table, a later source
/// overwrites an earlier one on the same date and field.
pub const SOURCES: &[SourceSpec] = &[
    SourceSpec {
        id: "body-fat",
        file_names: &["body-fat.csv"],
        table: Table::Markers,
        columns: &[col("Value", Field::BodyFat)],
    },
    SourceSpec {
        id: "weights",
        file_names: &["weights.csv", "weight.csv"],
        table: Table::Markers,
        columns: &[col("Weight", Field::Weight)],
    },
    SourceSpec {
        id: "steps",
        file_names: &["steps.csv"],
        table: Table::Activity,
        columns: &[col("Value", Field::Steps)],
    },
    SourceSpec {
        id: "sleep",
        file_names: &["sleep.csv"],
        table: Table::Activity,
        columns: &[col("Value", Field::SleepHours)],
    },
    SourceSpec {
        id: "exercise-logs",
        file_names: &["exercise-logs.csv"],
        table: Table::Activity,
        columns: &[
            col("Quantity", Field::ExerciseMinutes),
            ColumnMap {
                extract: Extract::RowCount,
                field: Field::ExerciseCount,
            },
        ],
    },
    SourceSpec {
        id: "daily-calorie-summary",
        file_names: &["daily-calorie-summary.csv"],
        table: Table::Calories,
        columns: &[
            col("Food cals", Field::FoodCalories),
            col("Exercise cals", Field::ExerciseCalories),
            col("Budget cals", Field::CalorieBudget),
            col("EER", Field::Tdee),
        ],
    },
    SourceSpec {
        id: "protein",
        file_names: &["protein.csv"],
        table: Table::Macros,
        columns: &[col("Value", Field::ProteinGrams)],
    },
    SourceSpec {
        id: "carbohydrates",
        file_names: &["carbohydrates.csv"],
        table: Table::Macros,
        columns: &[col("Value", Field::CarbsGrams)],
    },
    SourceSpec {
        id: "fiber",
        file_names: &["fiber.csv"],
        table: Table::Macros,
        columns: &[col("Value", Field::FiberGrams)],
    },
];

/// The food log, which maps to whole entries rather than per-date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodSourceSpec {
    pub id: &'static str,
    pub file_names: &'static [&'static str],
    /// Export column → nutrient key.
    pub nutrients: &'static [(&'static str, &'static str)],
}

pub const FOOD_SOURCE: FoodSourceSpec = FoodSourceSpec {
    id: "food-logs",
    file_names: &["food-logs.csv"],
    nutrients: &[
        ("Fat (g)", "fat"),
        ("Protein (g)", "protein"),
        ("Carbohydrates (g)", "carbs"),
        ("Saturated Fat (g)", "sat_fat"),
        ("Sugars (g)", "sugar"),
        ("Fiber (g)", "fiber"),
        ("Cholesterol (mg)", "cholesterol"),
        ("Sodium (mg)", "sodium"),
    ],
};

pub fn sources_for(table: Table) -> impl Iterator<Item = &'static SourceSpec> {
    SOURCES.iter().filter(move |s| s.table == table)
}

/// Find the date column: an exact alias first, then any header containing "date".
#[must_use]
pub fn detect_date_column(headers: &[String]) -> Option<&str> {
    DATE_ALIASES
        .iter()
        .find_map(|alias| headers.iter().find(|h| h.eq_ignore_ascii_case(alias)))
        .or_else(|| {
            headers
                .iter()
                .find(|h| h.to_ascii_lowercase().contains("date"))
        })
        .map(String::as_str)
}

/// Lenient numeric parse: thousands separators are dropped and the longest
/// numeric prefix is taken ("7.5 hrs" reads as 7.5). Anything without a
/// finite leading number is absent, never zero.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let bytes = cleaned.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts when it has digits.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    cleaned[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One fixed-schema observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedValue {
    pub source: &'static str,
    pub date: String,
    pub field: Field,
    pub value: f64,
}

/// Output of mapping one fixed-schema source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRows {
    pub source: &'static str,
    /// Date key of every dated row, in row order, including rows whose
    /// values were all absent.
    pub dates: Vec<String>,
    pub values: Vec<MappedValue>,
    /// Rows whose date did not parse and were keyed by the raw text.
    pub degraded_dates: usize,
    pub missing_columns: Vec<&'static str>,
}

fn row_date(row: &RawRow, date_column: &str, source: &str, degraded: &mut usize) -> Option<String> {
    let raw = row.get(date_column)?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(d) = dates::try_normalize(raw) {
        Some(dates::to_key(d))
    } else {
        tracing::debug!(source, raw, "unparsable date kept as raw key");
        *degraded += 1;
        Some(raw.to_string())
    }
}

fn require_date_column<'a>(src: &'a SourceRows) -> Result<&'a str> {
    detect_date_column(&src.headers)
        .ok_or_else(|| Error::Schema(format!("{} has no date column", src.name)))
}

fn has_column(headers: &[String], column: &str) -> bool {
    headers.iter().any(|h| h.eq_ignore_ascii_case(column))
}

/// Map a fixed-schema source. A source with rows but no date column is a
/// schema error; the caller skips it.
pub fn map_rows(spec: &SourceSpec, src: &SourceRows) -> Result<MappedRows> {
    let mut out = MappedRows {
        source: spec.id,
        ..MappedRows::default()
    };
    if src.is_empty() {
        return Ok(out);
    }
    let date_column = require_date_column(src)?;

    let mut columns = Vec::with_capacity(spec.columns.len());
    for map in spec.columns {
        match map.extract {
            Extract::Column(name) if !has_column(&src.headers, name) => {
                tracing::warn!(source = spec.id, column = name, "mapped column missing, field skipped");
                out.missing_columns.push(name);
            }
            _ => columns.push(*map),
        }
    }

    for row in &src.rows {
        let Some(date) = row_date(row, date_column, spec.id, &mut out.degraded_dates) else {
            continue;
        };
        for map in &columns {
            let value = match map.extract {
                Extract::Column(name) => row.get(name).and_then(parse_number),
                Extract::RowCount => Some(1.0),
            };
            if let Some(value) = value {
                out.values.push(MappedValue {
                    source: spec.id,
                    date: date.clone(),
                    field: map.field,
                    value,
                });
            }
        }
        out.dates.push(date);
    }

    if out.degraded_dates > 0 {
        tracing::warn!(source = spec.id, rows = out.degraded_dates, "rows keyed by unparsable dates");
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedFood {
    pub entries: Vec<FoodEntry>,
    pub degraded_dates: usize,
}

fn non_empty(row: &RawRow, column: &str) -> Option<String> {
    row.get(column)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Map food-log rows to entries, one per dated row.
pub fn map_food_rows(spec: &FoodSourceSpec, src: &SourceRows) -> Result<MappedFood> {
    let mut out = MappedFood::default();
    if src.is_empty() {
        return Ok(out);
    }
    let date_column = require_date_column(src)?;

    for row in &src.rows {
        let Some(date) = row_date(row, date_column, spec.id, &mut out.degraded_dates) else {
            continue;
        };
        let nutrients: BTreeMap<String, f64> = spec
            .nutrients
            .iter()
            .filter_map(|(column, key)| {
                row.get(column)
                    .and_then(parse_number)
                    .map(|v| ((*key).to_string(), v))
            })
            .collect();

        out.entries.push(FoodEntry {
            date,
            food_name: non_empty(row, "Name").unwrap_or_default(),
            meal: non_empty(row, "Meal").unwrap_or_default(),
            quantity: row.get("Quantity").and_then(parse_number),
            units: non_empty(row, "Units"),
            calories: row.get("Calories").and_then(parse_number),
            nutrients,
        });
    }

    if out.degraded_dates > 0 {
        tracing::warn!(source = spec.id, rows = out.degraded_dates, "rows keyed by unparsable dates");
    }
    Ok(out)
}

/// One dated row from a free-form source, every non-date column renamed to
/// `<namespace>_<column>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedRow {
    pub date: String,
    pub fields: Vec<(String, String)>,
}

pub fn map_namespaced(namespace: &str, src: &SourceRows) -> Result<Vec<NamespacedRow>> {
    if src.is_empty() {
        return Ok(Vec::new());
    }
    let date_column = require_date_column(src)?;

    let rows = src
        .rows
        .iter()
        .filter_map(|row| {
            let raw = row.get(date_column)?.trim();
            if raw.is_empty() {
                return None;
            }
            let fields = row
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case(date_column))
                .map(|(k, v)| (format!("{namespace}_{k}"), v.to_string()))
                .collect();
            Some(NamespacedRow {
                date: dates::normalize(raw),
                fields,
            })
        })
        .collect();
    Ok(rows)
}
