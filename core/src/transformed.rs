//! The transformed directory: one CSV per canonical table, loadable later
//! without the original export.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{ActivityRecord, CalorieRecord, FoodEntry, MacroRecord, MarkerRecord, Table, TableRow};
use crate::pipeline::{ExportSet, SourceReport, SourceStatus, TransformReport};
use crate::reconcile::{DailyRecord, ReconciledSet};
use crate::source::{self, RawRow};
use crate::store::SqlValue;

#[must_use]
pub fn file_name(table: Table) -> String {
    format!("{}.csv", table.name())
}

fn render(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
    }
}

fn write_table<R: TableRow>(dir: &Path, rows: &[R]) -> Result<PathBuf> {
    let path = dir.join(file_name(R::TABLE));
    let mut wtr = csv::Writer::from_path(&path).map_err(|e| Error::io(&path, e.into()))?;
    wtr.write_record(R::TABLE.columns())
        .map_err(|e| Error::io(&path, e.into()))?;
    for row in rows {
        let cells: Vec<String> = row.to_values().iter().map(render).collect();
        wtr.write_record(&cells).map_err(|e| Error::io(&path, e.into()))?;
    }
    wtr.flush().map_err(|e| Error::io(&path, e))?;
    tracing::info!(table = %R::TABLE, rows = rows.len(), path = %path.display(), "wrote transformed table");
    Ok(path)
}

/// Write every table of `set` into `out_dir`, creating it if needed.
pub fn write_transformed(out_dir: &Path, set: &ExportSet) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
    Ok(vec![
        write_table(out_dir, &set.markers.records)?,
        write_table(out_dir, &set.activity.records)?,
        write_table(out_dir, &set.calories.records)?,
        write_table(out_dir, &set.macros.records)?,
        write_table(out_dir, &set.food)?,
    ])
}

/// Numbers come back typed; everything else stays text.
fn cell_value(raw: &str) -> SqlValue {
    if raw.is_empty() {
        SqlValue::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        SqlValue::Integer(i)
    } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
        SqlValue::Real(f)
    } else {
        SqlValue::Text(raw.to_string())
    }
}

fn row_values(table: Table, row: &RawRow) -> Vec<SqlValue> {
    table
        .columns()
        .iter()
        .map(|column| match *column {
            // text columns stay text even when they look numeric
            "date" | "nutrients" | "food_name" | "meal" | "units" => {
                row.get(column).map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
            }
            _ => row.get(column).map_or(SqlValue::Null, cell_value),
        })
        .collect()
}

fn read_table<R: TableRow>(dir: &Path, report: &mut TransformReport) -> Result<Vec<R>> {
    let path = dir.join(file_name(R::TABLE));
    if !path.is_file() {
        report.sources.push(SourceReport {
            source: file_name(R::TABLE),
            table: R::TABLE,
            file: None,
            status: SourceStatus::Missing,
        });
        return Ok(Vec::new());
    }
    let src = source::read_source(&path)?;
    let rows: Vec<R> = src
        .rows
        .iter()
        .map(|row| R::from_values(&row_values(R::TABLE, row)))
        .collect();
    report.sources.push(SourceReport {
        source: file_name(R::TABLE),
        table: R::TABLE,
        file: Some(path),
        status: SourceStatus::Processed {
            rows: rows.len(),
            skipped_rows: src.skipped,
            degraded_dates: 0,
        },
    });
    Ok(rows)
}

fn into_set<R: DailyRecord>(mut records: Vec<R>) -> ReconciledSet<R> {
    records.sort_by(|a, b| a.date().cmp(b.date()));
    ReconciledSet {
        table: R::TABLE,
        records,
        collisions: Vec::new(),
    }
}

/// Read a directory produced by [`write_transformed`]. Absent tables read as
/// empty.
pub fn read_transformed(dir: &Path) -> Result<ExportSet> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "transformed directory not found"),
        ));
    }
    let mut report = TransformReport::default();
    let markers = read_table::<MarkerRecord>(dir, &mut report)?;
    let activity = read_table::<ActivityRecord>(dir, &mut report)?;
    let calories = read_table::<CalorieRecord>(dir, &mut report)?;
    let macros = read_table::<MacroRecord>(dir, &mut report)?;
    let mut food = read_table::<FoodEntry>(dir, &mut report)?;
    food.sort_by(|a, b| a.date.cmp(&b.date));

    Ok(ExportSet {
        markers: into_set(markers),
        activity: into_set(activity),
        calories: into_set(calories),
        macros: into_set(macros),
        food,
        report,
    })
}
