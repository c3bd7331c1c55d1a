//! Export directory → reconciled tables.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::mapping::{self, FOOD_SOURCE, SourceSpec};
use crate::models::{ActivityRecord, CalorieRecord, FoodEntry, MacroRecord, MarkerRecord, Table};
use crate::reconcile::{self, DailyRecord, MergeCollision, ReconciledSet, Reconciler};
use crate::source::{self, SourceRows};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Processed {
        rows: usize,
        skipped_rows: usize,
        degraded_dates: usize,
    },
    Missing,
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub table: Table,
    pub file: Option<PathBuf>,
    #[serde(flatten)]
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub sources: Vec<SourceReport>,
}

impl TransformReport {
    fn push(&mut self, source: &str, table: Table, file: Option<PathBuf>, status: SourceStatus) {
        self.sources.push(SourceReport {
            source: source.to_string(),
            table,
            file,
            status,
        });
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Processed { .. }))
            .count()
    }

    #[must_use]
    pub fn problems(&self) -> Vec<&SourceReport> {
        self.sources
            .iter()
            .filter(|s| matches!(s.status, SourceStatus::Skipped { .. } | SourceStatus::Failed { .. }))
            .collect()
    }
}

/// Every canonical table reconciled from one export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSet {
    pub markers: ReconciledSet<MarkerRecord>,
    pub activity: ReconciledSet<ActivityRecord>,
    pub calories: ReconciledSet<CalorieRecord>,
    pub macros: ReconciledSet<MacroRecord>,
    pub food: Vec<FoodEntry>,
    pub report: TransformReport,
}

impl ExportSet {
    #[must_use]
    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Markers => self.markers.len(),
            Table::Activity => self.activity.len(),
            Table::Calories => self.calories.len(),
            Table::Macros => self.macros.len(),
            Table::Food => self.food.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Table::ALL.iter().all(|t| self.row_count(*t) == 0)
    }

    pub fn collisions(&self) -> impl Iterator<Item = &MergeCollision> {
        self.markers
            .collisions
            .iter()
            .chain(&self.activity.collisions)
            .chain(&self.calories.collisions)
            .chain(&self.macros.collisions)
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "export directory not found"),
        ));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Locate the first of `names` present in `files`, ignoring case.
fn locate<'a>(files: &'a [PathBuf], names: &[&str]) -> Option<&'a Path> {
    names.iter().find_map(|name| {
        files
            .iter()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .map(PathBuf::as_path)
    })
}

/// Read a located source, recording a report entry for anything but success.
fn open_source(
    id: &str,
    table: Table,
    files: &[PathBuf],
    names: &[&str],
    report: &mut TransformReport,
) -> Option<(PathBuf, SourceRows)> {
    let Some(path) = locate(files, names) else {
        tracing::info!(source = id, "source file not present");
        report.push(id, table, None, SourceStatus::Missing);
        return None;
    };
    match source::read_source(path) {
        Ok(rows) => Some((path.to_path_buf(), rows)),
        Err(e) => {
            tracing::warn!(source = id, error = %e, "source unreadable, skipped");
            report.push(
                id,
                table,
                Some(path.to_path_buf()),
                SourceStatus::Failed {
                    reason: e.to_string(),
                },
            );
            None
        }
    }
}

fn mapping_failure(e: &Error) -> SourceStatus {
    match e {
        Error::Schema(reason) => SourceStatus::Skipped {
            reason: reason.clone(),
        },
        other => SourceStatus::Failed {
            reason: other.to_string(),
        },
    }
}

fn transform_table<R: DailyRecord>(files: &[PathBuf], report: &mut TransformReport) -> ReconciledSet<R> {
    let mut reconciler = Reconciler::<R>::new();
    let specs: Vec<&SourceSpec> = mapping::sources_for(R::TABLE).collect();

    for spec in specs {
        let Some((path, rows)) = open_source(spec.id, spec.table, files, spec.file_names, report) else {
            continue;
        };
        match mapping::map_rows(spec, &rows) {
            Ok(mapped) => {
                tracing::info!(source = spec.id, rows = rows.rows.len(), "processed source");
                reconciler.ingest(&mapped);
                report.push(
                    spec.id,
                    spec.table,
                    Some(path),
                    SourceStatus::Processed {
                        rows: rows.rows.len(),
                        skipped_rows: rows.skipped,
                        degraded_dates: mapped.degraded_dates,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(source = spec.id, error = %e, "source skipped");
                report.push(spec.id, spec.table, Some(path), mapping_failure(&e));
            }
        }
    }

    let set = reconciler.finish();
    tracing::info!(table = %R::TABLE, records = set.len(), "reconciled table");
    set
}

fn transform_food(files: &[PathBuf], report: &mut TransformReport) -> Vec<FoodEntry> {
    let spec = &FOOD_SOURCE;
    let Some((path, rows)) = open_source(spec.id, Table::Food, files, spec.file_names, report) else {
        return Vec::new();
    };
    match mapping::map_food_rows(spec, &rows) {
        Ok(mapped) => {
            tracing::info!(source = spec.id, rows = rows.rows.len(), "processed source");
            report.push(
                spec.id,
                Table::Food,
                Some(path),
                SourceStatus::Processed {
                    rows: rows.rows.len(),
                    skipped_rows: rows.skipped,
                    degraded_dates: mapped.degraded_dates,
                },
            );
            reconcile::reconcile_food(mapped.entries)
        }
        Err(e) => {
            tracing::warn!(source = spec.id, error = %e, "source skipped");
            report.push(spec.id, Table::Food, Some(path), mapping_failure(&e));
            Vec::new()
        }
    }
}

/// Reconcile every well-known source in `dir` into the canonical tables.
///
/// Missing, unreadable, or schema-less sources are recorded in the report and
/// never abort the others. Only an absent directory is an error.
pub fn transform_export(dir: &Path) -> Result<ExportSet> {
    let files = list_files(dir)?;
    let mut report = TransformReport::default();

    let markers = transform_table(&files, &mut report);
    let activity = transform_table(&files, &mut report);
    let calories = transform_table(&files, &mut report);
    let macros = transform_table(&files, &mut report);
    let food = transform_food(&files, &mut report);

    Ok(ExportSet {
        markers,
        activity,
        calories,
        macros,
        food,
        report,
    })
}

// --- Combine ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinedRecord {
    pub date: String,
    pub values: BTreeMap<String, String>,
}

/// Every dated row of every CSV under a directory, merged per date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinedTable {
    /// Namespaced columns in first-seen order.
    pub columns: Vec<String>,
    pub records: Vec<CombinedRecord>,
    pub files: Vec<PathBuf>,
}

impl CombinedTable {
    /// Write `date` followed by every namespaced column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let out = Path::new("<combined output>");
        let mut wtr = csv::Writer::from_writer(writer);
        let header = std::iter::once("date").chain(self.columns.iter().map(String::as_str));
        wtr.write_record(header)
            .map_err(|e| Error::io(out, e.into()))?;

        for record in &self.records {
            let row = std::iter::once(record.date.as_str()).chain(
                self.columns
                    .iter()
                    .map(|c| record.values.get(c).map_or("", String::as_str)),
            );
            wtr.write_record(row).map_err(|e| Error::io(out, e.into()))?;
        }
        wtr.flush().map_err(|e| Error::io(out, e))
    }
}

fn find_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_dir() {
            find_csv_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Merge every CSV under `dir` (recursively) by date, prefixing each column
/// with its file stem. Later files overwrite earlier ones on a shared key.
pub fn combine_directory(dir: &Path) -> Result<CombinedTable> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
        ));
    }
    let mut files = Vec::new();
    find_csv_files(dir, &mut files)?;
    files.sort();

    let mut by_date: BTreeMap<String, CombinedRecord> = BTreeMap::new();
    let mut columns = Vec::new();
    let mut seen = HashSet::new();

    for path in &files {
        let stem = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());

        let rows = match source::read_source(path) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "unreadable file skipped");
                continue;
            }
        };
        let mapped = match mapping::map_namespaced(&stem, &rows) {
            Ok(mapped) => mapped,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "no date column, file skipped");
                continue;
            }
        };
        tracing::info!(file = %path.display(), rows = mapped.len(), "combined file");

        for row in mapped {
            let record = by_date
                .entry(row.date.clone())
                .or_insert_with(|| CombinedRecord {
                    date: row.date.clone(),
                    values: BTreeMap::new(),
                });
            for (key, value) in row.fields {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
                record.values.insert(key, value);
            }
        }
    }

    Ok(CombinedTable {
        columns,
        records: by_date.into_values().collect(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_transform_merges_weight_and_body_fat() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "weights.csv", "Date,Weight\n11/15/2024,180.2\n");
        write(dir.path(), "body-fat.csv", "Date,Value\n11/15/2024,22.1\n");

        let set = transform_export(dir.path()).unwrap();
        assert_eq!(
            set.markers.records,
            vec![MarkerRecord {
                date: "2024-11-15".into(),
                weight: Some(180.2),
                body_fat: Some(22.1),
            }]
        );
        assert!(set.activity.is_empty());
        assert_eq!(set.report.processed(), 2);
    }

    #[test]
    fn test_transform_accepts_singular_weight_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "weight.csv", "Date,Weight\n11/15/2024,180.2\n");
        write(dir.path(), "body-fat.csv", "Date,Value\n11/15/2024,22.1\n");

        let set = transform_export(dir.path()).unwrap();
        assert_eq!(set.markers.records.len(), 1);
        assert_eq!(set.markers.records[0].weight, Some(180.2));
        assert_eq!(set.markers.records[0].body_fat, Some(22.1));
        let weights = set.report.sources.iter().find(|s| s.source == "weights").unwrap();
        assert!(matches!(weights.status, SourceStatus::Processed { rows: 1, .. }));
    }

    #[test]
    fn test_transform_two_food_rows_same_date() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "food-logs.csv",
            "Date,Name,Meal,Quantity,Units,Calories\n\
             11/01/2024,Eggs,Breakfast,2,Each,140\n\
             11/01/2024,Eggs,Breakfast,2,Each,140\n",
        );
        let set = transform_export(dir.path()).unwrap();
        assert_eq!(set.food.len(), 2);
        assert!(set.food.iter().all(|f| f.date == "2024-11-01"));
    }

    #[test]
    fn test_transform_file_names_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Steps.CSV", "Date,Value\n11/15/2024,8123\n");
        let set = transform_export(dir.path()).unwrap();
        assert_eq!(set.activity.records[0].steps, Some(8123));
    }

    #[test]
    fn test_transform_reports_missing_and_skipped_sources() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sleep.csv", "Day,Value\nMonday,7\n");
        write(dir.path(), "steps.csv", "Date,Value\n11/15/2024,8123\n");

        let set = transform_export(dir.path()).unwrap();
        let status = |id: &str| {
            set.report
                .sources
                .iter()
                .find(|s| s.source == id)
                .map(|s| s.status.clone())
                .unwrap()
        };
        assert!(matches!(status("sleep"), SourceStatus::Skipped { .. }));
        assert_eq!(status("weights"), SourceStatus::Missing);
        assert!(matches!(status("steps"), SourceStatus::Processed { rows: 1, .. }));
        assert_eq!(set.report.problems().len(), 1);
        assert_eq!(set.activity.len(), 1);
    }

    #[test]
    fn test_transform_unreadable_source_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("steps.csv"), b"Da\xff\xfete,Value\n11/15/2024,8123\n").unwrap();
        write(dir.path(), "sleep.csv", "Date,Value\n11/15/2024,7.5\n");
        write(dir.path(), "weights.csv", "Date,Weight\n11/15/2024,180.2\n");

        let set = transform_export(dir.path()).unwrap();
        let steps = set.report.sources.iter().find(|s| s.source == "steps").unwrap();
        assert!(matches!(steps.status, SourceStatus::Failed { .. }));
        assert_eq!(set.activity.len(), 1);
        assert_eq!(set.activity.records[0].steps, None);
        assert_eq!(set.activity.records[0].sleep_hours, Some(7.5));
        assert_eq!(set.markers.records[0].weight, Some(180.2));
    }

    #[test]
    fn test_transform_missing_directory_is_io_error() {
        let err = transform_export(Path::new("/nonexistent/export")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_transform_exercise_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "exercise-logs.csv",
            "Date,Name,Quantity\n11/15/2024,Run,30\n11/15/2024,Walk,20\n11/16/2024,Bike,45\n",
        );
        let set = transform_export(dir.path()).unwrap();
        let a = &set.activity.records;
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].exercise_minutes, Some(50.0));
        assert_eq!(a[0].exercise_count, Some(2));
        assert_eq!(a[1].exercise_count, Some(1));
    }

    #[test]
    fn test_combine_namespaces_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write(dir.path(), "steps.csv", "Date,Value\n11/16/2024,9001\n11/15/2024,8123\n");
        write(&nested, "weights.csv", "Date,Weight\n11/15/2024,180.2\n");
        write(dir.path(), "notes.csv", "Text\nhello\n");

        let table = combine_directory(dir.path()).unwrap();
        assert_eq!(table.files.len(), 3);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].date, "2024-11-15");
        assert_eq!(table.records[0].values["weights_Weight"], "180.2");
        assert_eq!(table.records[1].values.get("weights_Weight"), None);

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("date,"));
        assert!(header.contains("steps_Value"));
        assert!(header.contains("weights_Weight"));
        assert_eq!(lines.count(), 2);
    }
}
