use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::mapping::{MappedRows, MappedValue};
use crate::models::{Field, FoodEntry, MergePolicy, Table, TableRow};

/// A canonical record with one row per date.
pub trait DailyRecord: TableRow + Default + Clone {
    fn with_date(date: String) -> Self;

    fn field(&self, field: Field) -> Option<f64>;

    /// Returns false when `field` does not belong to this record's table.
    fn set_field(&mut self, field: Field, value: f64) -> bool;
}

/// A value replaced by a different source on the same date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeCollision {
    pub date: String,
    pub field: Field,
    pub previous_source: String,
    pub previous_value: f64,
    pub source: String,
    pub value: f64,
}

/// Date-ordered records for one table, ready to be written as a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledSet<R> {
    pub table: Table,
    pub records: Vec<R>,
    pub collisions: Vec<MergeCollision>,
}

impl<R: DailyRecord> ReconciledSet<R> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: R::TABLE,
            records: Vec::new(),
            collisions: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: DailyRecord> Default for ReconciledSet<R> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builds one table's records from mapped values, in the order sources are fed.
#[derive(Debug)]
pub struct Reconciler<R> {
    records: BTreeMap<String, R>,
    last_source: HashMap<(String, Field), &'static str>,
    collisions: Vec<MergeCollision>,
}

impl<R: DailyRecord> Default for Reconciler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DailyRecord> Reconciler<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            last_source: HashMap::new(),
            collisions: Vec::new(),
        }
    }

    fn entry(&mut self, date: &str) -> &mut R {
        self.records
            .entry(date.to_string())
            .or_insert_with(|| R::with_date(date.to_string()))
    }

    /// Make sure a record exists for `date` even if no value lands on it.
    pub fn touch(&mut self, date: &str) {
        self.entry(date);
    }

    pub fn apply(&mut self, v: &MappedValue) {
        if v.field.table() != R::TABLE {
            tracing::debug!(source = v.source, field = %v.field, table = %R::TABLE, "field belongs to another table");
            return;
        }

        let key = (v.date.clone(), v.field);
        let previous_source = self.last_source.insert(key, v.source);
        let record = self.entry(&v.date);

        match v.field.policy() {
            MergePolicy::Accumulate => {
                let sum = record.field(v.field).unwrap_or(0.0) + v.value;
                record.set_field(v.field, sum);
            }
            MergePolicy::Overwrite => {
                let previous_value = record.field(v.field);
                record.set_field(v.field, v.value);
                let replaced = previous_source
                    .zip(previous_value)
                    .filter(|(prev_src, _)| *prev_src != v.source);
                if let Some((prev_src, prev_val)) = replaced {
                    tracing::warn!(
                        date = %v.date,
                        field = %v.field,
                        previous_source = prev_src,
                        source = v.source,
                        "value overwritten by a later source"
                    );
                    self.collisions.push(MergeCollision {
                        date: v.date.clone(),
                        field: v.field,
                        previous_source: prev_src.to_string(),
                        previous_value: prev_val,
                        source: v.source.to_string(),
                        value: v.value,
                    });
                }
            }
        }
    }

    /// Feed one mapped source: every dated row gets a record, then values merge.
    pub fn ingest(&mut self, mapped: &MappedRows) {
        for date in &mapped.dates {
            self.touch(date);
        }
        for v in &mapped.values {
            self.apply(v);
        }
    }

    #[must_use]
    pub fn finish(self) -> ReconciledSet<R> {
        ReconciledSet {
            table: R::TABLE,
            records: self.records.into_values().collect(),
            collisions: self.collisions,
        }
    }
}

/// Reconcile triples for a single table.
pub fn reconcile<'a, R, I>(values: I) -> ReconciledSet<R>
where
    R: DailyRecord,
    I: IntoIterator<Item = &'a MappedValue>,
{
    let mut reconciler = Reconciler::new();
    for v in values {
        reconciler.apply(v);
    }
    reconciler.finish()
}

/// Food entries are never merged; only ordered by date, keeping file order
/// within a date.
#[must_use]
pub fn reconcile_food(mut entries: Vec<FoodEntry>) -> Vec<FoodEntry> {
    entries.sort_by(|a, b| a.date.cmp(&b.date));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityRecord, MarkerRecord};

    fn mv(source: &'static str, date: &str, field: Field, value: f64) -> MappedValue {
        MappedValue {
            source,
            date: date.to_string(),
            field,
            value,
        }
    }

    #[test]
    fn test_weight_and_body_fat_merge_into_one_record() {
        let values = [
            mv("body-fat", "2024-11-15", Field::BodyFat, 22.1),
            mv("weights", "2024-11-15", Field::Weight, 180.2),
        ];
        let set: ReconciledSet<MarkerRecord> = reconcile(&values);
        assert_eq!(set.table, Table::Markers);
        assert_eq!(
            set.records,
            vec![MarkerRecord {
                date: "2024-11-15".into(),
                weight: Some(180.2),
                body_fat: Some(22.1),
            }]
        );
        assert!(set.collisions.is_empty());
    }

    #[test]
    fn test_records_sorted_by_date() {
        let values = [
            mv("weights", "2024-11-16", Field::Weight, 180.0),
            mv("weights", "2024-11-14", Field::Weight, 181.0),
            mv("weights", "2024-11-15", Field::Weight, 180.5),
        ];
        let set: ReconciledSet<MarkerRecord> = reconcile(&values);
        let dates: Vec<&str> = set.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-11-14", "2024-11-15", "2024-11-16"]);
    }

    #[test]
    fn test_same_source_last_row_wins_silently() {
        let values = [
            mv("weights", "2024-11-15", Field::Weight, 181.0),
            mv("weights", "2024-11-15", Field::Weight, 180.2),
        ];
        let set: ReconciledSet<MarkerRecord> = reconcile(&values);
        assert_eq!(set.records[0].weight, Some(180.2));
        assert!(set.collisions.is_empty());
    }

    #[test]
    fn test_cross_source_overwrite_is_flagged() {
        let values = [
            mv("scale-a", "2024-11-15", Field::Weight, 181.0),
            mv("scale-b", "2024-11-15", Field::Weight, 180.2),
        ];
        let set: ReconciledSet<MarkerRecord> = reconcile(&values);
        assert_eq!(set.records[0].weight, Some(180.2));
        assert_eq!(set.collisions.len(), 1);
        let c = &set.collisions[0];
        assert_eq!(c.previous_source, "scale-a");
        assert_eq!(c.previous_value, 181.0);
        assert_eq!(c.source, "scale-b");
    }

    #[test]
    fn test_exercise_accumulates() {
        let values = [
            mv("exercise-logs", "2024-11-15", Field::ExerciseMinutes, 30.0),
            mv("exercise-logs", "2024-11-15", Field::ExerciseCount, 1.0),
            mv("exercise-logs", "2024-11-15", Field::ExerciseMinutes, 15.5),
            mv("exercise-logs", "2024-11-15", Field::ExerciseCount, 1.0),
        ];
        let set: ReconciledSet<ActivityRecord> = reconcile(&values);
        assert_eq!(set.records[0].exercise_minutes, Some(45.5));
        assert_eq!(set.records[0].exercise_count, Some(2));
    }

    #[test]
    fn test_foreign_fields_ignored() {
        let values = [mv("steps", "2024-11-15", Field::Steps, 100.0)];
        let set: ReconciledSet<MarkerRecord> = reconcile(&values);
        assert!(set.is_empty());
    }

    #[test]
    fn test_ingest_keeps_dates_without_values() {
        let mapped = MappedRows {
            source: "weights",
            dates: vec!["2024-11-15".into(), "2024-11-16".into()],
            values: vec![mv("weights", "2024-11-16", Field::Weight, 180.0)],
            ..MappedRows::default()
        };
        let mut r = Reconciler::<MarkerRecord>::new();
        r.ingest(&mapped);
        let set = r.finish();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].weight, None);
    }

    #[test]
    fn test_reconcile_food_is_stable() {
        let entry = |date: &str, name: &str| FoodEntry {
            date: date.into(),
            food_name: name.into(),
            ..FoodEntry::default()
        };
        let sorted = reconcile_food(vec![
            entry("2024-11-02", "Toast"),
            entry("2024-11-01", "Eggs"),
            entry("2024-11-01", "Coffee"),
        ]);
        let names: Vec<&str> = sorted.iter().map(|e| e.food_name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Coffee", "Toast"]);
    }
}
