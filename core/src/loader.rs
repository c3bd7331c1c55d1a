use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::models::{Table, TableRow};
use crate::pipeline::ExportSet;
use crate::store::{SqlValue, Store, with_transaction};

/// SQLite's default bound-parameter ceiling.
const MAX_PARAMS: usize = 32_766;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Upsert unique-date tables; replace food rows only for incoming dates.
    Incremental,
    /// Clear each table before inserting.
    Full,
}

impl LoadMode {
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        if config.full_reload {
            LoadMode::Full
        } else {
            LoadMode::Incremental
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: Table,
    pub mode: LoadMode,
    pub rows_written: usize,
    pub batches: usize,
    /// Food dates whose existing rows were replaced (incremental mode).
    pub dates_cleared: usize,
    /// True when there was nothing to load and the table was left untouched.
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: Table,
    pub rows: i64,
}

/// Writes reconciled sets into a [`Store`], one transaction per call.
pub struct Loader<'a, S: Store + ?Sized> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: Store + ?Sized> Loader<'a, S> {
    pub fn new(store: &'a S, config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            batch_size: config.batch_size,
        })
    }

    /// Load one table. Any failing batch rolls the whole table back.
    pub fn load_table<R: TableRow>(&self, rows: &[R], mode: LoadMode) -> Result<LoadSummary> {
        with_transaction(self.store, |store| write_rows(store, self.batch_size, rows, mode))
    }

    /// Load every table of `set` in a single transaction, in [`Table::ALL`] order.
    pub fn load_export(&self, set: &ExportSet, mode: LoadMode) -> Result<Vec<LoadSummary>> {
        with_transaction(self.store, |store| {
            Ok(vec![
                write_rows(store, self.batch_size, &set.markers.records, mode)?,
                write_rows(store, self.batch_size, &set.activity.records, mode)?,
                write_rows(store, self.batch_size, &set.calories.records, mode)?,
                write_rows(store, self.batch_size, &set.macros.records, mode)?,
                write_rows(store, self.batch_size, &set.food, mode)?,
            ])
        })
    }

    pub fn table_counts(&self) -> Result<Vec<TableCount>> {
        table_counts(self.store)
    }
}

pub fn table_counts<S: Store + ?Sized>(store: &S) -> Result<Vec<TableCount>> {
    Table::ALL
        .iter()
        .map(|table| {
            let result = store.query(&format!("SELECT COUNT(*) FROM {table}"), &[])?;
            let rows = result
                .rows
                .first()
                .and_then(|r| r.first())
                .and_then(SqlValue::as_i64)
                .unwrap_or(0);
            Ok(TableCount {
                table: *table,
                rows,
            })
        })
        .collect()
}

fn insert_sql(table: Table, rows: usize) -> String {
    let columns = table.columns();
    let width = columns.len();
    let groups: Vec<String> = (0..rows)
        .map(|r| {
            let slots: Vec<String> = (1..=width).map(|c| format!("?{}", r * width + c)).collect();
            format!("({})", slots.join(", "))
        })
        .collect();

    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES {}",
        columns.join(", "),
        groups.join(", ")
    );
    if table.has_unique_date() {
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "date")
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        sql.push_str(&format!(" ON CONFLICT(date) DO UPDATE SET {}", updates.join(", ")));
    }
    sql
}

fn tag_table(table: Table) -> impl Fn(Error) -> Error {
    move |e| match e {
        Error::Store(msg) => Error::Store(format!("loading {table}: {msg}")),
        other => other,
    }
}

fn write_rows<S, R>(store: &S, batch_size: usize, rows: &[R], mode: LoadMode) -> Result<LoadSummary>
where
    S: Store + ?Sized,
    R: TableRow,
{
    let table = R::TABLE;
    let mut summary = LoadSummary {
        table,
        mode,
        rows_written: 0,
        batches: 0,
        dates_cleared: 0,
        skipped: false,
    };

    if rows.is_empty() {
        tracing::info!(table = %table, "no rows, table left untouched");
        summary.skipped = true;
        return Ok(summary);
    }

    match mode {
        LoadMode::Full => {
            store
                .query(&format!("DELETE FROM {table}"), &[])
                .map_err(tag_table(table))?;
        }
        LoadMode::Incremental if !table.has_unique_date() => {
            let dates: BTreeSet<&str> = rows.iter().map(TableRow::date).collect();
            for date in &dates {
                store
                    .query(&format!("DELETE FROM {table} WHERE date = ?1"), &[(*date).into()])
                    .map_err(tag_table(table))?;
            }
            summary.dates_cleared = dates.len();
        }
        LoadMode::Incremental => {}
    }

    let width = table.columns().len();
    let chunk = batch_size.min(MAX_PARAMS / width).max(1);
    for batch in rows.chunks(chunk) {
        let params: Vec<SqlValue> = batch.iter().flat_map(TableRow::to_values).collect();
        store
            .query(&insert_sql(table, batch.len()), &params)
            .map_err(tag_table(table))?;
        summary.batches += 1;
        summary.rows_written += batch.len();
        tracing::debug!(table = %table, batch = summary.batches, rows = batch.len(), "wrote batch");
    }

    tracing::info!(
        table = %table,
        mode = ?mode,
        rows = summary.rows_written,
        batches = summary.batches,
        "loaded table"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{FoodEntry, MarkerRecord};
    use crate::reconcile::ReconciledSet;
    use crate::store::QueryResult;

    fn marker(date: &str, weight: f64) -> MarkerRecord {
        MarkerRecord {
            date: date.into(),
            weight: Some(weight),
            body_fat: None,
        }
    }

    fn food(date: &str, name: &str) -> FoodEntry {
        FoodEntry {
            date: date.into(),
            food_name: name.into(),
            meal: "Breakfast".into(),
            ..FoodEntry::default()
        }
    }

    fn sample_set() -> ExportSet {
        let mut set = ExportSet::default();
        set.markers = ReconciledSet {
            table: Table::Markers,
            records: vec![marker("2024-11-15", 180.2), marker("2024-11-16", 179.8)],
            collisions: Vec::new(),
        };
        set.food = vec![food("2024-11-01", "Eggs"), food("2024-11-01", "Eggs")];
        set
    }

    fn dump(db: &Database) -> Vec<QueryResult> {
        Table::ALL
            .iter()
            .map(|t| {
                db.query(&format!("SELECT * FROM {t} ORDER BY rowid"), &[])
                    .unwrap()
            })
            .collect()
    }

    fn count(db: &Database, table: Table) -> i64 {
        table_counts(db)
            .unwrap()
            .into_iter()
            .find(|c| c.table == table)
            .unwrap()
            .rows
    }

    #[test]
    fn test_insert_sql_shape() {
        let sql = insert_sql(Table::Markers, 2);
        assert_eq!(
            sql,
            "INSERT INTO markers (date, weight, body_fat) VALUES (?1, ?2, ?3), (?4, ?5, ?6) \
             ON CONFLICT(date) DO UPDATE SET weight = excluded.weight, body_fat = excluded.body_fat"
        );
        assert!(!insert_sql(Table::Food, 1).contains("ON CONFLICT"));
    }

    #[test]
    fn test_full_reload_twice_is_identical() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&db, &config).unwrap();
        let set = sample_set();

        loader.load_export(&set, LoadMode::Full).unwrap();
        let first = dump(&db);
        loader.load_export(&set, LoadMode::Full).unwrap();
        assert_eq!(dump(&db), first);
        assert_eq!(count(&db, Table::Food), 2);
    }

    #[test]
    fn test_incremental_keeps_one_row_per_date() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&db, &config).unwrap();

        loader
            .load_table(&[marker("2024-11-15", 181.0)], LoadMode::Incremental)
            .unwrap();
        loader
            .load_table(
                &[marker("2024-11-15", 180.2), marker("2024-11-16", 179.8)],
                LoadMode::Incremental,
            )
            .unwrap();

        let result = db
            .query("SELECT date, weight FROM markers ORDER BY date", &[])
            .unwrap();
        assert_eq!(
            result.rows,
            vec![
                vec![SqlValue::Text("2024-11-15".into()), SqlValue::Real(180.2)],
                vec![SqlValue::Text("2024-11-16".into()), SqlValue::Real(179.8)],
            ]
        );
    }

    #[test]
    fn test_incremental_food_replaces_incoming_dates_only() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&db, &config).unwrap();

        loader
            .load_table(
                &[food("2024-10-31", "Soup"), food("2024-11-01", "Eggs"), food("2024-11-01", "Toast")],
                LoadMode::Incremental,
            )
            .unwrap();
        let summary = loader
            .load_table(&[food("2024-11-01", "Oats")], LoadMode::Incremental)
            .unwrap();
        assert_eq!(summary.dates_cleared, 1);

        let result = db
            .query("SELECT food_name FROM food ORDER BY date, id", &[])
            .unwrap();
        let names: Vec<String> = result
            .rows
            .into_iter()
            .filter_map(|r| r.into_iter().next().and_then(SqlValue::into_text))
            .collect();
        assert_eq!(names, vec!["Soup", "Oats"]);
    }

    #[test]
    fn test_full_mode_clears_previous_dates() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&db, &config).unwrap();
        loader
            .load_table(&[marker("2024-11-01", 185.0)], LoadMode::Incremental)
            .unwrap();
        loader
            .load_table(&[marker("2024-11-15", 180.2)], LoadMode::Full)
            .unwrap();
        assert_eq!(count(&db, Table::Markers), 1);
    }

    #[test]
    fn test_empty_set_leaves_table_untouched() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&db, &config).unwrap();
        loader
            .load_table(&[marker("2024-11-15", 180.2)], LoadMode::Incremental)
            .unwrap();

        let summary = loader
            .load_table::<MarkerRecord>(&[], LoadMode::Full)
            .unwrap();
        assert!(summary.skipped);
        assert_eq!(count(&db, Table::Markers), 1);
    }

    #[test]
    fn test_rows_chunked_by_batch_size() {
        let db = Database::open_in_memory().unwrap();
        let config = StoreConfig::in_memory().with_batch_size(2);
        let loader = Loader::new(&db, &config).unwrap();
        let rows: Vec<MarkerRecord> = (1..=5)
            .map(|d| marker(&format!("2024-11-{d:02}"), 180.0))
            .collect();
        let summary = loader.load_table(&rows, LoadMode::Full).unwrap();
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.rows_written, 5);
        assert_eq!(count(&db, Table::Markers), 5);
    }

    /// Fails any statement touching one table.
    struct FailingStore<'a> {
        inner: &'a Database,
        poison: &'static str,
    }

    impl Store for FailingStore<'_> {
        fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
            if sql.contains(self.poison) {
                return Err(Error::Store("disk I/O error".into()));
            }
            self.inner.query(sql, params)
        }
    }

    #[test]
    fn test_failure_rolls_back_whole_load() {
        let db = Database::open_in_memory().unwrap();
        let failing = FailingStore {
            inner: &db,
            poison: "INSERT INTO food",
        };
        let config = StoreConfig::in_memory();
        let loader = Loader::new(&failing, &config).unwrap();

        let err = loader.load_export(&sample_set(), LoadMode::Full).unwrap_err();
        assert!(err.to_string().contains("loading food"));
        assert_eq!(count(&db, Table::Markers), 0);
    }

    #[test]
    fn test_load_mode_from_config() {
        let config = StoreConfig::in_memory().with_full_reload(true);
        assert_eq!(LoadMode::from_config(&config), LoadMode::Full);
        assert_eq!(
            LoadMode::from_config(&StoreConfig::in_memory()),
            LoadMode::Incremental
        );
    }
}
