use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};

use crate::error::{Error, Result};
use crate::store::{QueryResult, SqlValue, Store};

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Memory,
    File(PathBuf),
}

impl Location {
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>`
    /// or a bare path.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let s = connection_string.trim();
        let rest = s
            .strip_prefix("sqlite://")
            .or_else(|| s.strip_prefix("sqlite:"))
            .unwrap_or(s);
        match rest {
            "" => Err(Error::Validation(format!(
                "connection string has no database path: '{connection_string}'"
            ))),
            ":memory:" => Ok(Location::Memory),
            path => Ok(Location::File(PathBuf::from(path))),
        }
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Store(format!("Failed to open database {}: {e}", path.display())))?;
        let db = Database { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        match Location::parse(connection_string)? {
            Location::Memory => Self::open_in_memory(),
            Location::File(path) => Self::open(&path),
        }
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS markers (
                    date TEXT PRIMARY KEY NOT NULL,
                    weight REAL,
                    body_fat REAL
                );

                CREATE TABLE IF NOT EXISTS activity (
                    date TEXT PRIMARY KEY NOT NULL,
                    steps INTEGER,
                    sleep_hours REAL,
                    exercise_minutes REAL,
                    exercise_count INTEGER
                );

                CREATE TABLE IF NOT EXISTS calories (
                    date TEXT PRIMARY KEY NOT NULL,
                    food_calories REAL,
                    exercise_calories REAL,
                    calorie_budget REAL,
                    tdee REAL
                );

                CREATE TABLE IF NOT EXISTS macros (
                    date TEXT PRIMARY KEY NOT NULL,
                    protein_grams REAL,
                    carbs_grams REAL,
                    fiber_grams REAL
                );

                CREATE TABLE IF NOT EXISTS food (
                    id INTEGER PRIMARY KEY,
                    date TEXT NOT NULL,
                    food_name TEXT NOT NULL DEFAULT '',
                    meal TEXT NOT NULL DEFAULT '',
                    quantity REAL,
                    units TEXT,
                    calories REAL,
                    nutrients TEXT NOT NULL DEFAULT '{}'
                );

                CREATE INDEX IF NOT EXISTS idx_food_date ON food(date);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_food_meal ON food(meal);
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    #[must_use]
    pub fn schema_version(&self) -> i64 {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl Store for Database {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            let changed = stmt.execute(params_from_iter(params.iter()))?;
            tracing::trace!(sql, changed, "executed statement");
            return Ok(QueryResult::default());
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(value_from_ref(row.get_ref(i)?));
            }
            out.push(values);
        }

        Ok(QueryResult { columns, rows: out })
    }
}
