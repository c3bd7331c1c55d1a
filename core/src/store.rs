use serde::Serialize;

use crate::error::Result;

/// A single bound parameter or result cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(f) => Some(*f),
            SqlValue::Null | SqlValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Real(f) => Some(f.trunc() as i64),
            SqlValue::Null | SqlValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Column names plus positional rows, as returned by [`Store::query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// The one capability the loader, aggregator, and reports need from durable
/// storage. Parameters are always bound positionally (`?1`, `?2`, …); callers
/// never splice values into `sql`.
///
/// Statements that produce no result columns (DML, DDL, transaction control)
/// return an empty `QueryResult`.
pub trait Store {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult>;
}

/// Run `f` inside a transaction on `store`, rolling back if it fails.
pub fn with_transaction<S, T, F>(store: &S, f: F) -> Result<T>
where
    S: Store + ?Sized,
    F: FnOnce(&S) -> Result<T>,
{
    store.query("BEGIN", &[])?;
    match f(store) {
        Ok(value) => {
            store.query("COMMIT", &[])?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = store.query("ROLLBACK", &[]) {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_conversions() {
        assert_eq!(SqlValue::from(Some(2.5)), SqlValue::Real(2.5));
        assert_eq!(SqlValue::from(None::<f64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7_i64)).as_f64(), Some(7.0));
        assert_eq!(SqlValue::Real(8123.9).as_i64(), Some(8123));
        assert_eq!(SqlValue::from("x").as_str(), Some("x"));
        assert!(SqlValue::Text("1".into()).as_f64().is_none());
    }

    #[test]
    fn test_sql_value_serializes_untagged() {
        let row = vec![
            SqlValue::Null,
            SqlValue::Integer(3),
            SqlValue::Real(1.5),
            SqlValue::Text("a".into()),
        ];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[null,3,1.5,"a"]"#);
    }

    #[test]
    fn test_column_index_case_insensitive() {
        let result = QueryResult {
            columns: vec!["date".into(), "Weight".into()],
            rows: vec![],
        };
        assert_eq!(result.column_index("weight"), Some(1));
        assert_eq!(result.column_index("steps"), None);
    }
}
