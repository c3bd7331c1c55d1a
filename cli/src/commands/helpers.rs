use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Rounded table with every column from `numeric_from` onwards right-aligned.
pub(crate) fn print_table<R: Tabled>(rows: &[R], numeric_from: usize) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(numeric_from..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// `{"error", "code"}` for `--json` failures. Core errors keep their code.
pub(crate) fn json_error(err: &anyhow::Error) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
        code: &'a str,
    }
    let message = format!("{err:#}");
    let code = err
        .downcast_ref::<loseit_core::Error>()
        .map_or("ERROR", loseit_core::Error::code);
    serde_json::to_string(&CliError {
        error: &message,
        code,
    })
    .unwrap_or_else(|_| format!("{{\"error\":\"{message}\",\"code\":\"{code}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{:.*}", decimals, no_neg_zero(x)))
}

pub(crate) fn fmt_opt_int(v: Option<i64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| x.to_string())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(180.25), 1), "180.2");
        assert_eq!(fmt_opt(Some(-0.0), 0), "0");
        assert_eq!(fmt_opt(None, 1), "-");
        assert_eq!(fmt_opt_int(Some(8123)), "8123");
        assert_eq!(fmt_opt_int(None), "-");
    }

    #[test]
    fn test_json_error_keeps_core_code() {
        let err = anyhow::Error::new(loseit_core::Error::UnknownMetric("mood".to_string()))
            .context("trends failed");
        let value: serde_json::Value = serde_json::from_str(&json_error(&err)).unwrap();
        assert_eq!(value["code"], "UNKNOWN_METRIC");
        assert_eq!(value["error"], "trends failed: Unknown metric: mood");
    }

    #[test]
    fn test_json_error_generic() {
        let err = anyhow::anyhow!("something broke");
        let value: serde_json::Value = serde_json::from_str(&json_error(&err)).unwrap();
        assert_eq!(value["code"], "ERROR");
        assert_eq!(value["error"], "something broke");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Eggs", 10), "Eggs");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
