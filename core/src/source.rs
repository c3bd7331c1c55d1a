use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// One data row from a source file: column name → raw text, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    #[must_use]
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Look up a column, exact name first, then case-insensitive.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .or_else(|| self.fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(column)))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }
}

/// Everything read from one source.
#[derive(Debug, Clone, Default)]
pub struct SourceRows {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Rows dropped as malformed (short, unreadable). Blank rows are not counted.
    pub skipped: usize,
}

impl SourceRows {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn read_source(path: &Path) -> Result<SourceRows> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    read_rows(&name, file)
}

/// Read delimited text with a header row.
///
/// Tolerant by construction: an empty input yields no rows, short or
/// undecodable rows are skipped and counted, and stray quotes are taken
/// literally. Only an unreadable header line fails the source.
pub fn read_rows<R: Read>(name: &str, reader: R) -> Result<SourceRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::parse(name, format!("unreadable header row: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut out = SourceRows {
        name: name.to_string(),
        headers,
        rows: Vec::new(),
        skipped: 0,
    };

    if out.headers.iter().all(String::is_empty) {
        return Ok(out);
    }

    for (line_num, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(source = name, line = line_num + 2, error = %e, "skipping unreadable row");
                out.skipped += 1;
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }

        if record.len() < out.headers.len() {
            tracing::debug!(
                source = name,
                line = line_num + 2,
                fields = record.len(),
                expected = out.headers.len(),
                "skipping short row"
            );
            out.skipped += 1;
            continue;
        }

        let fields = out
            .headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        out.rows.push(RawRow::new(fields));
    }

    if out.skipped > 0 {
        tracing::warn!(source = name, skipped = out.skipped, "skipped malformed rows");
    }

    Ok(out)
}
