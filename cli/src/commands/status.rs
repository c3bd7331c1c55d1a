use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use loseit_core::loader::TableCount;
use loseit_core::service::HealthService;

use super::helpers::{print_json, print_table};
use crate::config::Config;

pub(crate) fn cmd_status(service: &HealthService, config: &Config, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct StatusOutput<'a> {
        database: &'a str,
        data_dir: &'a std::path::Path,
        schema_version: i64,
        tables: &'a [TableCount],
    }

    #[derive(Tabled)]
    struct CountRow {
        #[tabled(rename = "Table")]
        table: String,
        #[tabled(rename = "Rows")]
        rows: i64,
    }

    let counts = service.table_counts()?;
    let schema_version = service.database().schema_version();

    if json {
        return print_json(&StatusOutput {
            database: &config.connection_string,
            data_dir: &config.data_dir,
            schema_version,
            tables: &counts,
        });
    }

    println!("Database: {}", config.connection_string);
    println!("Schema version: {schema_version}");
    let rows: Vec<CountRow> = counts
        .iter()
        .map(|c| CountRow {
            table: c.table.to_string(),
            rows: c.rows,
        })
        .collect();
    print_table(&rows, 1);
    Ok(())
}
