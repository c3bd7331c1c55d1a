use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use tabled::Tabled;

use loseit_core::dates;
use loseit_core::loader::{LoadMode, LoadSummary};
use loseit_core::models::Table;
use loseit_core::pipeline::{self, SourceReport, SourceStatus, TransformReport};
use loseit_core::reconcile::MergeCollision;
use loseit_core::service::HealthService;
use loseit_core::transformed;

use super::helpers::{print_json, print_table};

fn print_sources(report: &TransformReport) {
    #[derive(Tabled)]
    struct SourceRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Table")]
        table: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Detail")]
        detail: String,
    }

    let rows: Vec<SourceRow> = report
        .sources
        .iter()
        .map(|s: &SourceReport| {
            let (status, detail) = match &s.status {
                SourceStatus::Processed {
                    rows,
                    skipped_rows,
                    degraded_dates,
                } => (
                    "processed",
                    format!("{rows} rows, {skipped_rows} skipped, {degraded_dates} degraded dates"),
                ),
                SourceStatus::Missing => ("missing", String::new()),
                SourceStatus::Skipped { reason } => ("skipped", reason.clone()),
                SourceStatus::Failed { reason } => ("failed", reason.clone()),
            };
            SourceRow {
                source: s.source.clone(),
                table: s.table.to_string(),
                status: status.to_string(),
                detail,
            }
        })
        .collect();

    print_table(&rows, 4);
}

fn print_collisions(collisions: &[&MergeCollision]) {
    if collisions.is_empty() {
        return;
    }
    eprintln!("{} value(s) overwritten by a later source:", collisions.len());
    for c in collisions {
        eprintln!(
            "  {} {}: {} ({}) -> {} ({})",
            dates::denormalize(&c.date),
            c.field,
            c.previous_value,
            c.previous_source,
            c.value,
            c.source
        );
    }
}

fn print_loads(loads: &[LoadSummary]) {
    #[derive(Tabled)]
    struct LoadRow {
        #[tabled(rename = "Table")]
        table: String,
        #[tabled(rename = "Mode")]
        mode: String,
        #[tabled(rename = "Rows")]
        rows: String,
        #[tabled(rename = "Batches")]
        batches: usize,
        #[tabled(rename = "Dates replaced")]
        dates_cleared: usize,
    }

    let rows: Vec<LoadRow> = loads
        .iter()
        .map(|l| LoadRow {
            table: l.table.to_string(),
            mode: match l.mode {
                LoadMode::Incremental => "incremental".to_string(),
                LoadMode::Full => "full".to_string(),
            },
            rows: if l.skipped {
                "no data".to_string()
            } else {
                l.rows_written.to_string()
            },
            batches: l.batches,
            dates_cleared: l.dates_cleared,
        })
        .collect();

    print_table(&rows, 2);
}

pub(crate) fn cmd_transform(export_dir: &Path, out: &Path, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct TransformOutput<'a> {
        report: &'a TransformReport,
        rows: BTreeMap<Table, usize>,
        collisions: &'a [&'a MergeCollision],
        files: &'a [PathBuf],
    }

    let set = pipeline::transform_export(export_dir)
        .with_context(|| format!("Failed to transform {}", export_dir.display()))?;
    let files = transformed::write_transformed(out, &set)?;
    let collisions: Vec<&MergeCollision> = set.collisions().collect();

    if json {
        return print_json(&TransformOutput {
            report: &set.report,
            rows: Table::ALL.iter().map(|t| (*t, set.row_count(*t))).collect(),
            collisions: &collisions,
            files: &files,
        });
    }

    print_sources(&set.report);
    print_collisions(&collisions);
    for table in Table::ALL {
        let n = set.row_count(table);
        println!("  {table}: {n} rows");
    }
    println!(
        "Wrote {} file(s) to {} ({} of {} sources processed)",
        files.len(),
        out.display(),
        set.report.processed(),
        set.report.sources.len()
    );
    Ok(())
}

pub(crate) fn cmd_combine(dir: &Path, out: &Path, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct CombineOutput<'a> {
        output: &'a Path,
        files: &'a [PathBuf],
        columns: &'a [String],
        records: usize,
    }

    let combined = pipeline::combine_directory(dir)
        .with_context(|| format!("Failed to combine {}", dir.display()))?;

    if combined.records.is_empty() {
        if json {
            return print_json(&CombineOutput {
                output: out,
                files: &combined.files,
                columns: &combined.columns,
                records: 0,
            });
        }
        eprintln!("No dated rows found under {}", dir.display());
        process::exit(2);
    }

    let file =
        File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;
    combined.write_csv(BufWriter::new(file))?;

    if json {
        return print_json(&CombineOutput {
            output: out,
            files: &combined.files,
            columns: &combined.columns,
            records: combined.records.len(),
        });
    }

    println!(
        "Combined {} file(s) into {} ({} dates, {} columns)",
        combined.files.len(),
        out.display(),
        combined.records.len(),
        combined.columns.len() + 1
    );
    Ok(())
}

pub(crate) fn cmd_load(service: &HealthService, dir: &Path, json: bool) -> Result<()> {
    let mode = LoadMode::from_config(service.config());
    let loads = service
        .load_transformed(dir, mode)
        .with_context(|| format!("Failed to load {}", dir.display()))?;

    if json {
        return print_json(&loads);
    }

    print_loads(&loads);
    Ok(())
}

pub(crate) fn cmd_sync(service: &HealthService, export_dir: &Path, json: bool) -> Result<()> {
    let outcome = service
        .sync_export(export_dir)
        .with_context(|| format!("Failed to sync {}", export_dir.display()))?;

    if json {
        return print_json(&outcome);
    }

    print_sources(&outcome.report);
    let collisions: Vec<&MergeCollision> = outcome.collisions.iter().collect();
    print_collisions(&collisions);
    print_loads(&outcome.loads);
    Ok(())
}
