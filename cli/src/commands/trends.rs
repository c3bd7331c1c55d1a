use anyhow::Result;
use std::process;
use tabled::Tabled;
use tabled::builder::Builder;
use tabled::settings::{Alignment, Modify, Style, object::Columns};

use loseit_core::aggregate::{GroupBy, Trend};
use loseit_core::service::HealthService;

use super::helpers::{fmt_opt, print_json, print_table};

pub(crate) fn cmd_trends(
    service: &HealthService,
    start: &str,
    end: &str,
    metrics: &[String],
    group_by: &str,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Metric")]
        metric: String,
        #[tabled(rename = "Avg")]
        avg: String,
        #[tabled(rename = "Min")]
        min: String,
        #[tabled(rename = "Max")]
        max: String,
        #[tabled(rename = "Trend")]
        trend: String,
    }

    let group_by: GroupBy = group_by.parse()?;
    let report = service.trends(start, end, metrics, group_by)?;

    if json {
        return print_json(&report);
    }
    if report.data.is_empty() {
        eprintln!("No data between {start} and {end}");
        process::exit(2);
    }

    // Column order follows the metrics as requested, deduplicated.
    let mut columns: Vec<String> = Vec::new();
    for m in metrics {
        let name = m.trim().to_lowercase();
        if !columns.contains(&name) {
            columns.push(name);
        }
    }

    let mut builder = Builder::default();
    let mut header = vec![report.period.to_string()];
    header.extend(columns.iter().cloned());
    builder.push_record(header);
    for point in &report.data {
        let mut record = vec![point.period_label.clone()];
        record.extend(
            columns
                .iter()
                .map(|c| fmt_opt(point.values.get(c).copied().flatten(), 1)),
        );
        builder.push_record(record);
    }
    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    if let Some(stats) = &report.statistics {
        let rows: Vec<StatRow> = columns
            .iter()
            .map(|c| {
                let stat = stats.get(c).copied().flatten();
                StatRow {
                    metric: c.clone(),
                    avg: fmt_opt(stat.map(|s| s.avg), 1),
                    min: fmt_opt(stat.map(|s| s.min), 1),
                    max: fmt_opt(stat.map(|s| s.max), 1),
                    trend: match stat.and_then(|s| s.trend) {
                        Some(Trend::Increasing) => "increasing".to_string(),
                        Some(Trend::Decreasing) => "decreasing".to_string(),
                        Some(Trend::Stable) => "stable".to_string(),
                        None => "-".to_string(),
                    },
                }
            })
            .collect();
        print_table(&rows, 1);
    }
    Ok(())
}
