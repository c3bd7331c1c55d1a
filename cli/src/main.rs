mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    cmd_activity, cmd_calories, cmd_combine, cmd_food, cmd_load, cmd_macros, cmd_status,
    cmd_summary, cmd_sync, cmd_transform, cmd_trends, cmd_weight, json_error,
};
use config::Config;
use loseit_core::service::HealthService;

#[derive(Parser)]
#[command(
    name = "loseit",
    version,
    about = "Reconcile a LoseIt data export into daily tables and query trends"
)]
struct Cli {
    /// Database connection string or path (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an export directory into per-table CSV files
    Transform {
        /// Directory holding the exported CSV files
        export_dir: PathBuf,
        /// Output directory for the transformed tables
        #[arg(short, long, default_value = "transformed")]
        out: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge every CSV under a directory into one date-keyed file
    Combine {
        /// Directory to scan recursively
        dir: PathBuf,
        /// Output CSV file
        #[arg(short, long, default_value = "latest_data.csv")]
        out: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load a transformed directory into the database
    Load {
        /// Directory written by `transform`
        #[arg(long, default_value = "transformed")]
        dir: PathBuf,
        /// Clear each table before loading
        #[arg(long)]
        full: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Transform an export directory and load it in one step
    Sync {
        /// Directory holding the exported CSV files
        export_dir: PathBuf,
        /// Clear each table before loading
        #[arg(long)]
        full: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight and body fat
    Weight {
        #[command(flatten)]
        range: RangeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show calorie intake against budget
    Calories {
        #[command(flatten)]
        range: RangeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show steps, sleep and exercise
    Activity {
        #[command(flatten)]
        range: RangeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show protein, carbohydrate and fiber intake
    Macros {
        #[command(flatten)]
        range: RangeArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search logged food entries
    Food {
        #[command(flatten)]
        range: RangeArgs,
        /// Exact meal name (e.g. Breakfast)
        #[arg(long)]
        meal: Option<String>,
        /// Substring of the food name
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum number of entries (default: 100)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show everything recorded for one day
    Summary {
        /// Date (MM/DD/YYYY, today or yesterday)
        #[arg(default_value = "today")]
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate metrics over a date range
    Trends {
        /// Start date (MM/DD/YYYY, today or yesterday)
        #[arg(long)]
        start: String,
        /// End date (MM/DD/YYYY, today or yesterday)
        #[arg(long)]
        end: String,
        /// Metric to include; repeat or comma-separate (e.g. weight,steps)
        #[arg(short, long = "metric", required = true, value_delimiter = ',')]
        metrics: Vec<String>,
        /// Grouping: day, week or month
        #[arg(short, long, default_value = "day")]
        group_by: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show row counts for every table
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// A single `--date`, or `--start` together with `--end`.
#[derive(clap::Args)]
struct RangeArgs {
    /// Date (MM/DD/YYYY, today or yesterday)
    #[arg(long)]
    date: Option<String>,
    /// Range start (MM/DD/YYYY)
    #[arg(long)]
    start: Option<String>,
    /// Range end (MM/DD/YYYY)
    #[arg(long)]
    end: Option<String>,
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Transform { json, .. }
            | Commands::Combine { json, .. }
            | Commands::Load { json, .. }
            | Commands::Sync { json, .. }
            | Commands::Weight { json, .. }
            | Commands::Calories { json, .. }
            | Commands::Activity { json, .. }
            | Commands::Macros { json, .. }
            | Commands::Food { json, .. }
            | Commands::Summary { json, .. }
            | Commands::Trends { json, .. }
            | Commands::Status { json } => *json,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.command.json();

    if let Err(e) = run(cli) {
        if json {
            println!("{}", json_error(&e));
        } else {
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    dispatch(cli, Config::load)
}

/// Config is only resolved by commands that touch the database.
fn dispatch(cli: Cli, load_config: impl Fn(Option<&str>) -> Result<Config>) -> Result<()> {
    let db = cli.db.as_deref();
    let open = |full: bool| -> Result<HealthService> { load_config(db)?.open(full) };

    match cli.command {
        Commands::Transform {
            export_dir,
            out,
            json,
        } => cmd_transform(&export_dir, &out, json),
        Commands::Combine { dir, out, json } => cmd_combine(&dir, &out, json),
        Commands::Load { dir, full, json } => cmd_load(&open(full)?, &dir, json),
        Commands::Sync {
            export_dir,
            full,
            json,
        } => cmd_sync(&open(full)?, &export_dir, json),
        Commands::Weight { range, json } => cmd_weight(&open(false)?, &range.into(), json),
        Commands::Calories { range, json } => cmd_calories(&open(false)?, &range.into(), json),
        Commands::Activity { range, json } => cmd_activity(&open(false)?, &range.into(), json),
        Commands::Macros { range, json } => cmd_macros(&open(false)?, &range.into(), json),
        Commands::Food {
            range,
            meal,
            search,
            limit,
            json,
        } => cmd_food(&open(false)?, &range.into(), meal, search, limit, json),
        Commands::Summary { date, json } => cmd_summary(&open(false)?, &date, json),
        Commands::Trends {
            start,
            end,
            metrics,
            group_by,
            json,
        } => cmd_trends(&open(false)?, &start, &end, &metrics, &group_by, json),
        Commands::Status { json } => {
            let config = load_config(db)?;
            cmd_status(&config.open(false)?, &config, json)
        }
    }
}

impl From<RangeArgs> for commands::DateArgs {
    fn from(args: RangeArgs) -> Self {
        commands::DateArgs {
            date: args.date,
            start: args.start,
            end: args.end,
        }
    }
}
