pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod schema;
pub mod store;
pub mod table;
pub mod upsert;

use std::{env, path::Path, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{info, warn, LevelFilter};
use rusqlite::Connection;

use crate::{
    cli::{Cli, Commands},
    config::Config,
    error::StoreError,
    upsert::UpsertReport,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_store", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => handle_check(&args),
        Commands::Ingest(args) => handle_ingest(&args),
        Commands::Query(args) => handle_query(&args),
    }
}

fn handle_check(args: &cli::CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let tables = config.db_config.tables();
    info!(
        "Configuration {} is valid: {} table(s) [{}], store {}",
        args.config.display(),
        tables.len(),
        tables.join(", "),
        config.db_config.db_path.display()
    );
    println!("configuration ok: {}", tables.join(", "));
    Ok(())
}

fn handle_ingest(args: &cli::IngestArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let (mut conn, tables, batch_size) = store::connect(&config)?;
    info!(
        "Ingesting '{}' into {} table(s) (batch-size hint {batch_size}, advisory)",
        args.input.display(),
        tables.len()
    );
    let outcome = ingest_all(&mut conn, &config, &tables, args);
    // Release the connection on every exit path.
    if let Err((_conn, err)) = conn.close() {
        warn!("closing store: {err}");
    }
    outcome
}

/// Ingests each selected table from its sheet. A failing table is reported
/// and skipped; the remaining tables still run, and the first failure
/// decides the overall outcome.
fn ingest_all(
    conn: &mut Connection,
    config: &Config,
    tables: &[String],
    args: &cli::IngestArgs,
) -> Result<()> {
    let selected: Vec<(usize, String)> = match &args.table {
        Some(name) => {
            let idx = tables.iter().position(|t| t == name).ok_or_else(|| {
                StoreError::Config(format!(
                    "table '{name}' is not managed by this configuration"
                ))
            })?;
            vec![(idx, name.clone())]
        }
        None => tables.iter().cloned().enumerate().collect(),
    };

    let mut first_failure: Option<StoreError> = None;
    for (idx, table) in selected {
        // Default sheet assignment: sheet i feeds table i.
        let sheet = args.sheet.unwrap_or(idx);
        match ingest_table(conn, config, &table, &args.input, sheet) {
            Ok(report) => info!(
                "Table '{}': {}/{} row(s) upserted",
                report.table, report.succeeded, report.attempted
            ),
            Err(err) => {
                warn!("table '{table}' aborted: {err}");
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
        }
    }
    match first_failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn ingest_table(
    conn: &mut Connection,
    config: &Config,
    table: &str,
    input: &Path,
    sheet: usize,
) -> Result<UpsertReport, StoreError> {
    let mapping = config.table_mapping(table)?;
    let frame = frame::load_frame(input, sheet, &mapping)?;
    if frame.is_empty() {
        info!("Sheet {sheet} has no data rows for table '{table}'");
    }
    let created = schema::ensure_table(conn, &mapping)?;
    if !created {
        info!("Table '{table}' already exists, updating contents");
    }
    upsert::upsert(conn, &mapping, &frame)
}

fn handle_query(args: &cli::QueryArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    if !config.db_config.tables().iter().any(|t| t == &args.table) {
        return Err(StoreError::Config(format!(
            "table '{}' is not managed by this configuration",
            args.table
        ))
        .into());
    }
    let (conn, _tables, _batch_size) = store::connect(&config)?;
    let outcome = store::fetch_all(&conn, &args.table, args.limit);
    if let Err((_conn, err)) = conn.close() {
        warn!("closing store: {err}");
    }
    let frame = outcome?;
    info!("{} row(s) in '{}'", frame.rows.len(), args.table);
    table::print_frame(&frame);
    Ok(())
}
