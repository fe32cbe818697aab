use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load spreadsheet data into a SQLite store from a declarative JSON mapping", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a configuration document without touching the store
    Check(CheckArgs),
    /// Ingest a spreadsheet into the configured tables (create-or-update)
    Ingest(IngestArgs),
    /// Print all rows of a configured table as a formatted text table
    Query(QueryArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Configuration document (JSON)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Spreadsheet file to ingest (.xlsx, .xls, .ods)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Configuration document (JSON)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Zero-based sheet index (defaults to one sheet per configured table)
    #[arg(long)]
    pub sheet: Option<usize>,
    /// Restrict ingestion to a single configured table
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Configuration document (JSON)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Table to read
    #[arg(short = 't', long = "table")]
    pub table: String,
    /// Maximum number of rows to print
    #[arg(long)]
    pub limit: Option<usize>,
}
