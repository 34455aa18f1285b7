use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::decode::Format;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load a CSV or JSON dataset into SQLite with an inferred schema",
    long_about = None
)]
pub struct Cli {
    /// Path to a CSV or JSON file, an http(s) URL, or a JSON document
    pub dataset: String,
    /// Increase log detail (-v info, -vv SQL statements, -vvv every row)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Type hint for a column as `NAME=TYPE` (repeatable)
    #[arg(short = 't', long = "typehint", value_parser = parse_assignment, action = ArgAction::Append)]
    pub typehints: Vec<(String, String)>,
    /// SQL constraint for a column as `NAME=SQL`, e.g. `email=UNIQUE` (repeatable)
    #[arg(short = 'c', long = "column-constraint", value_parser = parse_assignment, action = ArgAction::Append)]
    pub column_constraints: Vec<(String, String)>,
    /// Column name to use instead of the CSV header (repeatable, in column order)
    #[arg(short = 'n', long = "column-name", action = ArgAction::Append)]
    pub column_names: Vec<String>,
    /// Name of the main table (tables are also known as relations)
    #[arg(short = 'r', long = "table-name")]
    pub table_name: Option<String>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(short = 'e', long = "encoding")]
    pub encoding: Option<String>,
    /// Directory for the database file (defaults to the system temp directory)
    #[arg(short = 'd', long = "database-directory")]
    pub database_directory: Option<PathBuf>,
    /// Database file name (defaults to `<dataset name>.db`)
    #[arg(long = "database-filename")]
    pub database_filename: Option<String>,
    /// Input format; detected from the extension or content when omitted
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    /// First CSV line to read, 1-indexed; earlier lines are skipped
    #[arg(long = "start-at-line", default_value_t = 1)]
    pub start_at_line: usize,
    /// Read JSON records from this key of the top-level object
    #[arg(long = "json-key")]
    pub json_key: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Print the planned schema and SQL without creating a database
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Print the load summary as JSON
    #[arg(long = "summary-json")]
    pub summary_json: bool,
}

pub fn parse_assignment(value: &str) -> Result<(String, String), String> {
    let (name, rhs) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected NAME=VALUE, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Missing column name in '{value}'"));
    }
    Ok((name.to_string(), rhs.trim().to_string()))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
