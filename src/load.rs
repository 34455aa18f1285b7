//! Load orchestration. Everything up to schema generation runs before the
//! database is opened; rows are then committed one transaction per row.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use log::{debug, info, trace, warn};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Serialize;

use crate::{
    data::Value,
    decode::{self, CsvOptions, Format},
    error::{Error, Result},
    io_utils::{self, Source},
    normalize::normalize,
    sanitize::sanitize_identifier,
    schema::{Column, Table, TypeKind, resolve},
    sql,
};

pub const DEFAULT_TABLE_NAME: &str = "dataset";
pub const DATABASE_EXTENSION: &str = "db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    Fetching,
    Decoding,
    Normalizing,
    SchemaGenerating,
    SchemaExecuting,
    DataLoading,
    Done,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoadStage::Fetching => "fetching",
            LoadStage::Decoding => "decoding",
            LoadStage::Normalizing => "normalizing",
            LoadStage::SchemaGenerating => "generating schema",
            LoadStage::SchemaExecuting => "creating tables",
            LoadStage::DataLoading => "loading data",
            LoadStage::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Load failed while {stage} ({rows_loaded} row(s) committed): {error}")]
pub struct LoadFailure {
    pub stage: LoadStage,
    pub rows_loaded: usize,
    #[source]
    pub error: Error,
}

/// Where the SQLite file goes: `<directory>/<file_name>`, with the file name
/// defaulting to `<source stem>.db`.
#[derive(Debug, Clone)]
pub struct Destination {
    pub directory: PathBuf,
    pub file_name: Option<String>,
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir(),
            file_name: None,
        }
    }
}

impl Destination {
    pub fn resolve(&self, source: &Source, table_name: &str) -> PathBuf {
        let file_name = self.file_name.clone().unwrap_or_else(|| {
            let stem = source.stem().unwrap_or_else(|| table_name.to_string());
            format!("{stem}.{DATABASE_EXTENSION}")
        });
        self.directory.join(file_name)
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub explicit_column_names: Vec<String>,
    pub type_overrides: BTreeMap<String, TypeKind>,
    pub constraint_overrides: BTreeMap<String, String>,
    pub main_table_name: Option<String>,
    pub destination: Destination,
    pub format: Option<Format>,
    pub encoding: Option<String>,
    /// First line to read from CSV input, 1-indexed.
    pub start_at_line: usize,
    pub json_key: Option<String>,
    pub delimiter: Option<u8>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            explicit_column_names: Vec::new(),
            type_overrides: BTreeMap::new(),
            constraint_overrides: BTreeMap::new(),
            main_table_name: None,
            destination: Destination::default(),
            format: None,
            encoding: None,
            start_at_line: 1,
            json_key: None,
            delimiter: None,
        }
    }
}

/// Everything derived from a dataset before the database is touched.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub table: String,
    pub format: Format,
    pub columns: Vec<Column>,
    /// Tables in creation order, category tables first.
    pub tables: Vec<Table>,
    pub ddl: Vec<String>,
    pub insert: String,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub table: String,
    pub database: PathBuf,
    pub tables: Vec<String>,
    pub columns: Vec<Column>,
    pub rows_loaded: usize,
}

struct Progress {
    stage: LoadStage,
    rows_loaded: usize,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: LoadStage::Fetching,
            rows_loaded: 0,
        }
    }

    fn enter(&mut self, stage: LoadStage) {
        debug!("Load stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&self, error: Error) -> LoadFailure {
        LoadFailure {
            stage: self.stage,
            rows_loaded: self.rows_loaded,
            error,
        }
    }
}

/// Runs every stage up to schema generation and returns what would be
/// executed.
pub fn plan(source: &Source, options: &LoadOptions) -> Result<LoadPlan, LoadFailure> {
    let mut progress = Progress::new();
    build_plan(source, options, &mut progress).map_err(|err| progress.fail(err))
}

pub fn load(source: &Source, options: &LoadOptions) -> Result<LoadResult, LoadFailure> {
    let mut progress = Progress::new();
    let plan = build_plan(source, options, &mut progress).map_err(|err| progress.fail(err))?;
    let database = options.destination.resolve(source, &plan.table);
    execute_plan(&plan, &database, &mut progress).map_err(|err| progress.fail(err))?;
    progress.enter(LoadStage::Done);
    info!(
        "Loaded {} row(s) into '{}' at {:?}",
        progress.rows_loaded, plan.table, database
    );
    Ok(LoadResult {
        table: plan.table,
        database,
        tables: plan.tables.into_iter().map(|t| t.name).collect(),
        columns: plan.columns,
        rows_loaded: progress.rows_loaded,
    })
}

fn build_plan(source: &Source, options: &LoadOptions, progress: &mut Progress) -> Result<LoadPlan> {
    info!("Fetching {}", source.describe());
    let bytes = io_utils::fetch_bytes(source)?;

    progress.enter(LoadStage::Decoding);
    let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
    let text = io_utils::decode_bytes(&bytes, encoding)?;
    let format = decode::infer_format(source, options.format, &text);
    info!("Decoding {} as {}", source.describe(), format.as_str());
    let explicit = (!options.explicit_column_names.is_empty())
        .then_some(options.explicit_column_names.as_slice());
    let records = match format {
        Format::Json => {
            if options.start_at_line != 1 {
                warn!("--start-at-line only applies to CSV input and is ignored");
            }
            decode::decode_json(&text, options.json_key.as_deref())?
        }
        Format::Csv => {
            let skip_lines = options.start_at_line.checked_sub(1).ok_or_else(|| {
                Error::decode("CSV", "start line is 1-indexed and must be at least 1")
            })?;
            let csv_options = CsvOptions {
                delimiter: io_utils::resolve_input_delimiter(source, options.delimiter),
                skip_lines,
                field_names: explicit,
            };
            decode::decode_csv(&text, &csv_options)?
        }
    };
    debug!("Decoded {} record(s)", records.len());

    progress.enter(LoadStage::Normalizing);
    let normalized = normalize(&records, explicit)?;
    drop(records);

    progress.enter(LoadStage::SchemaGenerating);
    let raw_table = options
        .main_table_name
        .clone()
        .or_else(|| source.stem())
        .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
    let table = sanitize_identifier(&raw_table, "table name")?;
    let columns = resolve(
        &normalized.columns,
        &options.type_overrides,
        &options.constraint_overrides,
    )?;
    let tables = sql::plan_tables(&table, &columns)?;
    let ddl = tables.iter().map(sql::create_table_sql).collect();
    let insert = sql::generate_insert(&table, columns.len());

    Ok(LoadPlan {
        table,
        format,
        columns,
        tables,
        ddl,
        insert,
        rows: normalized.rows,
    })
}

fn execute_plan(plan: &LoadPlan, database: &Path, progress: &mut Progress) -> Result<()> {
    progress.enter(LoadStage::SchemaExecuting);
    info!("Creating tables in {database:?}");
    let mut conn = Connection::open(database)
        .map_err(Error::database(format!("opening {}", database.display())))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(Error::database("enabling foreign keys"))?;

    for table in &plan.tables {
        if table_exists(&conn, &table.name)? {
            return Err(Error::conflict(
                &table.name,
                format!("table already exists in {}", database.display()),
            ));
        }
    }
    for statement in &plan.ddl {
        debug!("{statement}");
        conn.execute(statement, [])
            .map_err(Error::database(format!("executing `{statement}`")))?;
    }

    progress.enter(LoadStage::DataLoading);
    info!("Inserting {} row(s) into '{}'", plan.rows.len(), plan.table);
    let categories = category_slots(plan);
    for (index, row) in plan.rows.iter().enumerate() {
        if row.len() != plan.columns.len() {
            return Err(Error::RowShape {
                index,
                expected: plan.columns.len(),
                found: row.len(),
            });
        }
        let values = row
            .iter()
            .zip(&plan.columns)
            .map(|(value, column)| value.clone().coerce(column.kind))
            .collect::<Vec<_>>();
        insert_row(&mut conn, plan, &categories, values, index)?;
        progress.rows_loaded += 1;
    }
    Ok(())
}

/// Column position and child table for each category column.
struct CategorySlot<'a> {
    position: usize,
    column: &'a str,
    insert: String,
    lookup: String,
}

fn category_slots(plan: &LoadPlan) -> Vec<CategorySlot<'_>> {
    plan.tables
        .iter()
        .filter_map(|child| {
            let column = child.category_of.as_deref()?;
            let position = plan.columns.iter().position(|c| c.name == column)?;
            Some(CategorySlot {
                position,
                column,
                insert: sql::category_insert_sql(child, column),
                lookup: sql::category_lookup_sql(child, column),
            })
        })
        .collect()
}

fn insert_row(
    conn: &mut Connection,
    plan: &LoadPlan,
    categories: &[CategorySlot<'_>],
    mut values: Vec<Value>,
    index: usize,
) -> Result<()> {
    let action = || format!("inserting record {index} into '{}'", plan.table);
    let tx = conn.transaction().map_err(Error::database(action()))?;
    for slot in categories {
        let value = &values[slot.position];
        if value.is_null() {
            continue;
        }
        tx.prepare_cached(&slot.insert)
            .and_then(|mut stmt| stmt.execute(params![value]))
            .map_err(Error::database(format!(
                "adding category value for '{}' from record {index}",
                slot.column
            )))?;
        let id: i64 = tx
            .prepare_cached(&slot.lookup)
            .and_then(|mut stmt| stmt.query_row(params![value], |row| row.get(0)))
            .map_err(Error::database(format!(
                "looking up category value for '{}' from record {index}",
                slot.column
            )))?;
        values[slot.position] = Value::Integer(id);
    }
    trace!(
        "{} <- [{}]",
        plan.table,
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    tx.prepare_cached(&plan.insert)
        .and_then(|mut stmt| stmt.execute(params_from_iter(values.iter())))
        .map_err(Error::database(action()))?;
    tx.commit().map_err(Error::database(action()))?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(Error::database(format!("checking for table '{name}'")))
}
