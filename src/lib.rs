pub mod cli;
pub mod data;
pub mod decode;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod normalize;
pub mod sanitize;
pub mod schema;
pub mod sql;
pub mod table;

use std::{collections::BTreeMap, env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::Cli,
    io_utils::Source,
    load::{Destination, LoadOptions},
    schema::TypeKind,
};

pub use error::Error;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(verbosity: u8) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("prequel", level_for(verbosity));
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let source = Source::parse(&cli.dataset)
        .with_context(|| format!("Resolving dataset '{}'", cli.dataset))?;
    let options = load_options(&cli)?;
    debug!("Load options: {options:?}");

    if cli.dry_run {
        return handle_dry_run(&source, &options);
    }

    let result = load::load(&source, &options)
        .with_context(|| format!("Loading {}", source.describe()))?;
    if cli.summary_json {
        let rendered =
            serde_json::to_string_pretty(&result).context("Serializing load summary")?;
        println!("{rendered}");
    } else {
        println!(
            "OK: {} row(s) loaded into '{}' ({})",
            result.rows_loaded,
            result.table,
            result.database.display()
        );
    }
    Ok(())
}

fn handle_dry_run(source: &Source, options: &LoadOptions) -> Result<()> {
    info!("Planning load of {} without touching a database", source.describe());
    let plan = load::plan(source, options)
        .with_context(|| format!("Planning {}", source.describe()))?;
    print!("{}", table::render_schema(&plan.tables));
    println!();
    for statement in &plan.ddl {
        println!("{statement}");
    }
    println!("{}", plan.insert);
    println!("-- {} row(s) ready to insert", plan.rows.len());
    Ok(())
}

fn load_options(cli: &Cli) -> Result<LoadOptions> {
    let type_overrides = cli
        .typehints
        .iter()
        .map(|(name, hint)| {
            let kind = hint
                .parse::<TypeKind>()
                .with_context(|| format!("Parsing type hint for column '{name}'"))?;
            Ok((name.clone(), kind))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    let constraint_overrides = cli
        .column_constraints
        .iter()
        .cloned()
        .collect::<BTreeMap<_, _>>();

    let mut destination = Destination::default();
    if let Some(directory) = &cli.database_directory {
        destination.directory = directory.clone();
    }
    destination.file_name = cli.database_filename.clone();

    Ok(LoadOptions {
        explicit_column_names: cli.column_names.clone(),
        type_overrides,
        constraint_overrides,
        main_table_name: cli.table_name.clone(),
        destination,
        format: cli.format,
        encoding: cli.encoding.clone(),
        start_at_line: cli.start_at_line,
        json_key: cli.json_key.clone(),
        delimiter: cli.delimiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_log_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(7), LevelFilter::Trace);
    }

    #[test]
    fn cli_flags_become_load_options() {
        let cli = Cli::try_parse_from([
            "prequel",
            "cars.csv",
            "-t",
            "year=text",
            "-c",
            "make=NOT NULL",
            "-d",
            "/var/data",
            "--database-filename",
            "cars.sqlite",
            "--start-at-line",
            "3",
        ])
        .unwrap();
        let options = load_options(&cli).unwrap();
        assert_eq!(options.type_overrides["year"], TypeKind::Text);
        assert_eq!(options.constraint_overrides["make"], "NOT NULL");
        assert_eq!(options.start_at_line, 3);
        let source = Source::Path("cars.csv".into());
        assert_eq!(
            options.destination.resolve(&source, "cars"),
            std::path::PathBuf::from("/var/data/cars.sqlite")
        );
    }

    #[test]
    fn unknown_type_hint_is_rejected() {
        let cli = Cli::try_parse_from(["prequel", "cars.csv", "-t", "year=varchar"]).unwrap();
        assert!(load_options(&cli).is_err());
    }
}
