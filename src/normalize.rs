//! Turns ragged records into a fixed, sorted column set and positional rows.
//! Keys that sanitize to the same name share a column; the last non-null
//! one in key order supplies the value.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use log::debug;

use crate::{
    data::{Record, Value},
    error::{Error, Result},
    sanitize::{sanitize, sanitize_identifier},
    schema::{Column, TypeKind},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

pub fn normalize(records: &[Record], explicit_names: Option<&[String]>) -> Result<Normalized> {
    let names = match explicit_names {
        Some(names) => explicit_column_set(names)?,
        None => discovered_column_set(records)?,
    };
    let positions: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let mut hints: Vec<Option<TypeKind>> = vec![None; names.len()];
    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut row = vec![Value::Null; names.len()];
        for (raw, value) in record {
            let name = sanitize(raw);
            let idx = *positions
                .get(name.as_str())
                .ok_or_else(|| Error::UnknownColumn {
                    column: raw.clone(),
                    context: format!("record {index} has a field outside the explicit column names"),
                })?;
            // Slots start as null, so a null never displaces a merged value.
            if value.is_null() {
                continue;
            }
            if hints[idx].is_none() {
                hints[idx] = Some(value.inferred_kind());
            }
            row[idx] = value.clone();
        }
        rows.push(row);
    }

    let columns = names
        .into_iter()
        .zip(hints)
        .map(|(name, hint)| Column::new(name, hint.unwrap_or_default()))
        .collect::<Vec<_>>();
    debug!(
        "Normalized {} record(s) into columns [{}]",
        rows.len(),
        columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.kind))
            .join(", ")
    );
    Ok(Normalized { columns, rows })
}

fn discovered_column_set(records: &[Record]) -> Result<Vec<String>> {
    let raw_keys = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect::<BTreeSet<_>>();
    let mut names = BTreeSet::new();
    for raw in raw_keys {
        names.insert(sanitize_identifier(raw, "field label")?);
    }
    Ok(names.into_iter().collect())
}

fn explicit_column_set(explicit: &[String]) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();
    for raw in explicit {
        let name = sanitize_identifier(raw, "explicit column name")?;
        if !names.insert(name.clone()) {
            return Err(Error::conflict(
                name,
                "explicit column names collide after sanitizing",
            ));
        }
    }
    Ok(names.into_iter().collect())
}
