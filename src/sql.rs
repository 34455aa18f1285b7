//! SQL generation. Each `category` column gets a child table named after the
//! plural of the column, emitted before the table that references it.

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    error::{Error, Result},
    schema::{Column, Table, TypeKind},
};

pub fn pluralize(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

/// Double-quotes an identifier so keywords (`order`) and names starting
/// with a digit (`2024_total`) stay valid.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Lays out every table a load creates, children before their parent.
pub fn plan_tables(table_name: &str, columns: &[Column]) -> Result<Vec<Table>> {
    let mut tables = Vec::new();
    plan_into(table_name, columns, None, &mut tables)?;

    let mut seen = HashSet::new();
    for table in &tables {
        if !seen.insert(table.name.as_str()) {
            let reason = match &table.category_of {
                Some(column) => format!(
                    "category table for column '{column}' collides with another table of the same name"
                ),
                None => "main table name collides with a category table".to_string(),
            };
            return Err(Error::conflict(&table.name, reason));
        }
    }
    Ok(tables)
}

fn plan_into(
    name: &str,
    columns: &[Column],
    category_of: Option<&str>,
    tables: &mut Vec<Table>,
) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyIdentifier {
            raw: name.to_string(),
            context: "table name".to_string(),
        });
    }
    if columns.is_empty() {
        return Err(Error::EmptyTable {
            table: name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut constraints = Vec::new();
    for column in columns {
        if column.name.is_empty() {
            return Err(Error::EmptyIdentifier {
                raw: column.name.clone(),
                context: format!("column of table '{name}'"),
            });
        }
        if !seen.insert(column.name.as_str()) {
            return Err(Error::conflict(
                name,
                format!("column '{}' is defined more than once", column.name),
            ));
        }
        match column.kind {
            TypeKind::Category => {
                let child = pluralize(&column.name);
                let child_columns = [
                    Column::new("id", TypeKind::Id).with_constraint("PRIMARY KEY AUTOINCREMENT"),
                    Column::new(column.name.clone(), TypeKind::Unset).with_constraint("UNIQUE"),
                ];
                plan_into(&child, &child_columns, Some(column.name.as_str()), tables)?;
                constraints.push(format!(
                    "FOREIGN KEY({}) REFERENCES {}(\"id\") DEFERRABLE INITIALLY DEFERRED",
                    quote_identifier(&column.name),
                    quote_identifier(&child)
                ));
            }
            TypeKind::Object => {
                return Err(Error::UnsupportedType {
                    column: column.name.clone(),
                    kind: column.kind.to_string(),
                });
            }
            _ => {}
        }
    }

    tables.push(Table {
        name: name.to_string(),
        columns: columns.to_vec(),
        constraints,
        category_of: category_of.map(str::to_string),
    });
    Ok(())
}

/// Every `CREATE TABLE` statement for a load, in execution order.
///
/// The output depends only on the inputs, so calling this twice yields the
/// same statements byte for byte.
pub fn generate_ddl(table_name: &str, columns: &[Column]) -> Result<Vec<String>> {
    Ok(plan_tables(table_name, columns)?
        .iter()
        .map(create_table_sql)
        .collect())
}

pub fn create_table_sql(table: &Table) -> String {
    let clauses = table
        .columns
        .iter()
        .map(column_clause)
        .chain(table.constraints.iter().cloned())
        .join(",\n ");
    format!(
        "CREATE TABLE {} (\n {clauses}\n);",
        quote_identifier(&table.name)
    )
}

fn column_clause(column: &Column) -> String {
    let name = quote_identifier(&column.name);
    [
        name.as_str(),
        column.kind.sql_type(),
        column.constraint.trim(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .join(" ")
}

pub fn generate_insert(table_name: &str, column_count: usize) -> String {
    let placeholders = std::iter::repeat_n("?", column_count).join(", ");
    format!(
        "INSERT INTO {} VALUES ({placeholders});",
        quote_identifier(table_name)
    )
}

/// Adds a category value to its child table unless it is already there.
pub fn category_insert_sql(child: &Table, column: &str) -> String {
    format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES (?);",
        quote_identifier(&child.name),
        quote_identifier(column)
    )
}

pub fn category_lookup_sql(child: &Table, column: &str) -> String {
    format!(
        "SELECT \"id\" FROM {} WHERE {} = ?;",
        quote_identifier(&child.name),
        quote_identifier(column)
    )
}
