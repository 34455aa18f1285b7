//! Plain-text rendering of a planned schema for `--dry-run`.

use std::fmt::Write as _;

use crate::schema::Table;

/// One block per table: a heading, then a `column  type  constraint` grid.
pub fn render_schema(tables: &[Table]) -> String {
    let mut output = String::new();
    for (idx, table) in tables.iter().enumerate() {
        if idx > 0 {
            output.push('\n');
        }
        let heading = match &table.category_of {
            Some(column) => format!("{} (category values of '{column}')", table.name),
            None => table.name.clone(),
        };
        let _ = writeln!(output, "{heading}");
        let rows = table
            .columns
            .iter()
            .map(|column| {
                vec![
                    column.name.clone(),
                    column.kind.to_string(),
                    column.constraint.clone(),
                ]
            })
            .collect::<Vec<_>>();
        let headers = ["column", "type", "constraint"].map(String::from);
        output.push_str(&render_table(&headers, &rows));
    }
    output
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| format!("{value:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TypeKind};

    #[test]
    fn render_table_pads_columns() {
        let headers = vec!["name".to_string(), "type".to_string()];
        let rows = vec![vec!["fuel_economy".to_string(), "float".to_string()]];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "name          type");
        assert_eq!(lines[1], "------------  -----");
        assert_eq!(lines[2], "fuel_economy  float");
    }

    #[test]
    fn render_schema_labels_category_tables() {
        let tables = vec![
            Table {
                name: "features".to_string(),
                columns: vec![
                    Column::new("id", TypeKind::Id).with_constraint("PRIMARY KEY AUTOINCREMENT"),
                    Column::new("features", TypeKind::Unset).with_constraint("UNIQUE"),
                ],
                constraints: Vec::new(),
                category_of: Some("features".to_string()),
            },
            Table {
                name: "cars".to_string(),
                columns: vec![Column::new("features", TypeKind::Category)],
                constraints: Vec::new(),
                category_of: None,
            },
        ];
        let rendered = render_schema(&tables);
        assert!(rendered.starts_with("features (category values of 'features')\n"));
        assert!(rendered.contains("\ncars\n"));
        assert!(rendered.contains("features  category"));
    }
}
