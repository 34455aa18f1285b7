use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sanitize::sanitize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Blob,
    Category,
    Id,
    Integer,
    Float,
    Numeric,
    Text,
    Object,
    Time,
    Real,
    #[default]
    Unset,
}

impl TypeKind {
    pub const ALL: [TypeKind; 11] = [
        TypeKind::Blob,
        TypeKind::Category,
        TypeKind::Id,
        TypeKind::Integer,
        TypeKind::Float,
        TypeKind::Numeric,
        TypeKind::Text,
        TypeKind::Object,
        TypeKind::Time,
        TypeKind::Real,
        TypeKind::Unset,
    ];

    /// SQLite storage type used in the column clause.
    pub fn sql_type(self) -> &'static str {
        match self {
            TypeKind::Blob => "BLOB",
            TypeKind::Category => "INTEGER",
            TypeKind::Id => "INTEGER",
            TypeKind::Integer => "INTEGER",
            TypeKind::Float => "REAL",
            TypeKind::Numeric => "NUMERIC",
            TypeKind::Text => "TEXT",
            TypeKind::Object => "INTEGER",
            TypeKind::Time => "DATETIME",
            TypeKind::Real => "REAL",
            TypeKind::Unset => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Blob => "blob",
            TypeKind::Category => "category",
            TypeKind::Id => "id",
            TypeKind::Integer => "integer",
            TypeKind::Float => "float",
            TypeKind::Numeric => "numeric",
            TypeKind::Text => "text",
            TypeKind::Object => "object",
            TypeKind::Time => "time",
            TypeKind::Real => "real",
            TypeKind::Unset => "unset",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Ok(TypeKind::Unset);
        }
        TypeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| Error::InvalidTypeHint {
                hint: value.to_string(),
                expected: TypeKind::ALL.map(TypeKind::as_str).join(", "),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub constraint: String,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            constraint: String::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<String>,
    /// For a category child table: the parent column whose values it holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_of: Option<String>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Applies type and constraint overrides to the inferred columns.
///
/// Override keys are sanitized the same way column names are, so `--typehint
/// "Fuel Economy=float"` reaches `fuel_economy`. A key that matches no column
/// is reported instead of ignored.
pub fn resolve(
    inferred: &[Column],
    overrides: &BTreeMap<String, TypeKind>,
    constraint_overrides: &BTreeMap<String, String>,
) -> Result<Vec<Column>> {
    let kinds = keyed_by_column(inferred, overrides, "type hint")?;
    let constraints = keyed_by_column(inferred, constraint_overrides, "column constraint")?;

    Ok(inferred
        .iter()
        .map(|column| Column {
            name: column.name.clone(),
            kind: kinds.get(&column.name).copied().unwrap_or(column.kind),
            constraint: constraints
                .get(&column.name)
                .map(|c| c.trim().to_string())
                .unwrap_or_default(),
        })
        .collect())
}

fn keyed_by_column<T: Clone>(
    columns: &[Column],
    overrides: &BTreeMap<String, T>,
    context: &str,
) -> Result<BTreeMap<String, T>> {
    let mut keyed = BTreeMap::new();
    for (raw, value) in overrides {
        let name = sanitize(raw);
        if !columns.iter().any(|c| c.name == name) {
            return Err(Error::UnknownColumn {
                column: raw.clone(),
                context: format!("{context} refers to a column not present in the dataset"),
            });
        }
        keyed.insert(name, value.clone());
    }
    Ok(keyed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inferred() -> Vec<Column> {
        vec![
            Column::new("make", TypeKind::Text),
            Column::new("year", TypeKind::Integer),
        ]
    }

    #[test]
    fn every_kind_has_one_sql_type() {
        let rendered = TypeKind::ALL.map(TypeKind::sql_type);
        assert_eq!(
            rendered,
            [
                "BLOB", "INTEGER", "INTEGER", "INTEGER", "REAL", "NUMERIC", "TEXT", "INTEGER",
                "DATETIME", "REAL", ""
            ]
        );
    }

    #[test]
    fn type_kind_parses_case_insensitively() {
        assert_eq!("TEXT".parse::<TypeKind>().unwrap(), TypeKind::Text);
        assert_eq!(" category ".parse::<TypeKind>().unwrap(), TypeKind::Category);
        assert_eq!("".parse::<TypeKind>().unwrap(), TypeKind::Unset);
        let err = "varchar".parse::<TypeKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidTypeHint { .. }));
    }

    #[test]
    fn override_replaces_inferred_kind() {
        let overrides = BTreeMap::from([("year".to_string(), TypeKind::Text)]);
        let resolved = resolve(&inferred(), &overrides, &BTreeMap::new()).unwrap();
        assert_eq!(resolved[1], Column::new("year", TypeKind::Text));
        assert_eq!(resolved[0], Column::new("make", TypeKind::Text));
    }

    #[test]
    fn constraint_override_is_attached() {
        let constraints = BTreeMap::from([("make".to_string(), "NOT NULL".to_string())]);
        let resolved = resolve(&inferred(), &BTreeMap::new(), &constraints).unwrap();
        assert_eq!(resolved[0].constraint, "NOT NULL");
        assert!(resolved[1].constraint.is_empty());
    }

    #[test]
    fn override_keys_are_sanitized_before_lookup() {
        let overrides = BTreeMap::from([("Year".to_string(), TypeKind::Numeric)]);
        let resolved = resolve(&inferred(), &overrides, &BTreeMap::new()).unwrap();
        assert_eq!(resolved[1].kind, TypeKind::Numeric);
    }

    #[test]
    fn override_for_missing_column_fails() {
        let overrides = BTreeMap::from([("yaer".to_string(), TypeKind::Text)]);
        let err = resolve(&inferred(), &overrides, &BTreeMap::new()).unwrap_err();
        match err {
            Error::UnknownColumn { column, .. } => assert_eq!(column, "yaer"),
            other => panic!("unexpected error {other:?}"),
        }

        let constraints = BTreeMap::from([("modle".to_string(), "UNIQUE".to_string())]);
        assert!(matches!(
            resolve(&inferred(), &BTreeMap::new(), &constraints),
            Err(Error::UnknownColumn { .. })
        ));
    }
}
