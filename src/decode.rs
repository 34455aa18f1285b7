use std::collections::BTreeSet;

use clap::ValueEnum;
use log::debug;

use crate::{
    data::{Record, Value},
    error::{Error, Result},
    io_utils::Source,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Csv => "CSV",
            Format::Json => "JSON",
        }
    }
}

/// Picks the decoder: explicit choice, then file extension, then a look at
/// the first non-blank character of the content.
pub fn infer_format(source: &Source, provided: Option<Format>, text: &str) -> Format {
    if let Some(format) = provided {
        return format;
    }
    if matches!(source, Source::Inline(_)) {
        return Format::Json;
    }
    match source.extension().as_deref() {
        Some("json") => return Format::Json,
        Some("csv" | "tsv" | "txt") => return Format::Csv,
        _ => {}
    }
    match text.trim_start_matches('\u{feff}').trim_start().chars().next() {
        Some('{' | '[') => Format::Json,
        _ => Format::Csv,
    }
}

/// Decodes a JSON object (one record) or array of objects.
///
/// With `key`, the records are read from that member of a top-level object,
/// as returned by APIs shaped like `{"d": [{...}, {...}]}`.
pub fn decode_json(text: &str, key: Option<&str>) -> Result<Vec<Record>> {
    let mut document: serde_json::Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|err| Error::decode("JSON", err))?;
    if let Some(key) = key {
        document = match document {
            serde_json::Value::Object(mut map) => map.remove(key).ok_or_else(|| {
                Error::decode("JSON", format!("top-level object has no key '{key}'"))
            })?,
            _ => {
                return Err(Error::decode(
                    "JSON",
                    format!("cannot select key '{key}' from a non-object document"),
                ));
            }
        };
    }

    let elements = match document {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        other => {
            return Err(Error::decode(
                "JSON",
                format!("expected an object or array of objects, found {}", kind_name(&other)),
            ));
        }
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| match element {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(label, value)| (label, Value::from(value)))
                .collect::<Record>()),
            other => Err(Error::decode(
                "JSON",
                format!("element {index} is {}, expected an object", kind_name(&other)),
            )),
        })
        .collect()
}

fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone)]
pub struct CsvOptions<'a> {
    pub delimiter: u8,
    /// Zero-based index of the first line to read (the header, unless
    /// `field_names` is given).
    pub skip_lines: usize,
    pub field_names: Option<&'a [String]>,
}

impl Default for CsvOptions<'_> {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_lines: 0,
            field_names: None,
        }
    }
}

/// Decodes CSV text into records keyed by header (or explicit) labels.
/// Empty fields become `Null`; every other field is text.
pub fn decode_csv(text: &str, options: &CsvOptions<'_>) -> Result<Vec<Record>> {
    let body = skip_lines(text.trim_start_matches('\u{feff}'), options.skip_lines);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(options.delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = reader.records();
    let headers = match options.field_names {
        Some(names) => names.to_vec(),
        None => match rows.next() {
            Some(header) => header
                .map_err(|err| Error::decode("CSV", err))?
                .iter()
                .map(str::to_string)
                .collect(),
            None => {
                debug!("CSV input has no header line");
                return Ok(Vec::new());
            }
        },
    };

    let mut seen = BTreeSet::new();
    for label in &headers {
        if !seen.insert(label.as_str()) {
            return Err(Error::conflict(
                label.as_str(),
                "CSV header repeats this column",
            ));
        }
    }

    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        let row = row.map_err(|err| Error::decode("CSV", err))?;
        if row.len() != headers.len() {
            return Err(Error::RowShape {
                index,
                expected: headers.len(),
                found: row.len(),
            });
        }
        let record = headers
            .iter()
            .zip(row.iter())
            .map(|(label, field)| {
                let value = if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                };
                (label.clone(), value)
            })
            .collect::<Record>();
        records.push(record);
    }
    Ok(records)
}

/// Drops the first `count` physical lines, blank ones included.
fn skip_lines(text: &str, count: usize) -> &str {
    if count == 0 {
        return text;
    }
    text.match_indices('\n')
        .nth(count - 1)
        .map_or("", |(idx, _)| &text[idx + 1..])
}
