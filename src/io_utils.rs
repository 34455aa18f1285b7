use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use regex::Regex;

use crate::error::{Error, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
    Inline(String),
}

impl Source {
    pub fn parse(value: &str) -> Result<Self> {
        if let Some(scheme) = url_scheme(value) {
            return if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
            {
                Ok(Source::Url(value.to_string()))
            } else {
                Err(Error::retrieval(
                    value,
                    format!("unsupported URL scheme '{scheme}'"),
                ))
            };
        }
        let path = Path::new(value);
        if is_dash(path) || path.is_file() {
            return Ok(Source::Path(path.to_path_buf()));
        }
        let trimmed = value.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Ok(Source::Inline(value.to_string()));
        }
        Err(Error::retrieval(value, "no such file"))
    }

    /// File name without extension, used for default table and database names.
    pub fn stem(&self) -> Option<String> {
        let name = match self {
            Source::Url(url) => url_path(url).rsplit('/').next()?.to_string(),
            Source::Path(path) if !is_dash(path) => {
                path.file_name()?.to_string_lossy().into_owned()
            }
            _ => return None,
        };
        let stem = match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name.as_str(),
        };
        (!stem.is_empty()).then(|| stem.to_string())
    }

    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Source::Url(url) => url_path(url).rsplit('/').next()?.to_string(),
            Source::Path(path) => path.file_name()?.to_string_lossy().into_owned(),
            Source::Inline(_) => return None,
        };
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Url(url) => url.clone(),
            Source::Path(path) if is_dash(path) => "stdin".to_string(),
            Source::Path(path) => path.display().to_string(),
            Source::Inline(_) => "inline JSON".to_string(),
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn url_scheme(value: &str) -> Option<&str> {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let pattern = SCHEME.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://").expect("static scheme pattern")
    });
    pattern
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    match without_query.split_once('/') {
        Some((_, path)) => path,
        None => "",
    }
}

pub fn fetch_bytes(source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Url(url) => {
            debug!("GET {url}");
            let response = reqwest::blocking::get(url.as_str())
                .and_then(|response| response.error_for_status())
                .map_err(|err| Error::retrieval(url, err))?;
            let bytes = response.bytes().map_err(|err| Error::retrieval(url, err))?;
            Ok(bytes.to_vec())
        }
        Source::Path(path) if is_dash(path) => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut buffer)
                .map_err(|err| Error::retrieval("stdin", err))?;
            Ok(buffer)
        }
        Source::Path(path) => {
            fs::read(path).map_err(|err| Error::retrieval(path.display().to_string(), err))
        }
        Source::Inline(text) => Ok(text.as_bytes().to_vec()),
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| Error::decode("text", format!("unknown encoding '{value}'")))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(Error::decode(
            "text",
            format!("input is not valid {}", encoding.name()),
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn resolve_input_delimiter(source: &Source, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match source.extension().as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use tempfile::NamedTempFile;

    #[test]
    fn urls_are_detected_by_scheme() {
        assert_eq!(
            Source::parse("https://example.com/data/cars.json").unwrap(),
            Source::Url("https://example.com/data/cars.json".to_string())
        );
        assert!(matches!(
            Source::parse("ftp://example.com/cars.csv"),
            Err(Error::Retrieval { .. })
        ));
    }

    #[test]
    fn existing_paths_and_inline_json() {
        let file = NamedTempFile::new().expect("temp file");
        let path = file.path().to_str().unwrap();
        assert_eq!(
            Source::parse(path).unwrap(),
            Source::Path(file.path().to_path_buf())
        );
        assert!(matches!(
            Source::parse(r#"[{"make": "Jeep"}]"#).unwrap(),
            Source::Inline(_)
        ));
        assert!(matches!(
            Source::parse("/definitely/not/here.csv"),
            Err(Error::Retrieval { .. })
        ));
    }

    #[test]
    fn stem_and_extension_come_from_the_file_name() {
        let url = Source::Url("https://example.com/exports/cars.json?page=2".to_string());
        assert_eq!(url.stem().as_deref(), Some("cars"));
        assert_eq!(url.extension().as_deref(), Some("json"));

        let path = Source::Path(PathBuf::from("/tmp/Fuel Data.CSV"));
        assert_eq!(path.stem().as_deref(), Some("Fuel Data"));
        assert_eq!(path.extension().as_deref(), Some("csv"));

        let bare = Source::Url("https://example.com".to_string());
        assert_eq!(bare.stem(), None);
        assert_eq!(Source::Inline("[]".to_string()).stem(), None);
    }

    #[test]
    fn decode_honours_encoding() {
        let (encoded, _, _) = WINDOWS_1252.encode("Caf\u{e9}");
        let encoding = resolve_encoding(Some("windows-1252")).unwrap();
        assert_eq!(decode_bytes(&encoded, encoding).unwrap(), "Caf\u{e9}");
        assert!(decode_bytes(&encoded, UTF_8).is_err());
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn tsv_extension_selects_tab_delimiter() {
        let tsv = Source::Path(PathBuf::from("data.tsv"));
        assert_eq!(resolve_input_delimiter(&tsv, None), b'\t');
        assert_eq!(resolve_input_delimiter(&tsv, Some(b';')), b';');
    }
}
