use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock},
};

use log::warn;

use crate::error::{Error, Result};

static SHARED: OnceLock<NameSanitizer> = OnceLock::new();

/// Memoizing sanitizer. The cache only grows; entries are never invalidated
/// because the mapping is pure.
#[derive(Debug, Default)]
pub struct NameSanitizer {
    cache: Mutex<HashMap<String, String>>,
}

impl NameSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sanitizer shared by every load in this process.
    pub fn shared() -> &'static NameSanitizer {
        SHARED.get_or_init(NameSanitizer::new)
    }

    pub fn sanitize(&self, name: &str) -> String {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hit) = cache.get(name) {
            return hit.clone();
        }
        let safe = sanitize_uncached(name);
        cache.insert(name.to_string(), safe.clone());
        safe
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or_default()
    }
}

pub fn sanitize(name: &str) -> String {
    NameSanitizer::shared().sanitize(name)
}

/// Sanitizes a user-facing name and rejects it if nothing survives.
/// Logs a warning when the name had to change.
pub fn sanitize_identifier(name: &str, context: &str) -> Result<String> {
    let safe = sanitize(name);
    if safe.is_empty() {
        return Err(Error::EmptyIdentifier {
            raw: name.to_string(),
            context: context.to_string(),
        });
    }
    if safe != name {
        warn!("'{name}' will be changed to '{safe}'");
    }
    Ok(safe)
}

fn sanitize_uncached(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_replaces_spaces() {
        assert_eq!(sanitize("Fuel Economy"), "fuel_economy");
        assert_eq!(sanitize("Order ID"), "order_id");
    }

    #[test]
    fn sanitize_drops_disallowed_characters() {
        assert_eq!(sanitize("$Percent%"), "percent");
        assert_eq!(sanitize("km/h (avg)"), "kmh_avg");
        assert_eq!(sanitize("Café"), "caf");
        assert_eq!(sanitize("tab\there"), "tabhere");
    }

    #[test]
    fn sanitize_keeps_digits_and_underscores() {
        assert_eq!(sanitize("field_2"), "field_2");
        assert_eq!(sanitize("2024 Total"), "2024_total");
    }

    #[test]
    fn fully_stripped_names_are_empty_and_rejected() {
        assert_eq!(sanitize("%%%"), "");
        assert_eq!(sanitize(""), "");
        let err = sanitize_identifier("???", "column name").unwrap_err();
        assert!(matches!(err, Error::EmptyIdentifier { .. }));
    }

    #[test]
    fn repeated_calls_reuse_the_cache() {
        let sanitizer = NameSanitizer::new();
        assert_eq!(sanitizer.sanitize("Make"), "make");
        assert_eq!(sanitizer.sanitize("Make"), "make");
        assert_eq!(sanitizer.sanitize("Model"), "model");
        assert_eq!(sanitizer.cached_len(), 2);
    }
}
