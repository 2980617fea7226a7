//! CRS registry: known coordinate reference systems and their definitions.
//!
//! Definitions are PROJ-style parameter strings (`+proj=tmerc +lat_0=...`).
//! The registry only stores them; resolving a definition for a code that was
//! never registered is the caller's error at transform time.
//!
//! Codes are compared after normalization, so `EPSG:4326`, `epsg:4326` and
//! `4326` all name the same entry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoordError;

/// Decimal digits shown for values in degrees.
pub const GEOGRAPHIC_DECIMALS: usize = 7;

/// Decimal digits shown for values in projected (metric) units.
pub const PROJECTED_DECIMALS: usize = 3;

/// Code of the geographic WGS 84 system.
pub const WGS84: &str = "4326";

/// The catalog installed by [`CrsRegistry::with_default_catalog`].
const DEFAULT_CATALOG: [(&str, &str, &str); 4] = [
    ("4326", "WGS 84", "+proj=longlat +datum=WGS84 +no_defs"),
    (
        "3116",
        "MAGNA-SIRGAS / Colombia Bogota zone",
        "+proj=tmerc +lat_0=4.59620041666667 +lon_0=-74.0775079166667 +k=0.9992 +x_0=1000000 +y_0=1000000 +ellps=GRS80 +units=m +no_defs",
    ),
    (
        "3115",
        "MAGNA-SIRGAS / Colombia transverse Mercator (lat 4, lon -73)",
        "+proj=tmerc +lat_0=4 +lon_0=-73 +k=1 +x_0=1000000 +y_0=1000000 +ellps=GRS80 +units=m +no_defs",
    ),
    (
        "9377",
        "MAGNA-SIRGAS / Origen-Nacional",
        "+proj=tmerc +lat_0=4.59620041666667 +lon_0=-74.0775079166667 +k=1 +x_0=1000000 +y_0=1000000 +ellps=GRS80 +units=m +no_defs",
    ),
];

/// A registered CRS.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrsDefinition {
    /// Normalized code (no `EPSG:` prefix).
    pub code: String,
    /// Human readable name; empty when registered without one.
    pub label: String,
    /// PROJ-style parameter string.
    pub proj: String,
}

impl CrsDefinition {
    /// True for lat/long systems (values in degrees).
    pub fn is_geographic(&self) -> bool {
        is_geographic_definition(&self.proj)
    }
}

/// Returns true if a PROJ string describes a geographic (lat/long) system.
pub fn is_geographic_definition(proj: &str) -> bool {
    proj.split_whitespace()
        .any(|p| p == "+proj=longlat" || p == "+proj=latlong")
}

/// Strips surrounding whitespace and an `EPSG:` prefix from a code.
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    match code.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => code[5..].trim().to_string(),
        _ => code.to_string(),
    }
}

/// Known CRS codes and their projection definitions.
#[derive(Clone, Debug, Default)]
pub struct CrsRegistry {
    definitions: BTreeMap<String, CrsDefinition>,
}

impl CrsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding WGS 84 and the MAGNA-SIRGAS projections.
    pub fn with_default_catalog() -> Self {
        let mut registry = Self::new();
        for (code, label, proj) in DEFAULT_CATALOG {
            registry.register_labeled(code, label, proj);
        }
        registry
    }

    /// Stores or overwrites the definition for `code`.
    pub fn register(&mut self, code: &str, proj: &str) {
        self.register_labeled(code, "", proj);
    }

    /// Stores or overwrites the definition for `code`, with a display label.
    pub fn register_labeled(&mut self, code: &str, label: &str, proj: &str) {
        let code = normalize_code(code);
        if self.definitions.contains_key(&code) {
            log::debug!("overwriting CRS definition for {}", code);
        }
        self.definitions.insert(
            code.clone(),
            CrsDefinition {
                code,
                label: label.to_string(),
                proj: proj.trim().to_string(),
            },
        );
    }

    /// Returns the projection string registered for `code`.
    pub fn resolve(&self, code: &str) -> Result<&str, CoordError> {
        self.get(code)
            .map(|d| d.proj.as_str())
            .ok_or_else(|| CoordError::UnknownCrs(code.trim().to_string()))
    }

    pub fn get(&self, code: &str) -> Option<&CrsDefinition> {
        self.definitions.get(&normalize_code(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// True if `code` is registered and geographic.
    pub fn is_geographic(&self, code: &str) -> bool {
        self.get(code).is_some_and(CrsDefinition::is_geographic)
    }

    /// Registered codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CrsDefinition> {
        self.definitions.values()
    }

    /// Decimal digits for displaying coordinates of a transform pair.
    ///
    /// Degrees need 7 digits, metres 3; if either endpoint is geographic the
    /// finer precision wins. Unregistered codes count as projected.
    pub fn display_decimals(&self, origin: &str, destination: &str) -> usize {
        if self.is_geographic(origin) || self.is_geographic(destination) {
            GEOGRAPHIC_DECIMALS
        } else {
            PROJECTED_DECIMALS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let registry = CrsRegistry::with_default_catalog();
        let codes: Vec<_> = registry.codes().collect();
        assert_eq!(codes, vec!["3115", "3116", "4326", "9377"]);
        assert!(registry.is_geographic("4326"));
        assert!(!registry.is_geographic("3116"));
    }

    #[test]
    fn test_4996_needs_explicit_registration() {
        let mut registry = CrsRegistry::with_default_catalog();
        assert!(matches!(registry.resolve("4996"), Err(CoordError::UnknownCrs(_))));

        registry.register("EPSG:4996", "+proj=longlat +ellps=GRS80 +no_defs");
        assert!(registry.is_geographic("4996"));
    }

    #[test]
    fn test_resolve_unknown_code() {
        let registry = CrsRegistry::with_default_catalog();
        let err = registry.resolve("EPSG:32618").unwrap_err();
        assert!(matches!(err, CoordError::UnknownCrs(code) if code == "EPSG:32618"));
    }

    #[test]
    fn test_code_normalization() {
        let registry = CrsRegistry::with_default_catalog();
        assert_eq!(normalize_code(" epsg: 3116 "), "3116");
        assert_eq!(normalize_code("EPSG:4326"), "4326");
        assert_eq!(normalize_code("9377"), "9377");
        assert_eq!(
            registry.resolve("EPSG:4326").unwrap(),
            registry.resolve("4326").unwrap()
        );
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = CrsRegistry::new();
        registry.register("1000", "+proj=longlat +ellps=GRS80");
        registry.register("EPSG:1000", "+proj=merc +ellps=GRS80");
        assert_eq!(registry.resolve("1000").unwrap(), "+proj=merc +ellps=GRS80");
        assert_eq!(registry.definitions().count(), 1);
    }

    #[test]
    fn test_display_decimals() {
        let registry = CrsRegistry::with_default_catalog();
        assert_eq!(registry.display_decimals("4326", "3116"), 7);
        assert_eq!(registry.display_decimals("3116", "4326"), 7);
        assert_eq!(registry.display_decimals("3116", "9377"), 3);
        assert_eq!(registry.display_decimals("nope", "3116"), 3);
    }

    #[test]
    fn test_latlong_alias_is_geographic() {
        assert!(is_geographic_definition("+proj=latlong +ellps=WGS84"));
        assert!(!is_geographic_definition("+proj=tmerc +lat_0=0"));
    }
}
