//! Static lookup tables behind the viewer: operators, selectable hours and
//! dates, the colour gradient and the bucketing maxima.
//!
//! The built-in Lisbon night-network catalog is available through
//! [`DataCatalog::lisbon`]; other regions can be described in JSON and
//! loaded with [`DataCatalog::load`], which validates the tables.

use crate::models::ColorMode;
use crate::style::{Gradient, Rgba};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const LISBON_BASE_URL: &str = "https://lisboaparapessoas.github.io/rede-madrugada/geojson";
pub const MAP_DARK: &str = "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png";
pub const MAP_LIGHT: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";

/// Service count that saturates the line gradient.
pub const MAX_SERVICES_LINE: f64 = 15.0;
/// Service count that saturates the parish gradient.
pub const MAX_SERVICES_PARISH: f64 = 60.0;

/// Date ids are compact calendar dates, e.g. `20250326`.
const DATE_ID_FORMAT: &str = "%Y%m%d";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no {0}")]
    Empty(&'static str),
    #[error("duplicate operator id {0:?}")]
    DuplicateOperator(String),
    #[error("duplicate date id {0:?}")]
    DuplicateDate(String),
    #[error("hour {0} listed more than once")]
    DuplicateHour(u8),
    #[error("hour {0} is not an hour of day (0..=23)")]
    HourOutOfRange(u8),
    #[error("date id {id:?} is not a YYYYMMDD date")]
    InvalidDate {
        id: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("{0} must be positive")]
    NonPositiveMaximum(&'static str),
}

/// Display metadata for one transit operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorMeta {
    pub id: String,
    #[serde(alias = "name")]
    pub display_name: String,
    pub color: Rgba,
}

impl OperatorMeta {
    fn new(id: &str, color: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            color: color.parse().unwrap_or(Rgba::WHITE),
        }
    }
}

/// One selectable service day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOption {
    pub id: String,
    pub label: String,
}

impl DateOption {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.id, DATE_ID_FORMAT).ok()
    }
}

/// Tile templates for the two colour modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basemaps {
    pub dark: String,
    pub light: String,
}

impl Default for Basemaps {
    fn default() -> Self {
        Self {
            dark: MAP_DARK.into(),
            light: MAP_LIGHT.into(),
        }
    }
}

fn default_boundary_color() -> Rgba {
    Rgba::rgb(0x9e, 0x9e, 0x9e)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCatalog {
    pub base_url: String,
    pub operators: Vec<OperatorMeta>,
    /// Selectable hours in display order; may wrap past midnight.
    pub hours: Vec<u8>,
    pub dates: Vec<DateOption>,
    pub gradient: Gradient,
    pub max_services_line: f64,
    pub max_services_parish: f64,
    #[serde(default = "default_boundary_color")]
    pub boundary_color: Rgba,
    #[serde(default)]
    pub basemaps: Basemaps,
}

impl Default for DataCatalog {
    fn default() -> Self {
        Self::lisbon()
    }
}

impl DataCatalog {
    /// The Lisbon night-network catalog.
    pub fn lisbon() -> Self {
        let operators = vec![
            OperatorMeta::new("Carris", "#003f8f", "Carris Municipal"),
            OperatorMeta::new("CarrisMetropolitana", "#ffdd01", "Carris Metropolitana"),
            OperatorMeta::new("MetroLisboa", "#ef5a34", "Metro Lisboa"),
            OperatorMeta::new("MobiCascais", "#31bcad", "MobiCascais"),
            OperatorMeta::new("MTS", "#218fce", "Metro Sul"),
            OperatorMeta::new("TCB", "#95cb4e", "TCBarreiro"),
            OperatorMeta::new("CP", "#74b751", "CP"),
            OperatorMeta::new("Fertagus", "#c74f4f", "Fertagus"),
            OperatorMeta::new("TTSL", "#ec6724", "TTSL"),
        ];
        let gradient = Gradient::new(
            [
                "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c",
                "#bd0026", "#800026", "#5c001c", "#3a0012",
            ]
            .iter()
            .filter_map(|c| c.parse().ok())
            .collect(),
        );
        Self {
            base_url: LISBON_BASE_URL.into(),
            operators,
            hours: vec![20, 21, 22, 23, 0, 1, 2, 3, 4, 5, 6, 7, 8],
            dates: vec![DateOption {
                id: "20250326".into(),
                label: "Dias úteis (Maio)".into(),
            }],
            gradient,
            max_services_line: MAX_SERVICES_LINE,
            max_services_parish: MAX_SERVICES_PARISH,
            boundary_color: default_boundary_color(),
            basemaps: Basemaps::default(),
        }
    }

    /// Parse and validate a catalog from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, CatalogError> {
        let catalog: DataCatalog = serde_json::from_str(s)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a JSON catalog file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.operators.is_empty() {
            return Err(CatalogError::Empty("operators"));
        }
        if self.dates.is_empty() {
            return Err(CatalogError::Empty("dates"));
        }
        if self.hours.is_empty() {
            return Err(CatalogError::Empty("hours"));
        }
        if self.gradient.is_empty() {
            return Err(CatalogError::Empty("gradient colours"));
        }

        let mut seen = HashSet::new();
        for op in &self.operators {
            if !seen.insert(op.id.as_str()) {
                return Err(CatalogError::DuplicateOperator(op.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for date in &self.dates {
            if !seen.insert(date.id.as_str()) {
                return Err(CatalogError::DuplicateDate(date.id.clone()));
            }
            NaiveDate::parse_from_str(&date.id, DATE_ID_FORMAT).map_err(|source| {
                CatalogError::InvalidDate {
                    id: date.id.clone(),
                    source,
                }
            })?;
        }

        let mut seen = HashSet::new();
        for &hour in &self.hours {
            if hour > 23 {
                return Err(CatalogError::HourOutOfRange(hour));
            }
            if !seen.insert(hour) {
                return Err(CatalogError::DuplicateHour(hour));
            }
        }

        if self.max_services_line.is_nan() || self.max_services_line <= 0.0 {
            return Err(CatalogError::NonPositiveMaximum("max_services_line"));
        }
        if self.max_services_parish.is_nan() || self.max_services_parish <= 0.0 {
            return Err(CatalogError::NonPositiveMaximum("max_services_parish"));
        }
        Ok(())
    }

    pub fn operator(&self, id: &str) -> Option<&OperatorMeta> {
        self.operators.iter().find(|op| op.id == id)
    }

    pub fn operator_ids(&self) -> impl Iterator<Item = &str> {
        self.operators.iter().map(|op| op.id.as_str())
    }

    pub fn date(&self, id: &str) -> Option<&DateOption> {
        self.dates.iter().find(|d| d.id == id)
    }

    /// First listed date; validated catalogs always have one.
    pub fn default_date(&self) -> &str {
        self.dates.first().map(|d| d.id.as_str()).unwrap_or_default()
    }

    pub fn hour_count(&self) -> usize {
        self.hours.len()
    }

    /// Literal hour behind a slider position.
    pub fn hour_at(&self, index: usize) -> Option<u8> {
        self.hours.get(index).copied()
    }

    /// Two-digit hour text for a slider position, e.g. `"00"`.
    pub fn hour_label(&self, index: usize) -> Option<String> {
        self.hour_at(index).map(|h| format!("{h:02}"))
    }

    pub fn basemap(&self, mode: ColorMode) -> &str {
        match mode {
            ColorMode::Dark => &self.basemaps.dark,
            ColorMode::Light => &self.basemaps.light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lisbon_catalog_is_valid() {
        let c = DataCatalog::lisbon();
        c.validate().unwrap();
        assert_eq!(c.gradient.len(), 11);
        assert_eq!(c.operators.len(), 9);
        assert_eq!(c.default_date(), "20250326");
        assert_eq!(
            c.dates[0].date(),
            NaiveDate::from_ymd_opt(2025, 3, 26)
        );
    }

    #[test]
    fn hour_labels_follow_slot_order() {
        let c = DataCatalog::lisbon();
        assert_eq!(c.hour_label(0).as_deref(), Some("20"));
        assert_eq!(c.hour_label(4).as_deref(), Some("00"));
        assert_eq!(c.hour_label(5).as_deref(), Some("01"));
        assert_eq!(c.hour_label(c.hour_count()), None);
    }

    #[test]
    fn validation_rejects_bad_tables() {
        let mut c = DataCatalog::lisbon();
        c.hours.push(20);
        assert!(matches!(c.validate(), Err(CatalogError::DuplicateHour(20))));

        let mut c = DataCatalog::lisbon();
        c.hours.push(24);
        assert!(matches!(c.validate(), Err(CatalogError::HourOutOfRange(24))));

        let mut c = DataCatalog::lisbon();
        c.dates[0].id = "2025-03-26".into();
        assert!(matches!(c.validate(), Err(CatalogError::InvalidDate { .. })));

        let mut c = DataCatalog::lisbon();
        c.operators.push(c.operators[0].clone());
        assert!(matches!(
            c.validate(),
            Err(CatalogError::DuplicateOperator(id)) if id == "Carris"
        ));

        let mut c = DataCatalog::lisbon();
        c.max_services_parish = 0.0;
        assert!(matches!(c.validate(), Err(CatalogError::NonPositiveMaximum(_))));
    }
}
