//! Layer descriptors: what to load for a (mode, date, hour, operator) tuple and
//! how to style and describe its features.
//!
//! ### Resource locators
//! - lines: `{base}/{date}/{operator}_{HH}00_shapes_aggregated.geojson`
//! - parishes: `{base}/{date}/{HH}00.geojson`
//! - municipalities: `{base}/municipios.geojson`
//!
//! Typical usage:
//! ```
//! # use std::sync::Arc;
//! # use freqmap::{DataCatalog, LayerFactory, MapMode};
//! let factory = LayerFactory::new(Arc::new(DataCatalog::lisbon()));
//! let layer = factory.build(MapMode::Lines, "20250326", 0, Some("CP"))?;
//! assert!(layer.url.ends_with("/20250326/CP_0000_shapes_aggregated.geojson"));
//! # Ok::<(), freqmap::layer::LayerError>(())
//! ```

use crate::catalog::{DataCatalog, OperatorMeta};
use crate::models::{FeatureProperties, LayerKey, MapMode};
use crate::style::{FeatureStyle, Gradient, Rgba, boundary_style, line_style, parish_style};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("line layers need an operator")]
    MissingOperator,
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),
}

/// Which family a descriptor belongs to, with the metadata its popups need.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Lines { operator: OperatorMeta },
    Parishes,
    Municipalities,
}

/// Everything a map surface needs to mount one remote GeoJSON layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub key: LayerKey,
    pub url: String,
    pub kind: LayerKind,
    /// Date label shown in popups; `None` for date-independent layers.
    pub date_label: Option<String>,
    pub hour: Option<u8>,
    gradient: Gradient,
    max_services: f64,
    boundary_color: Rgba,
}

impl LayerDescriptor {
    /// Service count mapped to the top of the gradient.
    pub fn max_services(&self) -> f64 {
        self.max_services
    }

    pub fn mode(&self) -> Option<MapMode> {
        match self.kind {
            LayerKind::Lines { .. } => Some(MapMode::Lines),
            LayerKind::Parishes => Some(MapMode::Parishes),
            LayerKind::Municipalities => None,
        }
    }

    /// Per-feature style.
    pub fn style(&self, props: &FeatureProperties) -> FeatureStyle {
        match self.kind {
            LayerKind::Lines { .. } => {
                FeatureStyle::Line(line_style(props.services, &self.gradient, self.max_services))
            }
            LayerKind::Parishes => {
                FeatureStyle::Area(parish_style(props.services, &self.gradient, self.max_services))
            }
            LayerKind::Municipalities => FeatureStyle::Area(boundary_style(self.boundary_color)),
        }
    }

    /// Per-feature popup text.
    pub fn popup(&self, props: &FeatureProperties) -> String {
        let services = props.services.max(0.0).ceil() as u64;
        match &self.kind {
            LayerKind::Lines { operator } => {
                let route = match (&props.route_short_name, &props.route_long_name) {
                    (Some(short), Some(long)) => format!("{short}, {long}"),
                    (Some(name), None) | (None, Some(name)) => name.clone(),
                    (None, None) => "-".to_string(),
                };
                let headway = props
                    .mean_headways
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .map(|s| format!("{} minutos", (s / 60.0).ceil() as u64))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "{}\nLinha: {route}\nNr circulações: {services}\nIntervalo médio: {headway}",
                    operator.display_name
                )
            }
            LayerKind::Parishes => {
                let parish = props.parish.as_deref().unwrap_or("-");
                let place = match props.municipality.as_deref() {
                    Some(m) => format!("{parish} ({m})"),
                    None => parish.to_string(),
                };
                let hour = self.hour.map(|h| format!("{h:02}h")).unwrap_or_default();
                format!(
                    "{place}\n{}, {hour}\nNr circulações: {services}",
                    self.date_label.as_deref().unwrap_or("-")
                )
            }
            LayerKind::Municipalities => props.municipality.clone().unwrap_or_default(),
        }
    }
}

/// Session-wide running maxima of observed service counts.
///
/// Diagnostic only: bucketing always uses the catalog maxima.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyStats {
    pub max_line: f64,
    pub max_parish: f64,
    pub max_per_operator: BTreeMap<String, f64>,
}

impl FrequencyStats {
    pub fn observe(&mut self, key: &LayerKey, services: f64) {
        if !services.is_finite() {
            return;
        }
        match key {
            LayerKey::Operator(id) => {
                self.max_line = self.max_line.max(services);
                let entry = self.max_per_operator.entry(id.clone()).or_insert(0.0);
                *entry = entry.max(services);
            }
            LayerKey::Parish => self.max_parish = self.max_parish.max(services),
            LayerKey::Municipalities => {}
        }
    }
}

/// Builds layer descriptors from the catalog.
#[derive(Debug, Clone)]
pub struct LayerFactory {
    catalog: Arc<DataCatalog>,
    stats: FrequencyStats,
}

impl LayerFactory {
    pub fn new(catalog: Arc<DataCatalog>) -> Self {
        Self {
            catalog,
            stats: FrequencyStats::default(),
        }
    }

    pub fn catalog(&self) -> &DataCatalog {
        &self.catalog
    }

    /// Descriptor for a mode-scoped layer. `operator` is required for
    /// [`MapMode::Lines`] and ignored otherwise; `date` is not validated.
    pub fn build(
        &self,
        mode: MapMode,
        date: &str,
        hour: u8,
        operator: Option<&str>,
    ) -> Result<LayerDescriptor, LayerError> {
        match mode {
            MapMode::Lines => {
                let id = operator.ok_or(LayerError::MissingOperator)?;
                let meta = self
                    .catalog
                    .operator(id)
                    .ok_or_else(|| LayerError::UnknownOperator(id.to_string()))?;
                Ok(self.lines(date, hour, meta))
            }
            MapMode::Parishes => Ok(self.parishes(date, hour)),
        }
    }

    fn date_label(&self, date: &str) -> String {
        self.catalog
            .date(date)
            .map(|d| d.label.clone())
            .unwrap_or_else(|| date.to_string())
    }

    fn lines(&self, date: &str, hour: u8, operator: &OperatorMeta) -> LayerDescriptor {
        LayerDescriptor {
            key: LayerKey::Operator(operator.id.clone()),
            url: format!(
                "{}/{date}/{}_{hour:02}00_shapes_aggregated.geojson",
                self.catalog.base_url, operator.id
            ),
            kind: LayerKind::Lines {
                operator: operator.clone(),
            },
            date_label: Some(self.date_label(date)),
            hour: Some(hour),
            gradient: self.catalog.gradient.clone(),
            max_services: self.catalog.max_services_line,
            boundary_color: self.catalog.boundary_color,
        }
    }

    fn parishes(&self, date: &str, hour: u8) -> LayerDescriptor {
        LayerDescriptor {
            key: LayerKey::Parish,
            url: format!("{}/{date}/{hour:02}00.geojson", self.catalog.base_url),
            kind: LayerKind::Parishes,
            date_label: Some(self.date_label(date)),
            hour: Some(hour),
            gradient: self.catalog.gradient.clone(),
            max_services: self.catalog.max_services_parish,
            boundary_color: self.catalog.boundary_color,
        }
    }

    /// Date/hour independent boundary overlay.
    pub fn municipalities(&self) -> LayerDescriptor {
        LayerDescriptor {
            key: LayerKey::Municipalities,
            url: format!("{}/municipios.geojson", self.catalog.base_url),
            kind: LayerKind::Municipalities,
            date_label: None,
            hour: None,
            gradient: self.catalog.gradient.clone(),
            max_services: self.catalog.max_services_parish,
            boundary_color: self.catalog.boundary_color,
        }
    }

    pub fn stats(&self) -> &FrequencyStats {
        &self.stats
    }

    /// Record a service count observed while styling a loaded layer.
    pub fn observe(&mut self, key: &LayerKey, services: f64) {
        self.stats.observe(key, services);
    }
}
