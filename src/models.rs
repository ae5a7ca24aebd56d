use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level display variant of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// One layer per selected operator, line weight/colour by frequency.
    Lines,
    /// A single aggregate layer coloured per parish.
    #[default]
    Parishes,
}

impl MapMode {
    /// Parse the value of the `map` query parameter.
    pub fn from_query_value(v: &str) -> Option<Self> {
        match v.trim().to_ascii_lowercase().as_str() {
            "lines" => Some(MapMode::Lines),
            "parishes" => Some(MapMode::Parishes),
            _ => None,
        }
    }

    pub fn as_query_value(&self) -> &'static str {
        match self {
            MapMode::Lines => "lines",
            MapMode::Parishes => "parishes",
        }
    }
}

/// Basemap colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Dark,
    Light,
}

impl ColorMode {
    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Dark => ColorMode::Light,
            ColorMode::Light => ColorMode::Dark,
        }
    }
}

/// Key under which a layer is recorded as mounted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerKey {
    Operator(String),
    Parish,
    Municipalities,
}

impl LayerKey {
    /// Layers that belong to a map mode and are dropped on a full refresh.
    pub fn is_mode_scoped(&self) -> bool {
        !matches!(self, LayerKey::Municipalities)
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKey::Operator(id) => write!(f, "{id}"),
            LayerKey::Parish => write!(f, "parishes"),
            LayerKey::Municipalities => write!(f, "municipalities"),
        }
    }
}

/// Opaque handle identifying one mounted layer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerHandle(pub u64);

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Properties carried by one GeoJSON feature.
///
/// Line layers fill the route fields, parish layers the area names. Every
/// field defaults so a sparse feature still styles (as zero services).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default, deserialize_with = "de_f64_from_string_or_number")]
    pub services: f64,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    /// Mean headway in seconds.
    #[serde(default)]
    pub mean_headways: Option<f64>,
    #[serde(default, alias = "freguesia")]
    pub parish: Option<String>,
    #[serde(default, alias = "municipio", alias = "concelho")]
    pub municipality: Option<String>,
}

/// Serde helper: parse `f64` from a JSON number, a numeric string, or null.
fn de_f64_from_string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct F64Visitor;

    impl<'de> Visitor<'de> for F64Visitor {
        type Value = f64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number or a string representing a number")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v as f64)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v as f64)
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<f64>().map_err(E::custom)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(0.0)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(F64Visitor)
}

/// One GeoJSON feature; geometry is left to the map surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
}

/// Minimal GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_accepts_string_number_or_null() {
        let p: FeatureProperties = serde_json::from_str(r#"{"services":"7.5"}"#).unwrap();
        assert_eq!(p.services, 7.5);
        let p: FeatureProperties = serde_json::from_str(r#"{"services":3}"#).unwrap();
        assert_eq!(p.services, 3.0);
        let p: FeatureProperties = serde_json::from_str(r#"{"services":null}"#).unwrap();
        assert_eq!(p.services, 0.0);
        let p: FeatureProperties = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.services, 0.0);
    }

    #[test]
    fn parish_names_accept_portuguese_aliases() {
        let p: FeatureProperties =
            serde_json::from_str(r#"{"freguesia":"Arroios","municipio":"Lisboa","services":12}"#)
                .unwrap();
        assert_eq!(p.parish.as_deref(), Some("Arroios"));
        assert_eq!(p.municipality.as_deref(), Some("Lisboa"));
    }

    #[test]
    fn map_mode_query_values() {
        assert_eq!(MapMode::from_query_value("lines"), Some(MapMode::Lines));
        assert_eq!(MapMode::from_query_value("Parishes"), Some(MapMode::Parishes));
        assert_eq!(MapMode::from_query_value("heatmap"), None);
        assert_eq!(MapMode::default(), MapMode::Parishes);
    }

    #[test]
    fn municipalities_key_is_not_mode_scoped() {
        assert!(!LayerKey::Municipalities.is_mode_scoped());
        assert!(LayerKey::Parish.is_mode_scoped());
        assert!(LayerKey::Operator("CP".into()).is_mode_scoped());
        assert_eq!(LayerKey::Municipalities.to_string(), "municipalities");
    }
}
