//! Launch options read from the page's URL query string.
//!
//! Recognised parameters:
//! - `date`: a catalog date id; unknown values fall back to the first date
//! - `map`: `lines` or `parishes`; anything else falls back to parishes
//! - `iframe`: present (with any value) when the viewer is embedded
//!
//! Invalid values are never surfaced to the user.

use crate::catalog::DataCatalog;
use crate::models::MapMode;
use percent_encoding::percent_decode_str;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub date: String,
    pub mode: MapMode,
    /// Drop the page chrome when embedded in another page.
    pub embedded: bool,
}

impl LaunchOptions {
    /// Defaults for a catalog: first date, parish map, not embedded.
    pub fn defaults(catalog: &DataCatalog) -> Self {
        Self {
            date: catalog.default_date().to_string(),
            mode: MapMode::default(),
            embedded: false,
        }
    }

    /// Parse a query string such as `?date=20250326&map=lines&iframe`.
    pub fn from_query(query: &str, catalog: &DataCatalog) -> Self {
        let params = parse_query(query);
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        let mut opts = Self::defaults(catalog);
        match get("date") {
            Some(date) if catalog.date(date).is_some() => opts.date = date.to_string(),
            Some(date) => log::debug!("ignoring unknown date parameter {date:?}"),
            None => {}
        }
        match get("map").map(|m| (m, MapMode::from_query_value(m))) {
            Some((_, Some(mode))) => opts.mode = mode,
            Some((raw, None)) => log::debug!("ignoring unknown map parameter {raw:?}"),
            None => {}
        }
        opts.embedded = get("iframe").is_some();
        opts
    }
}

/// Split a query string into decoded `(name, value)` pairs, in order.
///
/// `+` decodes to a space, as in HTML form encoding.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let decode = |s: &str| {
        let spaced = s.replace('+', " ");
        percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
    };
    query
        .trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}
