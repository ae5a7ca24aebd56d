use crate::catalog::DataCatalog;
use crate::launch::LaunchOptions;
use crate::models::{ColorMode, LayerHandle, LayerKey, MapMode};
use crate::prefs::Preferences;
use std::collections::{BTreeMap, BTreeSet};

/// Everything the viewer currently shows.
///
/// Owned by a single [`Session`](crate::Session); the synchronizer derives a
/// new value from the old one on every event.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub date: String,
    /// Position in the catalog's hour slots, not a literal hour.
    pub hour_index: usize,
    /// Selected operators; only drives layers in [`MapMode::Lines`].
    pub operators: BTreeSet<String>,
    pub mode: MapMode,
    pub color_mode: ColorMode,
    pub detailed_mode: bool,
    pub mounted: BTreeMap<LayerKey, LayerHandle>,
    next_handle: u64,
}

impl ViewState {
    /// Nothing mounted yet; all operators selected, first hour slot.
    pub fn new(date: impl Into<String>, mode: MapMode, operators: BTreeSet<String>) -> Self {
        Self {
            date: date.into(),
            hour_index: 0,
            operators,
            mode,
            color_mode: ColorMode::default(),
            detailed_mode: true,
            mounted: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Session start state from launch options and stored preferences.
    pub fn initial(catalog: &DataCatalog, launch: &LaunchOptions, prefs: &Preferences) -> Self {
        let operators = catalog.operator_ids().map(str::to_string).collect();
        let mut state = Self::new(launch.date.clone(), launch.mode, operators);
        state.color_mode = prefs.color_mode;
        state.detailed_mode = prefs.detailed_mode;
        state
    }

    pub(crate) fn mint_handle(&mut self) -> LayerHandle {
        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    pub fn handle(&self, key: &LayerKey) -> Option<LayerHandle> {
        self.mounted.get(key).copied()
    }

    pub fn municipalities(&self) -> Option<LayerHandle> {
        self.handle(&LayerKey::Municipalities)
    }

    pub fn is_mounted(&self, key: &LayerKey) -> bool {
        self.mounted.contains_key(key)
    }

    pub fn mounted_keys(&self) -> impl Iterator<Item = &LayerKey> {
        self.mounted.keys()
    }

    /// Literal hour of the current slot.
    pub fn hour(&self, catalog: &DataCatalog) -> Option<u8> {
        catalog.hour_at(self.hour_index)
    }

    /// Two-digit text shown next to the hour control.
    pub fn hour_label(&self, catalog: &DataCatalog) -> String {
        catalog.hour_label(self.hour_index).unwrap_or_default()
    }
}
