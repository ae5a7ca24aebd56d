//! Layer synchronization: the transition function from `(ViewState, Event)` to
//! the next state plus the map-surface commands that realise it.
//!
//! The function is pure. Commands are executed by the owner of the map
//! surface ([`Session`](crate::Session)), never here.
//!
//! ### Rules
//! - Date, hour, mode and wholesale operator changes are full refreshes: every
//!   mode-scoped layer is unmounted and the implied layers are mounted fresh.
//! - Enabling one operator mounts exactly that operator's layer; disabling one
//!   unmounts exactly that layer, if present.
//! - The municipal boundary overlay is mounted once per session and kept
//!   above the parish layer, also after late parish data arrives.

use crate::catalog::DataCatalog;
use crate::layer::{LayerDescriptor, LayerError, LayerFactory};
use crate::models::{ColorMode, LayerHandle, LayerKey, MapMode};
use crate::state::ViewState;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A state transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Re-mount everything the current state implies.
    Refresh,
    SelectDate(String),
    /// Select an hour slot by position.
    SelectHour(usize),
    ReplaceOperators(BTreeSet<String>),
    EnableOperator(String),
    DisableOperator(String),
    SelectMode(MapMode),
    /// A mounted layer finished loading its remote data.
    LayerLoaded(LayerHandle),
    SetColorMode(ColorMode),
    SetDetailedMode(bool),
}

/// One instruction for the map surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    Mount {
        handle: LayerHandle,
        descriptor: LayerDescriptor,
    },
    Unmount {
        key: LayerKey,
        handle: LayerHandle,
    },
    BringToBack(LayerHandle),
    BringToFront(LayerHandle),
    SetBasemap(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("unknown date {0:?}")]
    UnknownDate(String),
    #[error("hour index {index} out of range (0..{count})")]
    HourOutOfRange { index: usize, count: usize },
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Outcome of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ViewState,
    pub commands: Vec<MapCommand>,
}

#[derive(Debug, Clone)]
pub struct LayerSynchronizer {
    factory: LayerFactory,
}

impl LayerSynchronizer {
    pub fn new(catalog: Arc<DataCatalog>) -> Self {
        Self {
            factory: LayerFactory::new(catalog),
        }
    }

    pub fn catalog(&self) -> &DataCatalog {
        self.factory.catalog()
    }

    pub fn factory(&self) -> &LayerFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut LayerFactory {
        &mut self.factory
    }

    /// Compute the next state and the commands that get the surface there.
    ///
    /// On error `current` is untouched and nothing must be executed.
    pub fn apply(&self, current: &ViewState, event: Event) -> Result<Transition, TransitionError> {
        let mut state = current.clone();
        let mut commands = Vec::new();
        let catalog = self.catalog();

        match event {
            Event::Refresh => self.full_refresh(&mut state, &mut commands)?,
            Event::SelectDate(date) => {
                if catalog.date(&date).is_none() {
                    return Err(TransitionError::UnknownDate(date));
                }
                state.date = date;
                self.full_refresh(&mut state, &mut commands)?;
            }
            Event::SelectHour(index) => {
                let count = catalog.hour_count();
                if index >= count {
                    return Err(TransitionError::HourOutOfRange { index, count });
                }
                state.hour_index = index;
                self.full_refresh(&mut state, &mut commands)?;
            }
            Event::ReplaceOperators(operators) => {
                if let Some(unknown) = operators.iter().find(|id| catalog.operator(id).is_none()) {
                    return Err(TransitionError::UnknownOperator(unknown.clone()));
                }
                state.operators = operators;
                self.full_refresh(&mut state, &mut commands)?;
            }
            Event::EnableOperator(id) => {
                if catalog.operator(&id).is_none() {
                    return Err(TransitionError::UnknownOperator(id));
                }
                let key = LayerKey::Operator(id.clone());
                state.operators.insert(id.clone());
                if state.mode == MapMode::Lines && !state.is_mounted(&key) {
                    let hour = self.current_hour(&state)?;
                    let descriptor =
                        self.factory
                            .build(MapMode::Lines, &state.date, hour, Some(id.as_str()))?;
                    mount(&mut state, &mut commands, descriptor);
                }
            }
            Event::DisableOperator(id) => {
                let key = LayerKey::Operator(id.clone());
                state.operators.remove(&id);
                if let Some(handle) = state.mounted.remove(&key) {
                    commands.push(MapCommand::Unmount { key, handle });
                }
            }
            Event::SelectMode(mode) => {
                state.mode = mode;
                self.full_refresh(&mut state, &mut commands)?;
            }
            Event::LayerLoaded(handle) => {
                // Late data for a replaced layer is ignored.
                if state.handle(&LayerKey::Parish) == Some(handle) {
                    reassert_z_order(&state, &mut commands);
                }
            }
            Event::SetColorMode(mode) => {
                state.color_mode = mode;
                commands.push(MapCommand::SetBasemap(catalog.basemap(mode).to_string()));
            }
            Event::SetDetailedMode(detailed) => state.detailed_mode = detailed,
        }

        Ok(Transition { state, commands })
    }

    fn current_hour(&self, state: &ViewState) -> Result<u8, TransitionError> {
        state
            .hour(self.catalog())
            .ok_or(TransitionError::HourOutOfRange {
                index: state.hour_index,
                count: self.catalog().hour_count(),
            })
    }

    fn full_refresh(
        &self,
        state: &mut ViewState,
        commands: &mut Vec<MapCommand>,
    ) -> Result<(), TransitionError> {
        let hour = self.current_hour(state)?;

        let stale: Vec<LayerKey> = state
            .mounted
            .keys()
            .filter(|k| k.is_mode_scoped())
            .cloned()
            .collect();
        for key in stale {
            if let Some(handle) = state.mounted.remove(&key) {
                commands.push(MapCommand::Unmount { key, handle });
            }
        }

        match state.mode {
            MapMode::Lines => {
                // Catalog order keeps the draw order stable.
                let selected: Vec<String> = self
                    .catalog()
                    .operator_ids()
                    .filter(|id| state.operators.contains(*id))
                    .map(str::to_string)
                    .collect();
                for id in selected {
                    let descriptor =
                        self.factory
                            .build(MapMode::Lines, &state.date, hour, Some(id.as_str()))?;
                    mount(state, commands, descriptor);
                }
            }
            MapMode::Parishes => {
                let descriptor = self.factory.build(MapMode::Parishes, &state.date, hour, None)?;
                mount(state, commands, descriptor);
                if state.municipalities().is_none() {
                    mount(state, commands, self.factory.municipalities());
                }
                reassert_z_order(state, commands);
            }
        }
        Ok(())
    }
}

fn mount(state: &mut ViewState, commands: &mut Vec<MapCommand>, descriptor: LayerDescriptor) {
    let handle = state.mint_handle();
    state.mounted.insert(descriptor.key.clone(), handle);
    commands.push(MapCommand::Mount { handle, descriptor });
}

/// Parish fill at the back, municipal outlines on top.
fn reassert_z_order(state: &ViewState, commands: &mut Vec<MapCommand>) {
    if let Some(parish) = state.handle(&LayerKey::Parish) {
        commands.push(MapCommand::BringToBack(parish));
    }
    if let Some(boundaries) = state.municipalities() {
        commands.push(MapCommand::BringToFront(boundaries));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(mode: MapMode, ops: &[&str]) -> (LayerSynchronizer, ViewState) {
        let catalog = Arc::new(DataCatalog::lisbon());
        let sync = LayerSynchronizer::new(catalog.clone());
        let operators = ops.iter().map(|s| s.to_string()).collect();
        let state = ViewState::new(catalog.default_date(), mode, operators);
        (sync, state)
    }

    fn keys(state: &ViewState) -> Vec<LayerKey> {
        state.mounted_keys().cloned().collect()
    }

    #[test]
    fn refresh_mounts_selected_operators_in_catalog_order() {
        let (sync, state) = setup(MapMode::Lines, &["TTSL", "Carris"]);
        let t = sync.apply(&state, Event::Refresh).unwrap();
        let mounted: Vec<&LayerKey> = t
            .commands
            .iter()
            .filter_map(|c| match c {
                MapCommand::Mount { descriptor, .. } => Some(&descriptor.key),
                _ => None,
            })
            .collect();
        assert_eq!(
            mounted,
            vec![
                &LayerKey::Operator("Carris".into()),
                &LayerKey::Operator("TTSL".into())
            ]
        );
    }

    #[test]
    fn enabling_mounted_operator_is_a_no_op() {
        let (sync, state) = setup(MapMode::Lines, &["CP"]);
        let state = sync.apply(&state, Event::Refresh).unwrap().state;
        let t = sync.apply(&state, Event::EnableOperator("CP".into())).unwrap();
        assert!(t.commands.is_empty());
        assert_eq!(t.state, state);
    }

    #[test]
    fn disabling_absent_layer_is_a_no_op() {
        let (sync, state) = setup(MapMode::Lines, &["CP"]);
        let t = sync
            .apply(&state, Event::DisableOperator("Fertagus".into()))
            .unwrap();
        assert!(t.commands.is_empty());
    }

    #[test]
    fn operator_toggles_in_parish_mode_touch_no_layers() {
        let (sync, state) = setup(MapMode::Parishes, &["CP"]);
        let state = sync.apply(&state, Event::Refresh).unwrap().state;
        let t = sync.apply(&state, Event::EnableOperator("TTSL".into())).unwrap();
        assert!(t.commands.is_empty());
        assert!(t.state.operators.contains("TTSL"));
        let t = sync.apply(&t.state, Event::DisableOperator("CP".into())).unwrap();
        assert!(t.commands.is_empty());
        assert!(!t.state.operators.contains("CP"));
    }

    #[test]
    fn rejected_events_leave_state_alone() {
        let (sync, state) = setup(MapMode::Lines, &["CP"]);
        assert_eq!(
            sync.apply(&state, Event::SelectHour(99)),
            Err(TransitionError::HourOutOfRange {
                index: 99,
                count: 13
            })
        );
        assert_eq!(
            sync.apply(&state, Event::SelectDate("20990101".into())),
            Err(TransitionError::UnknownDate("20990101".into()))
        );
        assert_eq!(
            sync.apply(&state, Event::EnableOperator("Uber".into())),
            Err(TransitionError::UnknownOperator("Uber".into()))
        );
    }

    #[test]
    fn parish_mount_is_followed_by_z_order() {
        let (sync, state) = setup(MapMode::Parishes, &[]);
        let t = sync.apply(&state, Event::Refresh).unwrap();
        let parish = t.state.handle(&LayerKey::Parish).unwrap();
        let boundaries = t.state.municipalities().unwrap();
        assert_eq!(
            &t.commands[t.commands.len() - 2..],
            &[
                MapCommand::BringToBack(parish),
                MapCommand::BringToFront(boundaries)
            ]
        );
        assert_eq!(keys(&t.state), vec![LayerKey::Parish, LayerKey::Municipalities]);
    }

    #[test]
    fn late_load_of_stale_parish_is_ignored() {
        let (sync, state) = setup(MapMode::Parishes, &[]);
        let first = sync.apply(&state, Event::Refresh).unwrap().state;
        let old_parish = first.handle(&LayerKey::Parish).unwrap();
        let second = sync.apply(&first, Event::SelectHour(1)).unwrap().state;

        let stale = sync.apply(&second, Event::LayerLoaded(old_parish)).unwrap();
        assert!(stale.commands.is_empty());

        let fresh = second.handle(&LayerKey::Parish).unwrap();
        let current = sync.apply(&second, Event::LayerLoaded(fresh)).unwrap();
        assert_eq!(
            current.commands,
            vec![
                MapCommand::BringToBack(fresh),
                MapCommand::BringToFront(second.municipalities().unwrap())
            ]
        );
    }

    #[test]
    fn color_mode_switches_basemap() {
        let (sync, state) = setup(MapMode::Parishes, &[]);
        let t = sync.apply(&state, Event::SetColorMode(ColorMode::Light)).unwrap();
        assert_eq!(
            t.commands,
            vec![MapCommand::SetBasemap(crate::catalog::MAP_LIGHT.to_string())]
        );
        assert_eq!(t.state.color_mode, ColorMode::Light);
    }
}
