use crate::catalog::DataCatalog;
use crate::launch::LaunchOptions;
use crate::layer::FrequencyStats;
use crate::models::{ColorMode, MapMode};
use crate::playback::PlaybackController;
use crate::prefs::{PreferenceStore, Preferences};
use crate::remote::LoadReport;
use crate::state::ViewState;
use crate::surface::{MapSurface, execute};
use crate::sync::{Event, LayerSynchronizer, MapCommand, TransitionError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("the hour control is read-only while playing")]
    HourLocked,
}

/// One viewer session: the single owner of the view state, the map surface
/// and the playback timer. All events go through [`Session::dispatch`].
pub struct Session<S: MapSurface> {
    sync: LayerSynchronizer,
    state: ViewState,
    surface: S,
    playback: PlaybackController,
    prefs: Box<dyn PreferenceStore>,
    launch: LaunchOptions,
}

impl<S: MapSurface> Session<S> {
    /// Build the initial state, set the basemap and mount the initial layers.
    pub fn start(
        catalog: Arc<DataCatalog>,
        launch: LaunchOptions,
        prefs: Box<dyn PreferenceStore>,
        mut surface: S,
    ) -> Result<Self, SessionError> {
        let stored = prefs.load();
        let state = ViewState::initial(&catalog, &launch, &stored);
        log::info!(
            "session start: date={} mode={:?} embedded={}",
            state.date,
            state.mode,
            launch.embedded
        );
        surface.set_basemap(catalog.basemap(state.color_mode));

        let sync = LayerSynchronizer::new(catalog);
        let first = sync.apply(&state, Event::Refresh)?;
        execute(&mut surface, &first.commands);

        Ok(Self {
            sync,
            state: first.state,
            surface,
            playback: PlaybackController::new(),
            prefs,
            launch,
        })
    }

    /// Apply a user event. Hour changes are refused while playing.
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<MapCommand>, SessionError> {
        if matches!(event, Event::SelectHour(_)) && self.hour_control_locked() {
            return Err(SessionError::HourLocked);
        }
        self.apply(event)
    }

    fn apply(&mut self, event: Event) -> Result<Vec<MapCommand>, SessionError> {
        log::debug!("event: {event:?}");
        let persist = matches!(event, Event::SetColorMode(_) | Event::SetDetailedMode(_));
        let transition = self.sync.apply(&self.state, event)?;
        execute(&mut self.surface, &transition.commands);
        self.state = transition.state;
        if persist {
            self.persist_preferences();
        }
        Ok(transition.commands)
    }

    fn persist_preferences(&mut self) {
        let prefs = Preferences {
            color_mode: self.state.color_mode,
            detailed_mode: self.state.detailed_mode,
        };
        if let Err(err) = self.prefs.save(&prefs) {
            log::warn!("could not store preferences: {err:#}");
        }
    }

    /// Checkbox semantics: enable or disable a single operator.
    pub fn set_operator(&mut self, id: &str, on: bool) -> Result<Vec<MapCommand>, SessionError> {
        let id = id.to_string();
        self.dispatch(if on {
            Event::EnableOperator(id)
        } else {
            Event::DisableOperator(id)
        })
    }

    pub fn toggle_color_mode(&mut self) -> Result<Vec<MapCommand>, SessionError> {
        let next: ColorMode = self.state.color_mode.toggled();
        self.dispatch(Event::SetColorMode(next))
    }

    pub fn toggle_detailed_mode(&mut self) -> Result<Vec<MapCommand>, SessionError> {
        let next = !self.state.detailed_mode;
        self.dispatch(Event::SetDetailedMode(next))
    }

    pub fn select_mode(&mut self, mode: MapMode) -> Result<Vec<MapCommand>, SessionError> {
        self.dispatch(Event::SelectMode(mode))
    }

    /// Play button. Returns whether playback is now running.
    pub fn toggle_playback(&mut self, tick: Duration, now: Instant) -> bool {
        self.playback.toggle(tick, now)
    }

    pub fn start_playback(&mut self, tick: Duration, now: Instant) {
        self.playback.start(tick, now);
    }

    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    pub fn hour_control_locked(&self) -> bool {
        self.playback.is_running()
    }

    /// Advance playback to `now`; every elapsed tick is a full hour refresh.
    ///
    /// Returns the number of ticks fired. With a single hour slot a tick
    /// refreshes the same hour, so the index alone does not show progress.
    pub fn poll_playback(&mut self, now: Instant) -> Result<usize, SessionError> {
        let mut ticks = Vec::new();
        self.playback.poll(
            now,
            self.state.hour_index,
            self.sync.catalog().hour_count(),
            |index| ticks.push(index),
        );
        for &index in &ticks {
            self.apply(Event::SelectHour(index))?;
        }
        Ok(ticks.len())
    }

    /// Whether the parameter controls are shown; the detail toggle hides
    /// them to leave only the map.
    pub fn controls_visible(&self) -> bool {
        self.state.detailed_mode
    }

    /// Feed a finished remote fetch back in: diagnostics plus z-order.
    pub fn layer_loaded(&mut self, report: &LoadReport) -> Result<Vec<MapCommand>, SessionError> {
        if !report.is_ok() {
            return Ok(Vec::new());
        }
        self.sync
            .factory_mut()
            .observe(&report.key, report.max_services);
        self.apply(Event::LayerLoaded(report.handle))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn catalog(&self) -> &DataCatalog {
        self.sync.catalog()
    }

    pub fn launch(&self) -> &LaunchOptions {
        &self.launch
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn stats(&self) -> &FrequencyStats {
        self.sync.factory().stats()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Text next to the hour control, e.g. `"23"`.
    pub fn hour_label(&self) -> String {
        self.state.hour_label(self.sync.catalog())
    }
}
