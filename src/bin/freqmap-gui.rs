/*!
 * Desktop control panel for freqmap - Lisbon transit frequency maps
 *
 * Mirrors the map page controls:
 * - Date and hour selection, with hour playback
 * - Operator checkboxes and the lines/parishes switch
 * - Colour toggle and a details switch that hides the controls,
 *   both remembered between runs
 *
 * The layer stack that a map widget would draw is listed below the controls.
 * Usage: `freqmap-gui [QUERY]`, e.g. `freqmap-gui "?map=lines"`.
 */

use eframe::egui;
use freqmap::layer::LayerDescriptor;
use freqmap::playback::DEFAULT_TICK;
use freqmap::prefs::FilePreferences;
use freqmap::surface::RecordingSurface;
use freqmap::{
    ColorMode, DataCatalog, Event, FeatureProperties, LaunchOptions, MapMode, Session,
};
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let query = std::env::args().nth(1).unwrap_or_default();
    let catalog = Arc::new(DataCatalog::lisbon());
    let launch = LaunchOptions::from_query(&query, &catalog);
    let title = if launch.embedded {
        "freqmap"
    } else {
        "Lisbon transit frequency - freqmap"
    };

    let prefs = Box::new(FilePreferences::default_location());
    let session = match Session::start(catalog, launch, prefs, RecordingSurface::new()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 640.0])
            .with_min_inner_size([600.0, 400.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "freqmap",
        options,
        Box::new(move |_cc| Ok(Box::new(FreqmapApp::new(session)))),
    )
}

struct FreqmapApp {
    session: Session<RecordingSurface>,
    // Slider mirror of the session's hour index
    hour_index: usize,
    error_message: String,
}

impl FreqmapApp {
    fn new(session: Session<RecordingSurface>) -> Self {
        let hour_index = session.state().hour_index;
        Self {
            session,
            hour_index,
            error_message: String::new(),
        }
    }

    fn send(&mut self, event: Event) {
        match self.session.dispatch(event) {
            Ok(_) => self.error_message.clear(),
            Err(err) => self.error_message = err.to_string(),
        }
        self.hour_index = self.session.state().hour_index;
    }

    fn date_controls(&mut self, ui: &mut egui::Ui) {
        let dates: Vec<(String, String)> = self
            .session
            .catalog()
            .dates
            .iter()
            .map(|d| (d.id.clone(), d.label.clone()))
            .collect();
        ui.horizontal(|ui| {
            ui.label("Data:");
            for (id, label) in dates {
                let selected = self.session.state().date == id;
                if ui.radio(selected, label).clicked() && !selected {
                    self.send(Event::SelectDate(id));
                }
            }
        });
    }

    fn hour_controls(&mut self, ui: &mut egui::Ui) {
        let last = self.session.catalog().hour_count().saturating_sub(1);
        let locked = self.session.hour_control_locked();
        ui.horizontal(|ui| {
            ui.label("Hora:");
            let slider = egui::Slider::new(&mut self.hour_index, 0..=last).show_value(false);
            let response = ui.add_enabled(!locked, slider);
            if commits_hour(response.changed(), response.dragged(), response.drag_stopped()) {
                self.send(Event::SelectHour(self.hour_index));
            }
            let label = self
                .session
                .catalog()
                .hour_label(self.hour_index)
                .unwrap_or_default();
            ui.label(format!("{label}h"));

            let caption = if locked { "Stop" } else { "Play" };
            if ui.button(caption).clicked() {
                self.session.toggle_playback(DEFAULT_TICK, Instant::now());
            }
        });
    }

    fn operator_controls(&mut self, ui: &mut egui::Ui) {
        let operators: Vec<(String, String)> = self
            .session
            .catalog()
            .operators
            .iter()
            .map(|op| (op.id.clone(), op.display_name.clone()))
            .collect();
        ui.horizontal_wrapped(|ui| {
            for (id, name) in operators {
                let mut on = self.session.state().operators.contains(&id);
                if ui.checkbox(&mut on, name).changed() {
                    self.send(if on {
                        Event::EnableOperator(id)
                    } else {
                        Event::DisableOperator(id)
                    });
                }
            }
        });
    }

    fn mode_controls(&mut self, ui: &mut egui::Ui) {
        let mut mode = self.session.state().mode;
        let mut light = self.session.state().color_mode == ColorMode::Light;
        ui.horizontal(|ui| {
            ui.label("Mapa:");
            let a = ui.radio_value(&mut mode, MapMode::Lines, "Linhas").changed();
            let b = ui
                .radio_value(&mut mode, MapMode::Parishes, "Freguesias")
                .changed();
            if a || b {
                self.send(Event::SelectMode(mode));
            }
            ui.separator();
            if ui.checkbox(&mut light, "Light basemap").changed() {
                let next = if light { ColorMode::Light } else { ColorMode::Dark };
                self.send(Event::SetColorMode(next));
            }
        });
    }

    fn layer_list(&self, ui: &mut egui::Ui) {
        let surface = self.session.surface();
        if let Some(url) = surface.basemap() {
            ui.label(format!("Basemap: {url}"));
        }
        egui::Grid::new("layers").striped(true).show(ui, |ui| {
            ui.strong("z");
            ui.strong("layer");
            ui.strong("source");
            ui.end_row();
            for (z, (handle, layer)) in surface.layers().iter().enumerate() {
                ui.label(z.to_string());
                ui.label(format!("{} {handle}", layer.key));
                ui.label(&layer.url);
                ui.end_row();
            }
        });

        if let Some((_, top)) = surface.layers().last() {
            ui.add_space(8.0);
            ui.label("Popup preview:");
            ui.monospace(top.popup(&sample_properties(top)));
        }
    }
}

/// Slider moves only preview the label while dragging; the hour is
/// committed on release, or on a click or key press.
fn commits_hour(changed: bool, dragged: bool, drag_stopped: bool) -> bool {
    drag_stopped || (changed && !dragged)
}

/// Mid-scale feature for previewing popups.
fn sample_properties(layer: &LayerDescriptor) -> FeatureProperties {
    FeatureProperties {
        services: (layer.max_services() / 2.0).ceil(),
        route_short_name: Some("208".into()),
        route_long_name: Some("Cais do Sodré - Oriente".into()),
        mean_headways: Some(1800.0),
        parish: Some("Arroios".into()),
        municipality: Some("Lisboa".into()),
    }
}

impl eframe::App for FreqmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        match self.session.poll_playback(now) {
            Ok(0) => {}
            Ok(_) => self.hour_index = self.session.state().hour_index,
            Err(err) => {
                self.error_message = err.to_string();
                self.session.stop_playback();
            }
        }
        if let Some(deadline) = self.session.playback().next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                if !self.session.launch().embedded {
                    ui.heading("Frequência dos transportes públicos");
                    ui.add_space(10.0);
                }

                let visible = self.session.controls_visible();
                let caption = if visible { "Ver mapa" } else { "Editar parâmetros" };
                if ui.button(caption).clicked() {
                    self.send(Event::SetDetailedMode(!visible));
                }

                if visible {
                    ui.group(|ui| {
                        self.date_controls(ui);
                        self.hour_controls(ui);
                        self.mode_controls(ui);
                    });

                    if self.session.state().mode == MapMode::Lines {
                        ui.add_space(10.0);
                        ui.group(|ui| {
                            ui.label("Operadores");
                            self.operator_controls(ui);
                        });
                    }
                }

                ui.add_space(10.0);
                ui.collapsing("Layers", |ui| self.layer_list(ui));

                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }
            });
        });
    }
}
