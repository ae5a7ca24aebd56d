use freqmap::prefs::MemoryPreferences;
use freqmap::session::SessionError;
use freqmap::surface::RecordingSurface;
use freqmap::sync::TransitionError;
use freqmap::{DataCatalog, Event, LaunchOptions, LayerKey, MapMode, Session};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TWO_OPERATORS: &str = r##"{
    "base_url": "https://data.test/geojson",
    "operators": [
        {"id": "A", "name": "Operator A", "color": "#ff0000"},
        {"id": "B", "name": "Operator B", "color": "#00ff00"}
    ],
    "hours": [22, 23, 0],
    "dates": [
        {"id": "20250101", "label": "Feriado"},
        {"id": "20250102", "label": "Dia útil"}
    ],
    "gradient": ["#ffffcc", "#fd8d3c", "#800026"],
    "max_services_line": 15,
    "max_services_parish": 60
}"##;

fn session(query: &str) -> Session<RecordingSurface> {
    let catalog = Arc::new(DataCatalog::from_json_str(TWO_OPERATORS).unwrap());
    let launch = LaunchOptions::from_query(query, &catalog);
    Session::start(
        catalog,
        launch,
        Box::new(MemoryPreferences::default()),
        RecordingSurface::new(),
    )
    .unwrap()
}

fn mounted(s: &Session<RecordingSurface>) -> Vec<LayerKey> {
    s.state().mounted.keys().cloned().collect()
}

fn op(id: &str) -> LayerKey {
    LayerKey::Operator(id.to_string())
}

#[test]
fn toggle_then_switch_mode_then_play_one_tick() {
    let mut s = session("?map=lines");
    assert_eq!(mounted(&s), vec![op("A"), op("B")]);

    s.dispatch(Event::DisableOperator("B".into())).unwrap();
    assert_eq!(mounted(&s), vec![op("A")]);

    s.dispatch(Event::SelectMode(MapMode::Parishes)).unwrap();
    assert_eq!(mounted(&s), vec![LayerKey::Parish, LayerKey::Municipalities]);
    let boundaries = s.state().municipalities().unwrap();
    let parish_url = |s: &Session<RecordingSurface>| {
        s.surface()
            .layers()
            .iter()
            .find(|(_, d)| d.key == LayerKey::Parish)
            .map(|(_, d)| d.url.clone())
            .unwrap()
    };
    assert_eq!(parish_url(&s), "https://data.test/geojson/20250101/2200.geojson");

    let t0 = Instant::now();
    s.start_playback(Duration::from_millis(50), t0);
    s.poll_playback(t0 + Duration::from_millis(50)).unwrap();
    s.stop_playback();

    assert_eq!(s.state().hour_index, 1);
    assert_eq!(mounted(&s), vec![LayerKey::Parish, LayerKey::Municipalities]);
    assert_eq!(s.state().municipalities(), Some(boundaries));
    assert_eq!(parish_url(&s), "https://data.test/geojson/20250101/2300.geojson");
    assert_eq!(s.surface().mount_count(&LayerKey::Municipalities), 1);
    assert_eq!(
        s.surface().z_order(),
        vec![&LayerKey::Parish, &LayerKey::Municipalities]
    );
}

#[test]
fn operator_off_then_on_restores_one_layer() {
    let mut s = session("map=lines");
    let a_before = s.state().handle(&op("A"));

    s.dispatch(Event::DisableOperator("B".into())).unwrap();
    let commands = s.dispatch(Event::EnableOperator("B".into())).unwrap();

    assert_eq!(commands.len(), 1);
    assert_eq!(mounted(&s), vec![op("A"), op("B")]);
    assert_eq!(s.state().handle(&op("A")), a_before);
    assert_eq!(s.surface().layers().len(), 2);
}

#[test]
fn municipalities_mount_once_across_many_transitions() {
    let mut s = session("");
    let events = [
        Event::SelectHour(2),
        Event::SelectDate("20250102".into()),
        Event::SelectMode(MapMode::Lines),
        Event::SelectMode(MapMode::Parishes),
        Event::ReplaceOperators(["A".to_string()].into_iter().collect()),
        Event::SelectHour(0),
        Event::Refresh,
    ];
    for event in events {
        s.dispatch(event).unwrap();
        assert_eq!(s.surface().mount_count(&LayerKey::Municipalities), 1);
    }
}

#[test]
fn full_refresh_leaves_no_stale_layers() {
    let mut s = session("map=lines");
    s.dispatch(Event::SelectDate("20250102".into())).unwrap();
    let urls: Vec<&str> = s
        .surface()
        .layers()
        .iter()
        .map(|(_, d)| d.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://data.test/geojson/20250102/A_2200_shapes_aggregated.geojson",
            "https://data.test/geojson/20250102/B_2200_shapes_aggregated.geojson",
        ]
    );

    // Municipalities stay mounted after leaving parish mode.
    s.dispatch(Event::SelectMode(MapMode::Parishes)).unwrap();
    s.dispatch(Event::SelectMode(MapMode::Lines)).unwrap();
    assert_eq!(mounted(&s), vec![op("A"), op("B"), LayerKey::Municipalities]);
    assert_eq!(s.surface().layers().len(), 3);
}

#[test]
fn playback_wraps_past_midnight() {
    let mut s = session("map=lines");
    s.dispatch(Event::SelectHour(2)).unwrap();
    assert_eq!(s.hour_label(), "00");

    let t0 = Instant::now();
    s.start_playback(Duration::from_millis(20), t0);
    s.poll_playback(t0 + Duration::from_millis(20)).unwrap();
    assert_eq!(s.state().hour_index, 0);
    assert_eq!(s.hour_label(), "22");
}

#[test]
fn invalid_events_leave_state_untouched() {
    let mut s = session("map=lines");
    let before = s.state().clone();

    assert!(matches!(
        s.dispatch(Event::SelectDate("20990101".into())),
        Err(SessionError::Transition(TransitionError::UnknownDate(_)))
    ));
    assert!(matches!(
        s.dispatch(Event::SelectHour(3)),
        Err(SessionError::Transition(TransitionError::HourOutOfRange {
            index: 3,
            count: 3
        }))
    ));
    assert!(matches!(
        s.dispatch(Event::EnableOperator("Z".into())),
        Err(SessionError::Transition(TransitionError::UnknownOperator(_)))
    ));
    assert_eq!(s.state(), &before);

    // Unknown layers are simply not there to remove.
    assert!(s.dispatch(Event::DisableOperator("Z".into())).unwrap().is_empty());
}

#[test]
fn launch_query_selects_date_and_mode() {
    let s = session("?date=20250102&map=lines&iframe");
    assert_eq!(s.state().date, "20250102");
    assert_eq!(s.state().mode, MapMode::Lines);
    assert!(s.launch().embedded);

    let fallback = session("?date=nope&map=both");
    assert_eq!(fallback.state().date, "20250101");
    assert_eq!(fallback.state().mode, MapMode::Parishes);
    assert!(!fallback.launch().embedded);
}
