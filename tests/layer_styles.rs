use freqmap::models::FeatureCollection;
use freqmap::style::{FeatureStyle, bucket_index};
use freqmap::{DataCatalog, FeatureProperties, LayerFactory, MapMode};
use std::sync::Arc;

const PARISHES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"freguesia": "Arroios", "municipio": "Lisboa", "services": 42},
     "geometry": {"type": "Polygon", "coordinates": []}},
    {"type": "Feature", "properties": {"freguesia": "Sintra", "municipio": "Sintra", "services": "0"},
     "geometry": null}
  ]
}"#;

fn factory() -> LayerFactory {
    LayerFactory::new(Arc::new(DataCatalog::lisbon()))
}

#[test]
fn line_buckets_follow_catalog_maximum() {
    assert_eq!(bucket_index(15.0, 15.0, 11), 10);
    assert_eq!(bucket_index(1.0, 15.0, 11), 1);
    assert_eq!(bucket_index(100.0, 15.0, 11), 10);
}

#[test]
fn parish_features_style_and_describe_themselves() {
    let layer = factory()
        .build(MapMode::Parishes, "20250326", 3, None)
        .unwrap();
    let collection: FeatureCollection = serde_json::from_str(PARISHES).unwrap();
    let busy = &collection.features[0].properties;
    let idle = &collection.features[1].properties;

    match layer.style(busy) {
        FeatureStyle::Area(area) => {
            assert_eq!(area.fill_opacity, 1.0);
            assert!(!area.fill.is_transparent());
        }
        other => panic!("expected an area style, got {other:?}"),
    }
    match layer.style(idle) {
        FeatureStyle::Area(area) => {
            assert_eq!(area.fill_opacity, 0.0);
            assert!(area.fill.is_transparent());
        }
        other => panic!("expected an area style, got {other:?}"),
    }

    assert_eq!(
        layer.popup(busy),
        "Arroios (Lisboa)\nDias úteis (Maio), 03h\nNr circulações: 42"
    );
}

#[test]
fn zero_services_never_draw_in_any_mode() {
    let f = factory();
    let idle: FeatureProperties = serde_json::from_str(r#"{"services": 0}"#).unwrap();
    for op in DataCatalog::lisbon().operator_ids() {
        let layer = f.build(MapMode::Lines, "20250326", 0, Some(op)).unwrap();
        match layer.style(&idle) {
            FeatureStyle::Line(line) => {
                assert_eq!(line.weight, 0.0);
                assert!(line.color.is_transparent());
            }
            other => panic!("expected a line style, got {other:?}"),
        }
    }
}
