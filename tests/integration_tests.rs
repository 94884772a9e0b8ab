use serde_json::json;

use chartkit::error::RoleAssignmentError;
use chartkit::roles::{self, ChartKind, Hints, HistogramData};
use chartkit::service::{self, ChartRequest};
use chartkit::table;

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn render(request: serde_json::Value) -> Vec<u8> {
    let request: ChartRequest = serde_json::from_value(request).expect("request should parse");
    service::render_chart(request).expect("chart should render")
}

#[test]
fn test_end_to_end_bar_chart_from_mapping() {
    let png = render(json!({
        "kind": "bar",
        "data": {"A": 10, "B": 20, "C": 15, "D": 25},
        "title": "Test Bar Chart"
    }));
    assert!(is_valid_png(&png), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_horizontal_bar_from_records() {
    let png = render(json!({
        "kind": "bar",
        "data": [
            {"category": "A", "value": 10},
            {"category": "B", "value": 20},
            {"category": "C", "value": 15}
        ],
        "x_column": "category",
        "y_column": "value",
        "horizontal": true,
        "color": "green"
    }));
    assert!(is_valid_png(&png));
}

#[test]
fn test_end_to_end_line_chart_from_column_mapping() {
    let png = render(json!({
        "kind": "line",
        "data": "{\"x\": [1, 2, 3, 4], \"y\": [10, 20, 15, 25]}",
        "x_column": "x",
        "y_column": "y",
        "line_style": "--",
        "marker": "s"
    }));
    assert!(is_valid_png(&png));
}

#[test]
fn test_end_to_end_histogram_from_list() {
    let png = render(json!({
        "kind": "histogram",
        "data": [1, 4, 2, 8, 5, 7, 3, 6],
        "bins": 5
    }));
    assert!(is_valid_png(&png));
}

#[test]
fn test_end_to_end_pie_chart() {
    let png = render(json!({
        "kind": "pie",
        "data": {"Product A": 30, "Product B": 25, "Product C": 20, "Product D": 25},
        "autopct": "%1.1f%%",
        "startangle": 90
    }));
    assert!(is_valid_png(&png));
}

#[test]
fn test_csv_with_hints_resolves_series_exactly() {
    let table = table::normalize(&json!("category,value\nA,10\nB,20\nC,15\nD,25")).unwrap();
    let hints = Hints {
        category: Some("category".to_string()),
        value: Some("value".to_string()),
    };
    let (category, value) = roles::resolve_xy(&table, &hints).unwrap();
    assert_eq!(category.labels(), vec!["A", "B", "C", "D"]);
    let numbers: Vec<f64> = value.cells.iter().filter_map(|c| c.as_number()).collect();
    assert_eq!(numbers, vec![10.0, 20.0, 15.0, 25.0]);
}

#[test]
fn test_pie_excludes_non_positive_magnitudes() {
    let table = table::normalize(&json!({"A": 10, "B": -5, "C": 15})).unwrap();
    let pie = roles::resolve_pie(&table, &Hints::default()).unwrap();
    assert_eq!(pie.labels, vec!["A", "C"]);
    assert_eq!(pie.values, vec![10.0, 15.0]);

    // The same request still renders after filtering
    let png = render(json!({
        "kind": "pie",
        "data": {"A": 10, "B": -5, "C": 15},
        "title": "Mixed Values"
    }));
    assert!(is_valid_png(&png));
}

#[test]
fn test_histogram_discrete_routing_for_few_distinct_values() {
    let table = table::normalize(&json!([1, 4, 2, 8, 5, 7, 3, 6])).unwrap();
    let data = roles::resolve_histogram(&table, None, 30).unwrap();
    match data {
        HistogramData::Discrete {
            categories, counts, ..
        } => {
            assert_eq!(categories, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);
            assert_eq!(counts, vec![1.0; 8]);
        }
        other => panic!("expected discrete routing, got {:?}", other),
    }
}

#[test]
fn test_empty_mapping_fails_with_insufficient_data() {
    let table = table::normalize(&json!({})).unwrap();
    assert_eq!(table.row_count(), 0);

    for kind in [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Histogram { bins: 30 },
        ChartKind::Pie,
    ] {
        let result = roles::resolve(&table, kind, &Hints::default());
        match result {
            Err(RoleAssignmentError::InsufficientData) => {}
            other => panic!("kind {:?}: expected insufficient data, got {:?}", kind, other),
        }
    }
}

#[test]
fn test_resolution_and_rendering_are_idempotent() {
    let raw = json!({"A": 10, "B": 20, "C": 15});
    let first = roles::resolve(
        &table::normalize(&raw).unwrap(),
        ChartKind::Bar,
        &Hints::default(),
    )
    .unwrap();
    let second = roles::resolve(
        &table::normalize(&raw).unwrap(),
        ChartKind::Bar,
        &Hints::default(),
    )
    .unwrap();
    assert_eq!(first, second);

    let request = json!({"kind": "bar", "data": {"A": 10, "B": 20, "C": 15}});
    assert_eq!(render(request.clone()), render(request));
}

#[test]
fn test_invalid_data_is_an_error_not_a_crash() {
    let request: ChartRequest =
        serde_json::from_value(json!({"kind": "bar", "data": null})).unwrap();
    let err = service::render_chart(request).unwrap_err();
    assert!(format!("{:#}", err).contains("data must be"));
}

#[test]
fn test_histogram_grouped_fallback_behaves_like_bar_of_sums() {
    let png = render(json!({
        "kind": "histogram",
        "data": [
            {"region": "west", "sales": 10},
            {"region": "east", "sales": 20},
            {"region": "west", "sales": 15}
        ],
        "column": "sales"
    }));
    assert!(is_valid_png(&png));

    let table = table::normalize(&json!([
        {"region": "west", "sales": 10},
        {"region": "east", "sales": 20},
        {"region": "west", "sales": 15}
    ]))
    .unwrap();
    let data = roles::resolve_histogram(&table, Some("sales"), 30).unwrap();
    match data {
        HistogramData::Discrete {
            categories, counts, ..
        } => {
            assert_eq!(categories, vec!["west", "east"]);
            assert_eq!(counts, vec![25.0, 20.0]);
        }
        other => panic!("expected grouped fallback, got {:?}", other),
    }
}
