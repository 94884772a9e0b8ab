use anyhow::{Context, Result};
use serde::Deserialize;

use crate::content::ImageContent;
use crate::render::{self, BarStyle, HistogramStyle, LineStyle, PieStyle};
use crate::roles::{self, Hints, DEFAULT_BINS};
use crate::table;
use crate::RenderOptions;

/// Parameters for the bar chart operation. Defaults mirror the tool's
/// published signature; `data` accepts JSON text, CSV text, an array, or an
/// object.
#[derive(Debug, Clone, Deserialize)]
pub struct BarChartParams {
    pub data: serde_json::Value,
    #[serde(default)]
    pub x_column: Option<String>,
    #[serde(default)]
    pub y_column: Option<String>,
    #[serde(default = "default_bar_title")]
    pub title: String,
    #[serde(default = "default_categories_label")]
    pub x_label: String,
    #[serde(default = "default_values_label")]
    pub y_label: String,
    #[serde(default = "default_bar_color")]
    pub color: String,
    #[serde(default)]
    pub horizontal: bool,
    #[serde(flatten)]
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineChartParams {
    pub data: serde_json::Value,
    #[serde(default)]
    pub x_column: Option<String>,
    #[serde(default)]
    pub y_column: Option<String>,
    #[serde(default = "default_line_title")]
    pub title: String,
    #[serde(default = "default_x_values_label")]
    pub x_label: String,
    #[serde(default = "default_y_values_label")]
    pub y_label: String,
    #[serde(default = "default_line_color")]
    pub color: String,
    #[serde(default = "default_line_style")]
    pub line_style: String,
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(flatten)]
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistogramParams {
    pub data: serde_json::Value,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default = "default_histogram_title")]
    pub title: String,
    #[serde(default = "default_values_label")]
    pub x_label: String,
    #[serde(default = "default_frequency_label")]
    pub y_label: String,
    #[serde(default = "default_histogram_color")]
    pub color: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(flatten)]
    pub options: RenderOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PieChartParams {
    pub data: serde_json::Value,
    #[serde(default)]
    pub labels_column: Option<String>,
    #[serde(default)]
    pub values_column: Option<String>,
    #[serde(default = "default_pie_title")]
    pub title: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default = "default_autopct")]
    pub autopct: String,
    #[serde(default = "default_start_angle", alias = "startangle")]
    pub start_angle: f64,
    #[serde(flatten)]
    pub options: RenderOptions,
}

/// A complete tool invocation, dispatched on its `kind` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRequest {
    Bar(BarChartParams),
    Line(LineChartParams),
    Histogram(HistogramParams),
    Pie(PieChartParams),
}

/// Render a request straight to PNG bytes.
pub fn render_chart(request: ChartRequest) -> Result<Vec<u8>> {
    match request {
        ChartRequest::Bar(params) => bar_png(params).context("Error creating bar chart"),
        ChartRequest::Line(params) => line_png(params).context("Error creating line chart"),
        ChartRequest::Histogram(params) => {
            histogram_png(params).context("Error creating histogram")
        }
        ChartRequest::Pie(params) => pie_png(params).context("Error creating pie chart"),
    }
}

/// Render a request into the base64 image envelope.
pub fn dispatch(request: ChartRequest) -> Result<ImageContent> {
    Ok(ImageContent::png(&render_chart(request)?))
}

pub fn create_bar_chart(params: BarChartParams) -> Result<ImageContent> {
    let png = bar_png(params).context("Error creating bar chart")?;
    Ok(ImageContent::png(&png))
}

pub fn create_line_chart(params: LineChartParams) -> Result<ImageContent> {
    let png = line_png(params).context("Error creating line chart")?;
    Ok(ImageContent::png(&png))
}

pub fn create_histogram(params: HistogramParams) -> Result<ImageContent> {
    let png = histogram_png(params).context("Error creating histogram")?;
    Ok(ImageContent::png(&png))
}

pub fn create_pie_chart(params: PieChartParams) -> Result<ImageContent> {
    let png = pie_png(params).context("Error creating pie chart")?;
    Ok(ImageContent::png(&png))
}

fn bar_png(params: BarChartParams) -> Result<Vec<u8>> {
    let table = table::normalize(&params.data)?;
    let hints = Hints {
        category: params.x_column,
        value: params.y_column,
    };
    let (category, value) = roles::resolve_xy(&table, &hints)?;
    let style = BarStyle {
        title: params.title,
        x_label: params.x_label,
        y_label: params.y_label,
        color: params.color,
        horizontal: params.horizontal,
    };
    render::render_bar(&category, &value, &style, &params.options)
}

fn line_png(params: LineChartParams) -> Result<Vec<u8>> {
    let table = table::normalize(&params.data)?;
    let hints = Hints {
        category: params.x_column,
        value: params.y_column,
    };
    let (category, value) = roles::resolve_xy(&table, &hints)?;
    let style = LineStyle {
        title: params.title,
        x_label: params.x_label,
        y_label: params.y_label,
        color: params.color,
        line_style: params.line_style,
        marker: params.marker,
    };
    render::render_line(&category, &value, &style, &params.options)
}

fn histogram_png(params: HistogramParams) -> Result<Vec<u8>> {
    let table = table::normalize(&params.data)?;
    let data = roles::resolve_histogram(&table, params.column.as_deref(), params.bins)?;
    let style = HistogramStyle {
        title: params.title,
        x_label: params.x_label,
        y_label: params.y_label,
        color: params.color,
        alpha: params.alpha,
    };
    render::render_histogram(&data, &style, &params.options)
}

fn pie_png(params: PieChartParams) -> Result<Vec<u8>> {
    let table = table::normalize(&params.data)?;
    let hints = Hints {
        category: params.labels_column,
        value: params.values_column,
    };
    let data = roles::resolve_pie(&table, &hints)?;
    let style = PieStyle {
        title: params.title,
        colors: params.colors,
        autopct: params.autopct,
        start_angle: params.start_angle,
    };
    render::render_pie(&data, &style, &params.options)
}

fn default_bar_title() -> String {
    "Bar Chart".to_string()
}

fn default_line_title() -> String {
    "Line Chart".to_string()
}

fn default_histogram_title() -> String {
    "Histogram".to_string()
}

fn default_pie_title() -> String {
    "Pie Chart".to_string()
}

fn default_categories_label() -> String {
    "Categories".to_string()
}

fn default_values_label() -> String {
    "Values".to_string()
}

fn default_x_values_label() -> String {
    "X Values".to_string()
}

fn default_y_values_label() -> String {
    "Y Values".to_string()
}

fn default_frequency_label() -> String {
    "Frequency".to_string()
}

fn default_bar_color() -> String {
    "steelblue".to_string()
}

fn default_line_color() -> String {
    "blue".to_string()
}

fn default_histogram_color() -> String {
    "skyblue".to_string()
}

fn default_line_style() -> String {
    "-".to_string()
}

fn default_marker() -> String {
    "o".to_string()
}

fn default_bins() -> usize {
    DEFAULT_BINS
}

fn default_alpha() -> f64 {
    0.7
}

fn default_autopct() -> String {
    "%1.1f%%".to_string()
}

fn default_start_angle() -> f64 {
    90.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    #[test]
    fn test_bar_params_defaults() {
        let params: BarChartParams =
            serde_json::from_value(json!({"data": {"A": 1, "B": 2}})).unwrap();
        assert_eq!(params.title, "Bar Chart");
        assert_eq!(params.x_label, "Categories");
        assert_eq!(params.color, "steelblue");
        assert!(!params.horizontal);
        assert_eq!(params.options.width, 800);
        assert_eq!(params.options.height, 600);
    }

    #[test]
    fn test_histogram_params_defaults() {
        let params: HistogramParams =
            serde_json::from_value(json!({"data": [1, 2, 3]})).unwrap();
        assert_eq!(params.bins, 30);
        assert_eq!(params.y_label, "Frequency");
        assert_eq!(params.alpha, 0.7);
    }

    #[test]
    fn test_pie_params_accept_startangle_alias() {
        let params: PieChartParams =
            serde_json::from_value(json!({"data": {"A": 1}, "startangle": 45})).unwrap();
        assert_eq!(params.start_angle, 45.0);
        assert_eq!(params.autopct, "%1.1f%%");
    }

    #[test]
    fn test_create_bar_chart_from_mapping() {
        let params: BarChartParams =
            serde_json::from_value(json!({"data": {"A": 10, "B": 20, "C": 15, "D": 25}}))
                .unwrap();
        let content = create_bar_chart(params).unwrap();
        assert_eq!(content.content_type, "image");
        assert_eq!(content.mime_type, "image/png");
    }

    #[test]
    fn test_tagged_request_dispatch() {
        let request: ChartRequest = serde_json::from_value(json!({
            "kind": "line",
            "data": [{"x": 1, "y": 10}, {"x": 2, "y": 20}],
            "x_column": "x",
            "y_column": "y"
        }))
        .unwrap();
        let png = render_chart(request).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_invalid_data_surfaces_format_error() {
        let params: BarChartParams =
            serde_json::from_value(json!({"data": null, "title": "Should Fail"})).unwrap();
        let err = create_bar_chart(params).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Error creating bar chart"));
        assert!(message.contains("data must be"));
    }

    #[test]
    fn test_histogram_from_csv_request() {
        let request: ChartRequest = serde_json::from_value(json!({
            "kind": "histogram",
            "data": "value\n1\n2\n2\n3\n3\n3",
            "bins": 5
        }))
        .unwrap();
        let png = render_chart(request).unwrap();
        assert!(is_valid_png(&png));
    }
}
