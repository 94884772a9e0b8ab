use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::roles::{HistogramData, PieData, SeriesRole};
use crate::table::ColumnKind;
use crate::RenderOptions;

/// Style configuration for bar charts
#[derive(Debug, Clone)]
pub struct BarStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color: String,
    pub horizontal: bool,
}

/// Style configuration for line charts
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color: String,
    pub line_style: String,
    pub marker: String,
}

/// Style configuration for histograms
#[derive(Debug, Clone)]
pub struct HistogramStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color: String,
    pub alpha: f64,
}

/// Style configuration for pie charts
#[derive(Debug, Clone)]
pub struct PieStyle {
    pub title: String,
    pub colors: Vec<String>,
    pub autopct: String,
    pub start_angle: f64,
}

const BAR_WIDTH: f64 = 0.8;

/// Render a bar chart from resolved category/value series
pub fn render_bar(
    category: &SeriesRole,
    value: &SeriesRole,
    style: &BarStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let labels = category.labels();
    let values = numeric_values(value)?;
    if values.is_empty() {
        anyhow::bail!("Cannot render a bar chart with no data");
    }

    let color = parse_color(&style.color, RGBColor(70, 130, 180));
    let (y_lo, y_hi) = bar_value_range(&values);
    let n = labels.len();

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        if style.horizontal {
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .caption(&style.title, ("sans-serif", 20))
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(y_lo..y_hi, 0.0..n as f64)
                .context("Failed to build chart")?;

            let formatter = |y: &f64| category_label(&labels, *y);
            chart
                .configure_mesh()
                .y_labels(n)
                .y_label_formatter(&formatter)
                .x_desc(style.y_label.as_str())
                .y_desc(style.x_label.as_str())
                .draw()
                .context("Failed to draw mesh")?;

            for (idx, &v) in values.iter().enumerate() {
                let center = idx as f64 + 0.5;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [
                            (0.0, center - BAR_WIDTH / 2.0),
                            (v, center + BAR_WIDTH / 2.0),
                        ],
                        color.filled(),
                    )))
                    .context("Failed to draw bar")?;
            }
        } else {
            let mut chart = ChartBuilder::on(&root)
                .margin(10)
                .caption(&style.title, ("sans-serif", 20))
                .x_label_area_size(40)
                .y_label_area_size(50)
                .build_cartesian_2d(0.0..n as f64, y_lo..y_hi)
                .context("Failed to build chart")?;

            let formatter = |x: &f64| category_label(&labels, *x);
            chart
                .configure_mesh()
                .x_labels(n)
                .x_label_formatter(&formatter)
                .x_desc(style.x_label.as_str())
                .y_desc(style.y_label.as_str())
                .draw()
                .context("Failed to draw mesh")?;

            for (idx, &v) in values.iter().enumerate() {
                let center = idx as f64 + 0.5;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [
                            (center - BAR_WIDTH / 2.0, 0.0),
                            (center + BAR_WIDTH / 2.0, v),
                        ],
                        color.filled(),
                    )))
                    .context("Failed to draw bar")?;
            }
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, options.width, options.height)
}

/// Render a line chart. A categorical category series is positioned at
/// ordinal 0..n-1 with its text used only as tick labels.
pub fn render_line(
    category: &SeriesRole,
    value: &SeriesRole,
    style: &LineStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let ys = numeric_values(value)?;
    if ys.is_empty() {
        anyhow::bail!("Cannot render a line chart with no data");
    }

    let (xs, tick_labels) = match category.kind {
        ColumnKind::Numeric => (numeric_values(category)?, None),
        ColumnKind::Categorical => (
            (0..category.cells.len()).map(|i| i as f64).collect(),
            Some(category.labels()),
        ),
    };

    let (x_lo, x_hi) = pad_range(fold_min(&xs), fold_max(&xs));
    let (y_lo, y_hi) = pad_range(fold_min(&ys), fold_max(&ys));
    let color = parse_color(&style.color, BLUE);
    let stroke = color.stroke_width(2);
    let points: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&style.title, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .context("Failed to build chart")?;

        let formatter = |x: &f64| match &tick_labels {
            Some(labels) => category_label(labels, *x + 0.5),
            None => format!("{}", x),
        };

        let mut mesh = chart.configure_mesh();
        mesh.x_desc(style.x_label.as_str())
            .y_desc(style.y_label.as_str());
        if let Some(labels) = &tick_labels {
            mesh.x_labels(labels.len()).x_label_formatter(&formatter);
        }
        mesh.draw().context("Failed to draw mesh")?;

        match style.line_style.as_str() {
            "--" => chart
                .draw_series(DashedLineSeries::new(points.iter().copied(), 8, 4, stroke))
                .context("Failed to draw line series")?,
            "-." => chart
                .draw_series(DashedLineSeries::new(points.iter().copied(), 12, 6, stroke))
                .context("Failed to draw line series")?,
            ":" => chart
                .draw_series(DashedLineSeries::new(points.iter().copied(), 2, 4, stroke))
                .context("Failed to draw line series")?,
            _ => chart
                .draw_series(LineSeries::new(points.iter().copied(), stroke))
                .context("Failed to draw line series")?,
        };

        match style.marker.as_str() {
            "" | "none" => {}
            "s" => {
                chart
                    .draw_series(points.iter().map(|&(x, y)| {
                        EmptyElement::at((x, y)) + Rectangle::new([(-3, -3), (3, 3)], color.filled())
                    }))
                    .context("Failed to draw markers")?;
            }
            "^" => {
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(x, y)| TriangleMarker::new((x, y), 4, color.filled())),
                    )
                    .context("Failed to draw markers")?;
            }
            _ => {
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                    )
                    .context("Failed to draw markers")?;
            }
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, options.width, options.height)
}

/// Render a histogram: equal-width bins on the continuous path, one bar per
/// pre-counted category on the discrete path.
pub fn render_histogram(
    data: &HistogramData,
    style: &HistogramStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    match data {
        HistogramData::Continuous { values, bins, .. } => {
            render_binned(values, *bins, style, options)
        }
        HistogramData::Discrete {
            categories, counts, ..
        } => render_counted(categories, counts, style, options),
    }
}

fn render_binned(
    values: &[f64],
    bins: usize,
    style: &HistogramStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    if values.is_empty() {
        anyhow::bail!("Cannot render a histogram with no data");
    }

    let (min, width, counts) = bin_counts(values, bins);
    let max_count = counts.iter().copied().max().unwrap_or(0) as f64;
    let (x_lo, x_hi) = pad_range(min, min + width * bins as f64);
    let (_, y_hi) = pad_range(0.0, max_count);
    let fill = parse_color(&style.color, RGBColor(135, 206, 235)).mix(style.alpha);

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&style.title, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .x_desc(style.x_label.as_str())
            .y_desc(style.y_label.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        for (idx, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let lo = min + idx as f64 * width;
            let hi = lo + width;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(lo, 0.0), (hi, count as f64)],
                    fill.filled(),
                )))
                .context("Failed to draw bin")?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(lo, 0.0), (hi, count as f64)],
                    BLACK.stroke_width(1),
                )))
                .context("Failed to draw bin outline")?;
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, options.width, options.height)
}

fn render_counted(
    categories: &[String],
    counts: &[f64],
    style: &HistogramStyle,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    if categories.is_empty() {
        anyhow::bail!("Cannot render a histogram with no data");
    }

    let n = categories.len();
    let (y_lo, y_hi) = bar_value_range(counts);
    let fill = parse_color(&style.color, RGBColor(135, 206, 235)).mix(style.alpha);

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&style.title, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..n as f64, y_lo..y_hi)
            .context("Failed to build chart")?;

        let formatter = |x: &f64| {
            let idx = *x as usize;
            if idx < categories.len() {
                categories[idx].clone()
            } else {
                String::new()
            }
        };
        chart
            .configure_mesh()
            .x_labels(n)
            .x_label_formatter(&formatter)
            .x_desc(style.x_label.as_str())
            .y_desc(style.y_label.as_str())
            .draw()
            .context("Failed to draw mesh")?;

        for (idx, &count) in counts.iter().enumerate() {
            let center = idx as f64 + 0.5;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [
                        (center - BAR_WIDTH / 2.0, 0.0),
                        (center + BAR_WIDTH / 2.0, count),
                    ],
                    fill.filled(),
                )))
                .context("Failed to draw bar")?;
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, options.width, options.height)
}

/// Render a pie chart: wedges as filled polygons, starting at
/// `start_angle` degrees and sweeping counterclockwise.
pub fn render_pie(data: &PieData, style: &PieStyle, options: &RenderOptions) -> Result<Vec<u8>> {
    if data.values.is_empty() {
        anyhow::bail!("Cannot render a pie chart with no data");
    }

    let total: f64 = data.values.iter().sum();
    let cx = options.width as f64 / 2.0;
    let cy = options.height as f64 / 2.0 + 10.0;
    let radius = options.width.min(options.height) as f64 * 0.32;

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let title_style = TextStyle::from(("sans-serif", 20).into_font())
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(
            style.title.clone(),
            (options.width as i32 / 2, 10),
            title_style,
        ))
        .context("Failed to draw title")?;

        let mut angle = style.start_angle.to_radians();
        for (idx, (label, &value)) in data.labels.iter().zip(data.values.iter()).enumerate() {
            let fraction = value / total;
            let sweep = fraction * std::f64::consts::TAU;
            let color = slice_color(&style.colors, idx);

            // One arc point per degree keeps the wedge edge smooth enough
            // at these canvas sizes.
            let steps = (sweep.to_degrees().ceil() as usize).max(2);
            let mut polygon = Vec::with_capacity(steps + 2);
            polygon.push((cx as i32, cy as i32));
            for step in 0..=steps {
                let theta = angle + sweep * (step as f64 / steps as f64);
                polygon.push((
                    (cx + radius * theta.cos()) as i32,
                    (cy - radius * theta.sin()) as i32,
                ));
            }
            root.draw(&Polygon::new(polygon, color.filled()))
                .context("Failed to draw pie slice")?;

            let mid = angle + sweep / 2.0;
            let label_style = TextStyle::from(("sans-serif", 14).into_font())
                .pos(Pos::new(HPos::Center, VPos::Center));
            root.draw(&Text::new(
                label.clone(),
                (
                    (cx + radius * 1.18 * mid.cos()) as i32,
                    (cy - radius * 1.18 * mid.sin()) as i32,
                ),
                label_style,
            ))
            .context("Failed to draw slice label")?;

            let pct_style = TextStyle::from(("sans-serif", 13).into_font())
                .color(&WHITE)
                .pos(Pos::new(HPos::Center, VPos::Center));
            root.draw(&Text::new(
                percent_label(&style.autopct, fraction * 100.0),
                (
                    (cx + radius * 0.6 * mid.cos()) as i32,
                    (cy - radius * 0.6 * mid.sin()) as i32,
                ),
                pct_style,
            ))
            .context("Failed to draw percentage label")?;

            angle += sweep;
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, options.width, options.height)
}

/// Parse cells into numbers, with the offending column/row in the error
fn numeric_values(series: &SeriesRole) -> Result<Vec<f64>> {
    series
        .cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell.as_number().ok_or_else(|| {
                anyhow!(
                    "Failed to parse '{}' as a number in column '{}' at row {}",
                    cell,
                    series.name,
                    idx + 1
                )
            })
        })
        .collect()
}

fn category_label(labels: &[String], position: f64) -> String {
    let idx = position as usize;
    if idx < labels.len() {
        labels[idx].clone()
    } else {
        String::new()
    }
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().cloned().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

/// Bar ranges always include zero so bars have a baseline
fn bar_value_range(values: &[f64]) -> (f64, f64) {
    let min = fold_min(values).min(0.0);
    let max = fold_max(values).max(0.0);
    pad_range(min, max)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

/// Equal-width binning over [min, max]; a degenerate range gets one
/// unit-width bin so every value still lands somewhere.
fn bin_counts(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let min = fold_min(values);
    let max = fold_max(values);
    let width = if max == min {
        1.0
    } else {
        (max - min) / bins as f64
    };

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (min, width, counts)
}

/// Finalize the RGB buffer as PNG bytes
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

const PIE_PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

fn slice_color(colors: &[String], idx: usize) -> RGBColor {
    let fallback = PIE_PALETTE[idx % PIE_PALETTE.len()];
    if colors.is_empty() {
        fallback
    } else {
        parse_color(&colors[idx % colors.len()], fallback)
    }
}

/// Parse a color name or #rrggbb hex string to RGBColor
fn parse_color(color_str: &str, default: RGBColor) -> RGBColor {
    if let Some(hex) = color_str.strip_prefix('#') {
        if hex.len() == 6 {
            let channels = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            );
            if let (Ok(r), Ok(g), Ok(b)) = channels {
                return RGBColor(r, g, b);
            }
        }
        return default;
    }

    match color_str.to_ascii_lowercase().as_str() {
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "black" => BLACK,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "white" => WHITE,
        "orange" => RGBColor(255, 165, 0),
        "purple" => RGBColor(128, 0, 128),
        "steelblue" => RGBColor(70, 130, 180),
        "skyblue" => RGBColor(135, 206, 235),
        _ => default,
    }
}

/// Matplotlib-style percentage formats ("%1.1f%%") are honored; anything
/// unrecognized falls back to one decimal place.
fn percent_label(autopct: &str, pct: f64) -> String {
    if let Some(rest) = autopct.strip_prefix('%') {
        if let Some(dot) = rest.find('.') {
            let digits: String = rest[dot + 1..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(precision) = digits.parse::<usize>() {
                return format!("{:.*}%", precision, pct);
            }
        }
    }
    format!("{:.1}%", pct)
}
