use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{self, Read, Write};

use chartkit::service::{
    self, BarChartParams, ChartRequest, HistogramParams, LineChartParams, PieChartParams,
};
use chartkit::RenderOptions;

#[derive(Parser, Debug)]
#[command(name = "chartkit")]
#[command(about = "Render bar, line, histogram, and pie charts from JSON or CSV data on stdin", long_about = None)]
struct Cli {
    /// Print the base64 image-content JSON envelope instead of raw PNG
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bar chart from a category column and a value column
    Bar {
        #[arg(long)]
        x_column: Option<String>,
        #[arg(long)]
        y_column: Option<String>,
        #[arg(long, default_value = "Bar Chart")]
        title: String,
        #[arg(long, default_value = "Categories")]
        x_label: String,
        #[arg(long, default_value = "Values")]
        y_label: String,
        #[arg(long, default_value = "steelblue")]
        color: String,
        #[arg(long)]
        horizontal: bool,
        #[command(flatten)]
        size: SizeArgs,
    },
    /// Line chart from an x column and a y column
    Line {
        #[arg(long)]
        x_column: Option<String>,
        #[arg(long)]
        y_column: Option<String>,
        #[arg(long, default_value = "Line Chart")]
        title: String,
        #[arg(long, default_value = "X Values")]
        x_label: String,
        #[arg(long, default_value = "Y Values")]
        y_label: String,
        #[arg(long, default_value = "blue")]
        color: String,
        /// Line style: -, --, -. or :
        #[arg(long, default_value = "-", allow_hyphen_values = true)]
        line_style: String,
        /// Marker style: o, s, ^ or none
        #[arg(long, default_value = "o")]
        marker: String,
        #[command(flatten)]
        size: SizeArgs,
    },
    /// Histogram of one column's distribution
    Histogram {
        #[arg(long)]
        column: Option<String>,
        #[arg(long, default_value_t = 30)]
        bins: usize,
        #[arg(long, default_value = "Histogram")]
        title: String,
        #[arg(long, default_value = "Values")]
        x_label: String,
        #[arg(long, default_value = "Frequency")]
        y_label: String,
        #[arg(long, default_value = "skyblue")]
        color: String,
        #[arg(long, default_value_t = 0.7)]
        alpha: f64,
        #[command(flatten)]
        size: SizeArgs,
    },
    /// Pie chart from a labels column and a values column
    Pie {
        #[arg(long)]
        labels_column: Option<String>,
        #[arg(long)]
        values_column: Option<String>,
        #[arg(long, default_value = "Pie Chart")]
        title: String,
        /// Comma-separated slice colors
        #[arg(long, value_delimiter = ',')]
        colors: Vec<String>,
        #[arg(long, default_value = "%1.1f%%")]
        autopct: String,
        #[arg(long, default_value_t = 90.0)]
        start_angle: f64,
        #[command(flatten)]
        size: SizeArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct SizeArgs {
    /// Output width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,
    /// Output height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,
}

impl From<SizeArgs> for RenderOptions {
    fn from(size: SizeArgs) -> Self {
        RenderOptions {
            width: size.width,
            height: size.height,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Read raw data from stdin; the normalizer sorts out JSON vs CSV.
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read data from stdin")?;
    let data = serde_json::Value::String(text);

    let request = build_request(cli.command, data);

    if cli.json {
        let content = service::dispatch(request)?;
        let envelope =
            serde_json::to_string(&content).context("Failed to serialize image content")?;
        println!("{}", envelope);
    } else {
        let png = service::render_chart(request)?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(&png)
            .context("Failed to write PNG to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }

    Ok(())
}

fn build_request(command: Command, data: serde_json::Value) -> ChartRequest {
    match command {
        Command::Bar {
            x_column,
            y_column,
            title,
            x_label,
            y_label,
            color,
            horizontal,
            size,
        } => ChartRequest::Bar(BarChartParams {
            data,
            x_column,
            y_column,
            title,
            x_label,
            y_label,
            color,
            horizontal,
            options: size.into(),
        }),
        Command::Line {
            x_column,
            y_column,
            title,
            x_label,
            y_label,
            color,
            line_style,
            marker,
            size,
        } => ChartRequest::Line(LineChartParams {
            data,
            x_column,
            y_column,
            title,
            x_label,
            y_label,
            color,
            line_style,
            marker,
            options: size.into(),
        }),
        Command::Histogram {
            column,
            bins,
            title,
            x_label,
            y_label,
            color,
            alpha,
            size,
        } => ChartRequest::Histogram(HistogramParams {
            data,
            column,
            bins,
            title,
            x_label,
            y_label,
            color,
            alpha,
            options: size.into(),
        }),
        Command::Pie {
            labels_column,
            values_column,
            title,
            colors,
            autopct,
            start_angle,
            size,
        } => ChartRequest::Pie(PieChartParams {
            data,
            labels_column,
            values_column,
            title,
            colors,
            autopct,
            start_angle,
            options: size.into(),
        }),
    }
}
