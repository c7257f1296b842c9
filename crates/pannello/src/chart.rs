//! Chart rendering on top of `plotters`.
//!
//! Panels describe a chart with [`Chart`]; [`render`] hands it to the plotters
//! SVG backend and embeds the result. Colours arrive as CSS strings and are
//! converted here. Since the SVG carries no hover tooltips, the formatted
//! values are listed below the drawing.

use maud::{html, Markup, PreEscaped};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::element::Pie;
use plotters::prelude::*;
use tracing::warn;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 320;
const MAX_X_LABELS: usize = 12;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult<T> = Result<T, DrawingAreaErrorKind<std::io::Error>>;

/// Colour used for categories missing from a [`ColorMap`]
pub const FALLBACK_COLOR: &str = "rgba(201, 203, 207, 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Pie,
    Bar,
}

/// Fixed category → colour mapping with a fallback for unknown keys
#[derive(Debug, Clone, Copy)]
pub struct ColorMap {
    entries: &'static [(&'static str, &'static str)],
    fallback: &'static str,
}

impl ColorMap {
    pub const fn new(
        entries: &'static [(&'static str, &'static str)],
        fallback: &'static str,
    ) -> Self {
        Self { entries, fallback }
    }

    pub fn color(&self, key: &str) -> &'static str {
        self.entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, color)| *color)
            .unwrap_or(self.fallback)
    }
}

/// How tooltip text is built from a data point
#[derive(Debug, Clone, PartialEq)]
pub enum TooltipFormat {
    /// `"{value} {unit}"`
    Value { unit: &'static str },
    /// `"{label}: {value} {unit}"`
    LabelValue { unit: &'static str },
}

impl TooltipFormat {
    pub fn format(&self, label: &str, value: f64, decimals: Option<usize>) -> String {
        let value = format_number(value, decimals);
        match self {
            TooltipFormat::Value { unit } => format!("{} {}", value, unit),
            TooltipFormat::LabelValue { unit } => format!("{}: {} {}", label, value, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub values: Vec<f64>,
    pub border_color: String,
    /// Area fill under a line, or the bar colour
    pub fill_color: Option<String>,
    /// One colour per value, used by pie slices
    pub colors: Vec<String>,
}

impl Dataset {
    pub fn line(label: &str, values: Vec<f64>, border: &str, fill: &str) -> Self {
        Self {
            label: label.to_string(),
            values,
            border_color: border.to_string(),
            fill_color: Some(fill.to_string()),
            colors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub begin_at_zero: bool,
    pub show_legend: bool,
    pub tooltip: TooltipFormat,
    /// Fixed decimals for tooltip values, `None` prints the value as is
    pub decimals: Option<usize>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            x_title: None,
            y_title: None,
            begin_at_zero: true,
            show_legend: true,
            tooltip: TooltipFormat::Value { unit: "" },
            decimals: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub options: ChartOptions,
}

impl Chart {
    /// Line chart over `HH:00`-style labels, the shape of most panels
    pub fn line(labels: Vec<String>, datasets: Vec<Dataset>, options: ChartOptions) -> Self {
        Self {
            kind: ChartKind::Line,
            labels,
            datasets,
            options,
        }
    }
}

/// Used when a colour string cannot be parsed
const FALLBACK_RGBA: RGBAColor = RGBAColor(201, 203, 207, 1.0);

/// Draw `chart` as a self-contained block of markup.
pub fn render(chart: &Chart) -> Markup {
    let has_data = chart.datasets.iter().any(|d| !d.values.is_empty());
    if !has_data {
        return html! { div.chart-empty { "No data available." } };
    }

    match draw_svg(chart) {
        Ok(svg) => html! {
            div.chart {
                (PreEscaped(svg))
                (render_values(chart))
            }
        },
        Err(e) => {
            warn!(error = %e, "Chart drawing failed");
            html! { p.error { "Chart could not be drawn." } }
        }
    }
}

fn draw_svg(chart: &Chart) -> DrawResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        match chart.kind {
            ChartKind::Line => draw_cartesian(&root, chart, false)?,
            ChartKind::Bar => draw_cartesian(&root, chart, true)?,
            ChartKind::Pie => draw_pie(&root, chart)?,
        }
        root.present()?;
    }
    Ok(svg)
}

/// Line and bar charts share axes, scaling and legend
fn draw_cartesian(root: &Area, chart: &Chart, bars: bool) -> DrawResult<()> {
    let (min, max) = value_range(chart);
    let slots = slot_count(chart);

    let mut ctx = ChartBuilder::on(root)
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(56)
        .build_cartesian_2d(-0.5..(slots as f64 - 0.5), min..max)?;

    let x_label = |x: &f64| label_at(&chart.labels, *x);
    let y_label = |y: &f64| format_tick(*y);
    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_labels(slots.min(MAX_X_LABELS))
            .x_label_formatter(&x_label)
            .y_labels(6)
            .y_label_formatter(&y_label)
            .disable_x_mesh()
            .light_line_style(WHITE)
            .bold_line_style(RGBColor(224, 224, 224));
        if let Some(title) = &chart.options.x_title {
            mesh.x_desc(title.as_str());
        }
        if let Some(title) = &chart.options.y_title {
            mesh.y_desc(title.as_str());
        }
        mesh.draw()?;
    }

    let baseline = 0.0f64.clamp(min, max);
    let group_width = 0.8;
    let bar_width = group_width / chart.datasets.len().max(1) as f64;

    for (d, dataset) in chart.datasets.iter().enumerate() {
        let border = parse_color(&dataset.border_color);
        let fill = dataset.fill_color.as_deref().map(parse_color);
        let points: Vec<(f64, f64)> = dataset
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (i as f64, *v))
            .collect();

        let series = if bars {
            let color = fill.unwrap_or(border);
            ctx.draw_series(points.iter().map(|&(x, y)| {
                let left = x - group_width / 2.0 + bar_width * d as f64;
                Rectangle::new(
                    [(left, y.max(baseline)), (left + bar_width, y.min(baseline))],
                    color.filled(),
                )
            }))?
        } else if let Some(fill) = fill {
            ctx.draw_series(
                AreaSeries::new(points.iter().copied(), baseline, fill.filled())
                    .border_style(border.stroke_width(2)),
            )?
        } else {
            ctx.draw_series(LineSeries::new(points.iter().copied(), border.stroke_width(2)))?
        };
        series
            .label(dataset.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], border.filled()));

        if !bars {
            ctx.draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, border.filled())),
            )?;
        }
    }

    if chart.options.show_legend {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(RGBColor(200, 200, 200))
            .draw()?;
    }
    Ok(())
}

fn draw_pie(root: &Area, chart: &Chart) -> DrawResult<()> {
    let Some(dataset) = chart.datasets.first() else {
        return Ok(());
    };

    let center = ((WIDTH / 2) as i32, (HEIGHT / 2) as i32);
    let radius = f64::from(HEIGHT) / 2.0 - 24.0;

    let slices: Vec<(f64, RGBColor, &str)> = dataset
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite() && **v > 0.0)
        .map(|(i, v)| {
            let css = dataset.colors.get(i).map(String::as_str).unwrap_or(FALLBACK_COLOR);
            let RGBAColor(r, g, b, _) = parse_color(css);
            let label = chart.labels.get(i).map(String::as_str).unwrap_or("");
            (*v, RGBColor(r, g, b), label)
        })
        .collect();

    if slices.is_empty() {
        root.draw(&Circle::new(center, radius as i32, FALLBACK_RGBA.filled()))?;
        return Ok(());
    }

    let sizes: Vec<f64> = slices.iter().map(|(size, _, _)| *size).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|(_, color, _)| *color).collect();
    let labels: Vec<&str> = slices.iter().map(|(_, _, label)| *label).collect();

    let pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    root.draw(&pie)
}

/// Formatted values below the drawing, one entry per point
fn render_values(chart: &Chart) -> Markup {
    html! {
        details.chart-values {
            summary { "Values" }
            @for dataset in &chart.datasets {
                @if !dataset.label.is_empty() {
                    p.series-label { (dataset.label) }
                }
                ul {
                    @for (i, value) in dataset.values.iter().enumerate().filter(|(_, v)| v.is_finite()) {
                        li title=(chart.labels.get(i).map(String::as_str).unwrap_or("")) {
                            (tooltip(chart, i, *value))
                        }
                    }
                }
            }
        }
    }
}

/// Value range of the y axis, including zero when `begin_at_zero` is set
fn value_range(chart: &Chart) -> (f64, f64) {
    let values = chart
        .datasets
        .iter()
        .flat_map(|d| d.values.iter().copied())
        .filter(|v| v.is_finite());

    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    if chart.options.begin_at_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if max <= min {
        max = min + 1.0;
    }
    (min, max)
}

fn slot_count(chart: &Chart) -> usize {
    chart
        .datasets
        .iter()
        .map(|d| d.values.len())
        .max()
        .unwrap_or(0)
        .max(chart.labels.len())
        .max(1)
}

/// Category label for an x position; only whole slots are labelled
fn label_at(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

/// Parse `rgb()`, `rgba()`, `#rgb` or `#rrggbb`. Anything else is grey.
pub fn parse_color(css: &str) -> RGBAColor {
    let css = css.trim();
    if let Some(hex) = css.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(FALLBACK_RGBA);
    }
    css.strip_prefix("rgba(")
        .or_else(|| css.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(parse_components)
        .unwrap_or(FALLBACK_RGBA)
}

fn parse_components(inner: &str) -> Option<RGBAColor> {
    let channel = |s: &str| s.trim().parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    let parts: Vec<&str> = inner.split(',').collect();
    match parts.as_slice() {
        [r, g, b] => Some(RGBAColor(channel(r)?, channel(g)?, channel(b)?, 1.0)),
        [r, g, b, a] => {
            let alpha = a.trim().parse::<f64>().ok()?.clamp(0.0, 1.0);
            Some(RGBAColor(channel(r)?, channel(g)?, channel(b)?, alpha))
        }
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<RGBAColor> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some(RGBAColor(r * 17, g * 17, b * 17, 1.0)),
        [r1, r2, g1, g2, b1, b2] => Some(RGBAColor(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 1.0)),
        _ => None,
    }
}

fn tooltip(chart: &Chart, i: usize, value: f64) -> String {
    let label = chart.labels.get(i).map(String::as_str).unwrap_or("");
    chart
        .options
        .tooltip
        .format(label, value, chart.options.decimals)
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 100.0 || value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a value with fixed decimals, or with the shortest exact form
pub fn format_number(value: f64, decimals: Option<usize>) -> String {
    match decimals {
        Some(d) => format!("{:.*}", d, value),
        None => value.to_string(),
    }
}
