use std::error::Error;
use std::path::{Path, PathBuf};

use airq_sdk::{Extrema, Metric, ReportError, SeriesSet};
use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use plotters::style::FontTransform;
use tempfile::TempPath;
use tracing::debug;

use crate::fonts::{self, FONT_FAMILY};
use crate::severity::{Palette, PointColor};

/// Layout of the X-axis tick labels, e.g. `Mar-01-24 10:15`.
pub const TICK_LABEL_FORMAT: &str = "%b-%d-%y %H:%M";

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Upper bound on X-axis labels. 0 puts a date-time label on every
    /// distinct sample time.
    pub max_ticks: usize,
    pub dot_radius: u32,
    /// Directory for chart files; the system temp dir when unset.
    pub artifact_dir: Option<PathBuf>,
    pub palette: Palette,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 480,
            max_ticks: 48,
            dot_radius: 3,
            artifact_dir: None,
            palette: Palette::default(),
        }
    }
}

/// What to draw for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub metric: Metric,
    pub title: String,
    pub y_label: String,
    pub color: PointColor,
}

impl ChartSpec {
    pub fn for_metric(metric: Metric, extrema: &Extrema) -> Self {
        let title = match extrema.get(metric) {
            Some(range) if !extrema.is_empty() => format!(
                "{} ({:.1} – {:.1} {})",
                metric.label(),
                range.min,
                range.max,
                metric.unit()
            ),
            _ => metric.label().to_string(),
        };

        Self {
            metric,
            title,
            y_label: metric.unit().to_string(),
            color: PointColor::for_metric(metric),
        }
    }
}

/// X positions of the labelled ticks, shared by every chart of a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSet {
    positions: Vec<i64>,
}

impl TickSet {
    pub fn from_axis(axis: &[NaiveDateTime], max_ticks: usize) -> Self {
        let mut positions: Vec<i64> = axis.iter().copied().map(axis_position).collect();
        positions.sort_unstable();
        positions.dedup();

        if max_ticks > 0 && positions.len() > max_ticks {
            let step = positions.len().div_ceil(max_ticks);
            positions = positions.into_iter().step_by(step).collect();
        }

        Self { positions }
    }

    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    pub fn labels(&self) -> Vec<String> {
        self.positions.iter().copied().map(tick_label).collect()
    }
}

/// Handle of one rendered chart. The file is removed when the handle drops.
#[derive(Debug)]
pub struct ChartArtifact {
    metric: Metric,
    title: String,
    path: TempPath,
}

impl ChartArtifact {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the file on disk past the lifetime of the handle.
    pub fn persist(self) -> Result<PathBuf, ReportError> {
        self.path
            .keep()
            .map_err(|error| ReportError::Artifact(error.error))
    }
}

/// Renders all six charts in `Metric::CHART_ORDER`.
pub fn render_charts(
    series: &SeriesSet,
    extrema: &Extrema,
    options: &ChartOptions,
) -> Result<Vec<ChartArtifact>, ReportError> {
    let ticks = TickSet::from_axis(series.timestamps(), options.max_ticks);

    Metric::CHART_ORDER
        .iter()
        .map(|metric| {
            let spec = ChartSpec::for_metric(*metric, extrema);
            render_chart(
                series.timestamps(),
                series.series(*metric),
                &ticks,
                &spec,
                options,
            )
        })
        .collect()
}

/// Renders one metric to a fresh PNG file. An empty series yields an empty chart.
pub fn render_chart(
    axis: &[NaiveDateTime],
    values: &[f32],
    ticks: &TickSet,
    spec: &ChartSpec,
    options: &ChartOptions,
) -> Result<ChartArtifact, ReportError> {
    if axis.len() != values.len() {
        return Err(ReportError::render(
            spec.metric,
            format!("{} timestamps for {} values", axis.len(), values.len()),
        ));
    }

    let points: Vec<(i64, f32)> = axis
        .iter()
        .copied()
        .map(axis_position)
        .zip(values.iter().copied())
        .collect();

    let path = artifact_path(spec.metric, options)?;
    draw(&path, &points, ticks, spec, options, fonts::available())
        .map_err(|error| ReportError::render(spec.metric, error))?;
    debug!(
        metric = spec.metric.id(),
        points = points.len(),
        path = %path.display(),
        "rendered chart"
    );

    Ok(ChartArtifact {
        metric: spec.metric,
        title: spec.title.clone(),
        path,
    })
}

fn artifact_path(metric: Metric, options: &ChartOptions) -> Result<TempPath, ReportError> {
    let prefix = format!("airq-{}-", metric.id());
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".png");

    let file = match &options.artifact_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file.into_temp_path())
}

fn draw(
    path: &Path,
    points: &[(i64, f32)],
    ticks: &TickSet,
    spec: &ChartSpec,
    options: &ChartOptions,
    with_text: bool,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.margin(20, 20, 20, 20);

    let (x_min, x_max) = x_bounds(points);
    let (y_min, y_max) = y_bounds(points);
    let key_points: Vec<i64> = ticks
        .positions()
        .iter()
        .copied()
        .filter(|position| (x_min..=x_max).contains(position))
        .collect();

    let mut builder = ChartBuilder::on(&area);
    if with_text {
        builder
            .caption(&spec.title, (FONT_FAMILY, 20))
            .x_label_area_size(100)
            .y_label_area_size(60);
    }
    let mut chart =
        builder.build_cartesian_2d((x_min..x_max).with_key_points(key_points), y_min..y_max)?;

    if with_text {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_style((FONT_FAMILY, 10).into_font().transform(FontTransform::Rotate90))
            .x_label_formatter(&|position| tick_label(*position))
            .y_label_style((FONT_FAMILY, 12))
            .y_desc(spec.y_label.as_str())
            .axis_desc_style((FONT_FAMILY, 14))
            .draw()?;
    }

    let visible: Vec<(i64, f32)> = points
        .iter()
        .copied()
        .filter(|(_, value)| value.is_finite())
        .collect();

    chart.draw_series(LineSeries::new(
        visible.iter().map(|&(x, y)| (x, f64::from(y))),
        &BLACK,
    ))?;
    chart.draw_series(visible.iter().map(|&(x, y)| {
        let color = options.palette.point_color(spec.color, y);
        Circle::new((x, f64::from(y)), options.dot_radius, color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Naive wall-clock times are placed on a UTC scale; only their order and spacing matter.
fn axis_position(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp()
}

fn tick_label(position: i64) -> String {
    DateTime::from_timestamp(position, 0)
        .map(|moment| moment.naive_utc().format(TICK_LABEL_FORMAT).to_string())
        .unwrap_or_default()
}

fn x_bounds(points: &[(i64, f32)]) -> (i64, i64) {
    let min = points.iter().map(|(x, _)| *x).min();
    let max = points.iter().map(|(x, _)| *x).max();
    match (min, max) {
        (Some(min), Some(max)) if min < max => {
            let pad = ((max - min) / 50).max(1);
            (min - pad, max + pad)
        }
        (Some(only), Some(_)) => (only - 60, only + 60),
        _ => (0, 1),
    }
}

/// Y range in `f64`: padding extreme `f32` readings must not overflow to infinity.
fn y_bounds(points: &[(i64, f32)]) -> (f64, f64) {
    let (min, max) = points
        .iter()
        .map(|(_, y)| f64::from(*y))
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });

    if min > max {
        (0.0, 1.0)
    } else if min == max {
        let pad = (min.abs() * 0.05).max(1.0);
        (min - pad, max + pad)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}
