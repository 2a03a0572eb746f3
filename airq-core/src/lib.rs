use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use airq_sdk::{AlertComposer, ComposerMetadata, Extrema, ReportError, ReportRequest, SampleSource};

pub mod aggregate;
pub mod chart;
pub mod fonts;
pub mod parse;
pub mod schema;
pub mod severity;

pub use aggregate::{Aggregation, Aggregator, aggregate};
pub use airq_sdk;
pub use chart::{ChartArtifact, ChartOptions, ChartSpec, TickSet, render_chart, render_charts};
pub use digest::{MetricDigest, SeverityDigest, build_severity_digest};
pub use parse::parse_sample;
pub use severity::{Palette, PointColor, SeverityBand, severity};

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub serial_num: String,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub policy: &'static str,
    pub upstream_status: Option<String>,
    pub samples: usize,
}

impl ReportMetadata {
    pub fn generated_at_iso8601(&self) -> String {
        self.generated_at.to_rfc3339()
    }
}

/// Outcome of one report run. Dropping it removes every chart file.
#[derive(Debug)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub alert_text: String,
    pub extrema: Extrema,
    pub severity_digest: SeverityDigest,
    pub charts: Vec<ChartArtifact>,
}

impl Report {
    pub fn alert_text(&self) -> &str {
        &self.alert_text
    }

    /// Chart files in `Metric::CHART_ORDER`.
    pub fn artifact_paths(&self) -> Vec<&Path> {
        self.charts.iter().map(ChartArtifact::path).collect()
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let extrema: Vec<serde_json::Value> = if self.extrema.is_empty() {
            Vec::new()
        } else {
            self.extrema
                .tracked()
                .map(|(metric, range)| {
                    serde_json::json!({
                        "metric": metric,
                        "unit": metric.unit(),
                        "min": range.min,
                        "max": range.max,
                        "max_at": range.max_at,
                    })
                })
                .collect()
        };

        let charts: Vec<serde_json::Value> = self
            .charts
            .iter()
            .map(|chart| {
                serde_json::json!({
                    "metric": chart.metric(),
                    "title": chart.title(),
                    "path": chart.path().display().to_string(),
                })
            })
            .collect();

        serde_json::json!({
            "metadata": {
                "generated_at": self.metadata.generated_at_iso8601(),
                "serial_num": self.metadata.serial_num,
                "from": self.metadata.from,
                "to": self.metadata.to,
                "policy": self.metadata.policy,
                "upstream_status": self.metadata.upstream_status,
                "samples": self.metadata.samples,
                "severity_digest": self.severity_digest,
            },
            "alert_text": self.alert_text,
            "extrema": extrema,
            "charts": charts,
        })
    }

    pub fn to_markdown(&self) -> Result<String> {
        render::render_markdown(self).map_err(Into::into)
    }
}

/// Fetches, aggregates, composes and renders one report.
///
/// Any failure aborts the whole run; charts rendered before the failure are
/// removed when their handles drop.
pub fn generate_report<S>(
    source: &S,
    composer: &dyn AlertComposer,
    request: &ReportRequest,
    options: &ChartOptions,
) -> Result<Report, ReportError>
where
    S: SampleSource + ?Sized,
{
    let policy = composer.metadata();
    info!(
        serial_num = request.serial_num(),
        from = %request.window().from(),
        to = %request.window().to(),
        policy = policy.id,
        "generating report"
    );

    let envelope = source.fetch(request)?;
    debug!(
        status = envelope.status.as_deref().unwrap_or("-"),
        records = envelope.records().len(),
        "fetched readings"
    );

    let Aggregation { series, extrema } = aggregate(envelope.records())?;
    let alert_text = composer.compose(&extrema);
    let severity_digest = build_severity_digest(&extrema);
    let charts = render_charts(&series, &extrema, options)?;

    info!(
        samples = series.len(),
        charts = charts.len(),
        alert = !alert_text.is_empty(),
        overall = severity_digest.overall.map(|band| band.as_str()).unwrap_or("none"),
        "report ready"
    );

    Ok(Report {
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            serial_num: request.serial_num().to_string(),
            from: request.window().from(),
            to: request.window().to(),
            policy: policy.id,
            upstream_status: envelope.status,
            samples: series.len(),
        },
        alert_text,
        extrema,
        severity_digest,
        charts,
    })
}

/// Registered alert policies, sorted by id.
pub fn available_composers() -> Vec<ComposerMetadata> {
    let mut composers: Vec<ComposerMetadata> = airq_sdk::iter_registered_composers()
        .map(|entry| (entry.constructor)().metadata())
        .collect();
    composers.sort_by_key(|metadata| metadata.id);
    composers
}

pub fn find_composer(id: &str) -> Result<Box<dyn AlertComposer>, ReportError> {
    airq_sdk::iter_registered_composers()
        .map(|entry| (entry.constructor)())
        .find(|composer| composer.metadata().id.eq_ignore_ascii_case(id))
        .ok_or_else(|| ReportError::UnknownPolicy {
            requested: id.to_string(),
            available: available_composers()
                .iter()
                .map(|metadata| metadata.id)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

mod digest {
    use airq_sdk::{Extrema, Metric};
    use chrono::NaiveDateTime;
    use serde::Serialize;

    use crate::severity::{SeverityBand, severity};

    /// Band of each tracked metric's peak and the worst of them.
    #[derive(Debug, Clone, Serialize, Default, PartialEq)]
    pub struct SeverityDigest {
        pub overall: Option<SeverityBand>,
        pub metrics: Vec<MetricDigest>,
    }

    #[derive(Debug, Clone, Serialize, PartialEq)]
    pub struct MetricDigest {
        pub metric: Metric,
        pub peak: f32,
        pub peak_at: Option<NaiveDateTime>,
        pub band: SeverityBand,
    }

    pub fn build_severity_digest(extrema: &Extrema) -> SeverityDigest {
        if extrema.is_empty() {
            return SeverityDigest::default();
        }

        let metrics: Vec<MetricDigest> = extrema
            .tracked()
            .filter_map(|(metric, range)| {
                severity(metric, range.max).map(|band| MetricDigest {
                    metric,
                    peak: range.max,
                    peak_at: range.max_at,
                    band,
                })
            })
            .collect();

        let overall = metrics.iter().map(|digest| digest.band).max();

        SeverityDigest { overall, metrics }
    }
}

mod render {
    use askama::Template;

    use super::Report;

    #[derive(Template)]
    #[template(path = "report.md", escape = "none")]
    struct MarkdownReport<'a> {
        report: &'a Report,
        generated_at: String,
        overall: &'static str,
        rows: Vec<ExtremaRow>,
        charts: Vec<ChartRow>,
    }

    #[derive(Debug)]
    struct ExtremaRow {
        label: &'static str,
        min: String,
        max: String,
        peak_at: String,
        band: &'static str,
    }

    #[derive(Debug)]
    struct ChartRow {
        title: String,
        path: String,
    }

    pub fn render_markdown(report: &Report) -> askama::Result<String> {
        MarkdownReport {
            report,
            generated_at: report.metadata.generated_at_iso8601(),
            overall: report
                .severity_digest
                .overall
                .map(|band| band.display_label())
                .unwrap_or("n/a"),
            rows: build_rows(report),
            charts: report
                .charts
                .iter()
                .map(|chart| ChartRow {
                    title: chart.title().to_string(),
                    path: chart.path().display().to_string(),
                })
                .collect(),
        }
        .render()
    }

    fn build_rows(report: &Report) -> Vec<ExtremaRow> {
        if report.extrema.is_empty() {
            return Vec::new();
        }

        report
            .extrema
            .tracked()
            .map(|(metric, range)| {
                let band = report
                    .severity_digest
                    .metrics
                    .iter()
                    .find(|digest| digest.metric == metric)
                    .map(|digest| digest.band.display_label())
                    .unwrap_or("-");
                ExtremaRow {
                    label: metric.label(),
                    min: format!("{:.1} {}", range.min, metric.unit()),
                    max: format!("{:.1} {}", range.max, metric.unit()),
                    peak_at: range
                        .max_at
                        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    band,
                }
            })
            .collect()
    }
}
