use std::path::PathBuf;
use std::time::Duration;

use airq_core::{ChartOptions, available_composers, find_composer, fonts, generate_report};
use airq_sdk::{ReportRequest, ReportWindow};
use anyhow::{Context as _, Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, ValueEnum};
use mod_pico::{DEFAULT_ENDPOINT, PicoApiSource};
use mod_signal::SignalDelivery;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Link the policy crates so their composers register.
use mod_exceedance as _;
use mod_range as _;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Parser, Debug)]
#[command(name = "airq", version, about = "Air quality report with charts")]
struct Cli {
    /// Sensor serial number
    #[arg(
        long = "serial-num",
        env = "AIRQ_SERIAL_NUM",
        required_unless_present = "list_policies"
    )]
    serial_num: Option<String>,

    /// Window start (RFC 3339 or `YYYY-MM-DD[THH:MM:SS]`, sent as written);
    /// defaults to yesterday 00:00
    #[arg(long, env = "AIRQ_FROM")]
    from: Option<String>,

    /// Window end; defaults to today 00:00
    #[arg(long, env = "AIRQ_TO")]
    to: Option<String>,

    /// Alert policy id
    #[arg(long, env = "AIRQ_POLICY", default_value = "exceedance")]
    policy: String,

    /// Print the available alert policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Upstream chart endpoint
    #[arg(long, env = "AIRQ_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "AIRQ_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Output format: markdown or json
    #[arg(long, value_enum, env = "AIRQ_FORMAT", default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    #[arg(long, env = "AIRQ_CHART_WIDTH", default_value_t = 1024)]
    width: u32,

    #[arg(long, env = "AIRQ_CHART_HEIGHT", default_value_t = 480)]
    height: u32,

    /// Maximum number of X-axis labels (0 = one per sample)
    #[arg(long, env = "AIRQ_MAX_TICKS", default_value_t = 48)]
    max_ticks: usize,

    /// TrueType font for chart text
    #[arg(long, env = "AIRQ_FONT")]
    font: Option<PathBuf>,

    /// Directory for chart files (system temp dir by default)
    #[arg(long, env = "AIRQ_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Keep the chart files instead of removing them on exit
    #[arg(long, env = "AIRQ_KEEP_CHARTS")]
    keep_charts: bool,

    /// Signal account used to send the report
    #[arg(long = "signal-user", env = "AIRQ_SIGNAL_USER")]
    signal_user: Option<String>,

    /// Signal group id
    #[arg(long = "signal-group", env = "AIRQ_SIGNAL_GROUP")]
    signal_group: Option<String>,

    /// Space-separated Signal recipients, used when no group is given
    #[arg(long = "signal-recipient", env = "AIRQ_SIGNAL_RECIPIENT")]
    signal_recipient: Option<String>,
}

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    if cli.list_policies {
        for composer in available_composers() {
            println!("{:<12} {}", composer.id, composer.description);
        }
        return Ok(());
    }

    if let Err(err) = run(cli) {
        error!(error = %format!("{err:#}"), "report failed");
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let serial_num = cli
        .serial_num
        .clone()
        .context("a sensor serial number is required")?;
    let window = resolve_window(
        cli.from.as_deref(),
        cli.to.as_deref(),
        Local::now().date_naive(),
    )?;
    let request = ReportRequest::new(serial_num, window);

    fonts::install(cli.font.as_deref());
    let composer = find_composer(&cli.policy)?;
    let source = PicoApiSource::new(cli.endpoint.clone(), Duration::from_secs(cli.timeout))?;
    let options = ChartOptions {
        width: cli.width,
        height: cli.height,
        max_ticks: cli.max_ticks,
        artifact_dir: cli.artifact_dir.clone(),
        ..ChartOptions::default()
    };

    let mut report = generate_report(&source, composer.as_ref(), &request, &options)?;

    match cli.format {
        OutputFormat::Markdown => {
            let rendered = report.to_markdown()?;
            println!("{}", rendered);
        }
        OutputFormat::Json => {
            let payload = report.to_json_value();
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    let delivery = SignalDelivery::new(
        cli.signal_user.clone(),
        cli.signal_group.clone(),
        cli.signal_recipient.as_deref(),
    );
    let delivered = if delivery.is_configured() {
        delivery
            .deliver(report.alert_text(), &report.artifact_paths())
            .context("Signal delivery failed")
    } else {
        info!("no Signal destination configured, skipping delivery");
        Ok(())
    };

    if cli.keep_charts {
        for chart in std::mem::take(&mut report.charts) {
            let path = chart.persist()?;
            info!(path = %path.display(), "kept chart");
        }
    }

    // Dropping the report removes any chart that was not kept.
    drop(report);
    delivered
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,airq=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))
}

/// Resolves the report window; missing bounds default to the previous local day.
fn resolve_window(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<ReportWindow> {
    let default = ReportWindow::previous_day(today);
    let from = from
        .map(parse_bound)
        .transpose()
        .context("invalid --from")?
        .unwrap_or_else(|| default.from());
    let to = to
        .map(parse_bound)
        .transpose()
        .context("invalid --to")?
        .unwrap_or_else(|| default.to());

    if from >= to {
        anyhow::bail!("window start {from} is not before its end {to}");
    }
    Ok(ReportWindow::new(from, to))
}

/// Accepts RFC 3339, a naive timestamp, or a bare date meaning midnight.
/// An RFC 3339 offset is dropped: the upstream receives the digits as written.
fn parse_bound(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(moment) = DateTime::parse_from_rfc3339(value) {
        return Ok(moment.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(moment) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(moment);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|day| day.and_time(NaiveTime::MIN))
        .with_context(|| format!("unrecognised timestamp {value:?}"))
}
