use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

mod error;
mod metric;
mod sample;

pub use error::ReportError;
pub use metric::Metric;
pub use sample::{
    Envelope, Extrema, MAX_SENTINEL, MIN_SENTINEL, MetricExtrema, RawSample, Sample, SeriesSet,
};

/// Wall-clock interval passed through to the upstream source unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl ReportWindow {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self { from, to }
    }

    /// Midnight of the day before `today` up to midnight of `today`.
    pub fn previous_day(today: NaiveDate) -> Self {
        let to = today.and_time(NaiveTime::MIN);
        let from = today
            .pred_opt()
            .map(|day| day.and_time(NaiveTime::MIN))
            .unwrap_or(to);
        Self { from, to }
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }
}

/// What a report is generated for: one device over one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    serial_num: String,
    window: ReportWindow,
}

impl ReportRequest {
    pub fn new<S: Into<String>>(serial_num: S, window: ReportWindow) -> Self {
        Self {
            serial_num: serial_num.into(),
            window,
        }
    }

    pub fn serial_num(&self) -> &str {
        &self.serial_num
    }

    pub fn window(&self) -> &ReportWindow {
        &self.window
    }
}

/// Upstream provider of raw readings.
pub trait SampleSource {
    fn fetch(&self, request: &ReportRequest) -> Result<Envelope, ReportError>;
}

impl<F> SampleSource for F
where
    F: Fn(&ReportRequest) -> Result<Envelope, ReportError>,
{
    fn fetch(&self, request: &ReportRequest) -> Result<Envelope, ReportError> {
        self(request)
    }
}

/// Composer metadata used for selection and logging.
#[derive(Debug, Clone, Copy)]
pub struct ComposerMetadata {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Turns the extrema of a batch into the alert text of a report.
pub trait AlertComposer: Send + Sync + 'static {
    fn metadata(&self) -> ComposerMetadata;
    fn compose(&self, extrema: &Extrema) -> String;
}

/// Descriptor of a compile-time registry entry.
pub struct ComposerRegistration {
    pub constructor: fn() -> Box<dyn AlertComposer>,
}

inventory::collect!(ComposerRegistration);

pub use inventory;

/// Helper macro to register an alert composer inside a module.
#[macro_export]
macro_rules! register_composer {
    ($ctor:expr) => {
        ::airq_sdk::inventory::submit! {
            ::airq_sdk::ComposerRegistration {
                constructor: $ctor,
            }
        }
    };
}

pub fn iter_registered_composers() -> impl Iterator<Item = &'static ComposerRegistration> {
    inventory::iter::<ComposerRegistration>.into_iter()
}
