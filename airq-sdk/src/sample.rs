use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Metric, ReportError};

/// One record exactly as received from the sensor cloud. Every value is text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawSample {
    #[serde(rename = "ReportTime", alias = "reportTime", alias = "reporttime", default)]
    pub report_time: String,
    #[serde(rename = "Co2", alias = "co2", default)]
    pub co2: String,
    #[serde(rename = "Tvoc", alias = "tvoc", default)]
    pub tvoc: String,
    #[serde(rename = "Pm10", alias = "pm10", default)]
    pub pm10: String,
    #[serde(rename = "Pm25", alias = "pm25", default)]
    pub pm25: String,
    #[serde(rename = "Temperature", alias = "temperature", default)]
    pub temperature: String,
    #[serde(
        rename = "Humidity",
        alias = "Humid",
        alias = "humidity",
        alias = "humid",
        default
    )]
    pub humidity: String,
    #[serde(
        rename = "SerialNum",
        alias = "serialNum",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serial_num: Option<String>,
    #[serde(rename = "Ip", alias = "ip", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "Lat", alias = "lat", default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(rename = "Lng", alias = "lng", default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<String>,
}

impl RawSample {
    pub fn field(&self, metric: Metric) -> &str {
        match metric {
            Metric::Co2 => &self.co2,
            Metric::Voc => &self.tvoc,
            Metric::Pm10 => &self.pm10,
            Metric::Pm25 => &self.pm25,
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
        }
    }
}

/// Response wrapper returned by the upstream chart endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Envelope {
    #[serde(rename = "Result", alias = "result", default)]
    pub status: Option<String>,
    #[serde(rename = "Data", alias = "data", default)]
    pub data: Option<Vec<RawSample>>,
}

impl Envelope {
    pub fn new(records: Vec<RawSample>) -> Self {
        Self {
            status: None,
            data: Some(records),
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, ReportError> {
        serde_json::from_slice(body).map_err(ReportError::from)
    }

    /// Records in arrival order; a missing or null `Data` is an empty batch.
    pub fn records(&self) -> &[RawSample] {
        self.data.as_deref().unwrap_or(&[])
    }
}

/// Parsed reading. Timestamps are naive wall-clock times of the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub co2: f32,
    pub voc: f32,
    pub pm10: f32,
    pub pm25: f32,
    pub temperature: f32,
    pub humidity: f32,
}

impl Sample {
    pub fn value(&self, metric: Metric) -> f32 {
        match metric {
            Metric::Co2 => self.co2,
            Metric::Voc => self.voc,
            Metric::Pm10 => self.pm10,
            Metric::Pm25 => self.pm25,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }
}

/// Six metric series aligned by index to one shared timestamp axis.
///
/// Values can only be appended a whole sample at a time, so every series
/// always has the same length as the axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSet {
    timestamps: Vec<NaiveDateTime>,
    co2: Vec<f32>,
    voc: Vec<f32>,
    pm10: Vec<f32>,
    pm25: Vec<f32>,
    temperature: Vec<f32>,
    humidity: Vec<f32>,
}

impl SeriesSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            co2: Vec::with_capacity(capacity),
            voc: Vec::with_capacity(capacity),
            pm10: Vec::with_capacity(capacity),
            pm25: Vec::with_capacity(capacity),
            temperature: Vec::with_capacity(capacity),
            humidity: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: &Sample) {
        self.timestamps.push(sample.timestamp);
        self.co2.push(sample.co2);
        self.voc.push(sample.voc);
        self.pm10.push(sample.pm10);
        self.pm25.push(sample.pm25);
        self.temperature.push(sample.temperature);
        self.humidity.push(sample.humidity);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn series(&self, metric: Metric) -> &[f32] {
        match metric {
            Metric::Co2 => &self.co2,
            Metric::Voc => &self.voc,
            Metric::Pm10 => &self.pm10,
            Metric::Pm25 => &self.pm25,
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
        }
    }
}

/// Initial running maximum: the smallest positive `f32`, so any real reading replaces it.
pub const MAX_SENTINEL: f32 = f32::from_bits(1);
/// Initial running minimum.
pub const MIN_SENTINEL: f32 = f32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricExtrema {
    pub max: f32,
    pub min: f32,
    /// Time of the first sample that reached `max`.
    pub max_at: Option<NaiveDateTime>,
}

impl MetricExtrema {
    pub const fn new() -> Self {
        Self {
            max: MAX_SENTINEL,
            min: MIN_SENTINEL,
            max_at: None,
        }
    }

    pub fn observe(&mut self, value: f32, at: NaiveDateTime) {
        if value > self.max {
            self.max = value;
            self.max_at = Some(at);
        }
        if value < self.min {
            self.min = value;
        }
    }
}

impl Default for MetricExtrema {
    fn default() -> Self {
        Self::new()
    }
}

/// Running extrema of the tracked metrics over one batch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Extrema {
    pub samples: usize,
    pub co2: MetricExtrema,
    pub voc: MetricExtrema,
    pub pm10: MetricExtrema,
    pub pm25: MetricExtrema,
}

impl Extrema {
    pub const fn new() -> Self {
        Self {
            samples: 0,
            co2: MetricExtrema::new(),
            voc: MetricExtrema::new(),
            pm10: MetricExtrema::new(),
            pm25: MetricExtrema::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// `None` for metrics that are not tracked.
    pub fn get(&self, metric: Metric) -> Option<&MetricExtrema> {
        match metric {
            Metric::Co2 => Some(&self.co2),
            Metric::Voc => Some(&self.voc),
            Metric::Pm10 => Some(&self.pm10),
            Metric::Pm25 => Some(&self.pm25),
            Metric::Temperature | Metric::Humidity => None,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> Option<&mut MetricExtrema> {
        match metric {
            Metric::Co2 => Some(&mut self.co2),
            Metric::Voc => Some(&mut self.voc),
            Metric::Pm10 => Some(&mut self.pm10),
            Metric::Pm25 => Some(&mut self.pm25),
            Metric::Temperature | Metric::Humidity => None,
        }
    }

    pub fn observe(&mut self, sample: &Sample) {
        self.samples += 1;
        for metric in Metric::TRACKED {
            if let Some(extrema) = self.get_mut(metric) {
                extrema.observe(sample.value(metric), sample.timestamp);
            }
        }
    }

    pub fn tracked(&self) -> impl Iterator<Item = (Metric, &MetricExtrema)> {
        Metric::TRACKED
            .into_iter()
            .filter_map(|metric| self.get(metric).map(|extrema| (metric, extrema)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid time")
    }

    fn sample(hour: u32, co2: f32) -> Sample {
        Sample {
            timestamp: at(hour, 0),
            co2,
            voc: 100.0,
            pm10: 10.0,
            pm25: 5.0,
            temperature: 21.5,
            humidity: 40.0,
        }
    }

    #[test]
    fn envelope_accepts_humid_alias_and_null_data() {
        let body = br#"{"Result":"ok","Data":[{"ReportTime":"2024-03-01T10:00:00","Co2":"612","Tvoc":"80","Pm10":"4","Pm25":"2","Temperature":"21.3","Humid":"44","SerialNum":"P-1","Lat":"1.0"}]}"#;
        let envelope = Envelope::from_slice(body).expect("decode");
        assert_eq!(envelope.status.as_deref(), Some("ok"));
        let record = &envelope.records()[0];
        assert_eq!(record.field(Metric::Humidity), "44");
        assert_eq!(record.field(Metric::Voc), "80");
        assert_eq!(record.serial_num.as_deref(), Some("P-1"));

        let empty = Envelope::from_slice(br#"{"Result":"ok","Data":null}"#).expect("decode");
        assert!(empty.records().is_empty());
    }

    #[test]
    fn malformed_envelope_is_a_decode_error() {
        let err = Envelope::from_slice(b"<html>").unwrap_err();
        assert!(matches!(err, ReportError::Decode(_)));
    }

    #[test]
    fn extrema_keep_first_time_of_peak() {
        let mut extrema = Extrema::new();
        extrema.observe(&sample(8, 500.0));
        extrema.observe(&sample(9, 900.0));
        extrema.observe(&sample(10, 900.0));
        assert_eq!(extrema.samples, 3);
        assert_eq!(extrema.co2.max, 900.0);
        assert_eq!(extrema.co2.min, 500.0);
        assert_eq!(extrema.co2.max_at, Some(at(9, 0)));
        assert!(extrema.get(Metric::Temperature).is_none());
    }

    #[test]
    fn fresh_extrema_hold_sentinels() {
        let extrema = Extrema::new();
        assert!(extrema.is_empty());
        for (_, value) in extrema.tracked() {
            assert_eq!(value.max, MAX_SENTINEL);
            assert_eq!(value.min, MIN_SENTINEL);
            assert!(value.max_at.is_none());
        }
        assert!(MAX_SENTINEL > 0.0);
    }

    #[test]
    fn series_stay_aligned() {
        let mut set = SeriesSet::default();
        set.push(&sample(8, 420.0));
        set.push(&sample(9, 430.0));
        assert_eq!(set.len(), 2);
        for metric in Metric::CHART_ORDER {
            assert_eq!(set.series(metric).len(), set.timestamps().len());
        }
        assert_eq!(set.series(Metric::Co2), &[420.0, 430.0]);
    }
}
