use serde::Serialize;
use std::fmt;

/// One of the six quantities reported by an air-quality sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Co2,
    Voc,
    Pm10,
    Pm25,
    Temperature,
    Humidity,
}

impl Metric {
    /// Order in which charts are rendered and handed to delivery.
    pub const CHART_ORDER: [Metric; 6] = [
        Metric::Pm25,
        Metric::Pm10,
        Metric::Voc,
        Metric::Co2,
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Metrics whose running extrema are tracked during aggregation.
    pub const TRACKED: [Metric; 4] = [Metric::Co2, Metric::Voc, Metric::Pm10, Metric::Pm25];

    pub fn id(&self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Voc => "voc",
            Metric::Pm10 => "pm10",
            Metric::Pm25 => "pm25",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Co2 => "CO₂",
            Metric::Voc => "VOC",
            Metric::Pm10 => "PM10",
            Metric::Pm25 => "PM2.5",
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Co2 => "ppm",
            Metric::Voc => "ppb",
            Metric::Pm10 | Metric::Pm25 => "µg/m³",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
        }
    }

    /// Field name used by the upstream JSON payload.
    pub fn wire_field(&self) -> &'static str {
        match self {
            Metric::Co2 => "Co2",
            Metric::Voc => "Tvoc",
            Metric::Pm10 => "Pm10",
            Metric::Pm25 => "Pm25",
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
        }
    }

    pub fn tracks_extrema(&self) -> bool {
        Self::TRACKED.contains(self)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::CHART_ORDER
            .into_iter()
            .find(|metric| metric.id().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
