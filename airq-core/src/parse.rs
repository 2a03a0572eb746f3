use airq_sdk::{Metric, RawSample, ReportError, Sample};
use chrono::NaiveDateTime;

/// Layout of `ReportTime`. Fractional seconds are optional.
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const REPORT_TIME_FIELD: &str = "ReportTime";

/// Parses record `index` of a batch. Values keep full `f32` precision.
pub fn parse_sample(index: usize, raw: &RawSample) -> Result<Sample, ReportError> {
    let timestamp = NaiveDateTime::parse_from_str(&raw.report_time, REPORT_TIME_FORMAT)
        .map_err(|_| invalid(index, REPORT_TIME_FIELD, &raw.report_time))?;

    Ok(Sample {
        timestamp,
        co2: parse_value(index, raw, Metric::Co2)?,
        voc: parse_value(index, raw, Metric::Voc)?,
        pm10: parse_value(index, raw, Metric::Pm10)?,
        pm25: parse_value(index, raw, Metric::Pm25)?,
        temperature: parse_value(index, raw, Metric::Temperature)?,
        humidity: parse_value(index, raw, Metric::Humidity)?,
    })
}

/// Out-of-range decimals are rejected rather than saturated to infinity.
fn parse_value(index: usize, raw: &RawSample, metric: Metric) -> Result<f32, ReportError> {
    let text = raw.field(metric);
    let value = text
        .parse::<f32>()
        .map_err(|_| invalid(index, metric.wire_field(), text))?;
    if value.is_infinite() && !spells_infinity(text) {
        return Err(invalid(index, metric.wire_field(), text));
    }
    Ok(value)
}

fn spells_infinity(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn invalid(index: usize, field: &'static str, value: &str) -> ReportError {
    ReportError::Parse {
        index,
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawSample {
        RawSample {
            report_time: "2024-03-01T10:15:00".to_string(),
            co2: "612.5".to_string(),
            tvoc: "80".to_string(),
            pm10: "4.2".to_string(),
            pm25: "2.1".to_string(),
            temperature: "-3.5".to_string(),
            humidity: "44".to_string(),
            ..RawSample::default()
        }
    }

    #[test]
    fn parses_every_field() {
        let sample = parse_sample(0, &raw()).expect("sample");
        assert_eq!(sample.timestamp.to_string(), "2024-03-01 10:15:00");
        assert_eq!(sample.co2, 612.5);
        assert_eq!(sample.voc, 80.0);
        assert_eq!(sample.temperature, -3.5);
        assert_eq!(sample.humidity, 44.0);
    }

    #[test]
    fn accepts_fractional_seconds() {
        let mut record = raw();
        record.report_time = "2024-03-01T10:15:00.250".to_string();
        let sample = parse_sample(0, &record).expect("sample");
        assert_eq!(sample.timestamp.format("%H:%M:%S%.3f").to_string(), "10:15:00.250");
    }

    #[test]
    fn rejects_timezone_suffix() {
        let mut record = raw();
        record.report_time = "2024-03-01T10:15:00Z".to_string();
        let err = parse_sample(4, &record).unwrap_err();
        assert!(matches!(
            err,
            ReportError::Parse { index: 4, field: "ReportTime", .. }
        ));
    }

    #[test]
    fn names_the_bad_field() {
        let mut record = raw();
        record.tvoc = "n/a".to_string();
        match parse_sample(2, &record) {
            Err(ReportError::Parse { index, field, value }) => {
                assert_eq!(index, 2);
                assert_eq!(field, "Tvoc");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn overflowing_value_aborts_the_record() {
        for text in ["1e39", "-3.5e38", "3.41e38"] {
            let mut record = raw();
            record.co2 = text.to_string();
            match parse_sample(1, &record) {
                Err(ReportError::Parse { index, field, value }) => {
                    assert_eq!(index, 1);
                    assert_eq!(field, "Co2");
                    assert_eq!(value, text);
                }
                other => panic!("{text}: unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn largest_finite_value_is_kept() {
        let mut record = raw();
        record.co2 = "3.4e38".to_string();
        let sample = parse_sample(0, &record).expect("sample");
        assert!(sample.co2.is_finite());
    }

    #[test]
    fn spelled_infinity_is_still_a_number() {
        let mut record = raw();
        record.pm10 = "-Inf".to_string();
        let sample = parse_sample(0, &record).expect("sample");
        assert_eq!(sample.pm10, f32::NEG_INFINITY);
    }

    #[test]
    fn empty_text_is_not_a_number() {
        let mut record = raw();
        record.humidity.clear();
        let err = parse_sample(0, &record).unwrap_err();
        assert!(err.to_string().contains("Humidity"));
    }
}
