use airq_sdk::{Extrema, RawSample, ReportError, Sample, SeriesSet};

use crate::parse::parse_sample;

/// Result of one forward pass over a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pub series: SeriesSet,
    pub extrema: Extrema,
}

/// Accumulates series and running extrema sample by sample.
#[derive(Debug, Default)]
pub struct Aggregator {
    series: SeriesSet,
    extrema: Extrema,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            series: SeriesSet::with_capacity(capacity),
            extrema: Extrema::new(),
        }
    }

    pub fn push(&mut self, sample: &Sample) {
        self.series.push(sample);
        self.extrema.observe(sample);
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            series: self.series,
            extrema: self.extrema,
        }
    }
}

/// Parses and aggregates a whole batch. The first bad record fails the batch.
pub fn aggregate(records: &[RawSample]) -> Result<Aggregation, ReportError> {
    let mut aggregator = Aggregator::with_capacity(records.len());
    for (index, raw) in records.iter().enumerate() {
        let sample = parse_sample(index, raw)?;
        aggregator.push(&sample);
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use airq_sdk::{MAX_SENTINEL, MIN_SENTINEL, Metric};

    fn record(time: &str, co2: &str, pm25: &str) -> RawSample {
        RawSample {
            report_time: time.to_string(),
            co2: co2.to_string(),
            tvoc: "120".to_string(),
            pm10: "12".to_string(),
            pm25: pm25.to_string(),
            temperature: "21.0".to_string(),
            humidity: "45".to_string(),
            ..RawSample::default()
        }
    }

    fn batch() -> Vec<RawSample> {
        vec![
            record("2024-03-01T08:00:00", "400", "8"),
            record("2024-03-01T08:05:00", "850", "22.5"),
            record("2024-03-01T08:10:00", "600", "3"),
        ]
    }

    #[test]
    fn series_match_input_length_and_order() {
        let aggregation = aggregate(&batch()).expect("aggregate");
        let series = &aggregation.series;
        assert_eq!(series.len(), 3);
        for metric in Metric::CHART_ORDER {
            assert_eq!(series.series(metric).len(), 3);
        }
        assert_eq!(series.series(Metric::Co2), &[400.0, 850.0, 600.0]);
        assert!(series.timestamps().windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn extrema_bound_every_value() {
        let aggregation = aggregate(&batch()).expect("aggregate");
        for (metric, extrema) in aggregation.extrema.tracked() {
            for value in aggregation.series.series(metric) {
                assert!(extrema.max >= *value, "{metric} max");
                assert!(extrema.min <= *value, "{metric} min");
            }
        }
        assert_eq!(aggregation.extrema.co2.max, 850.0);
        assert_eq!(aggregation.extrema.co2.min, 400.0);
        assert_eq!(
            aggregation.extrema.pm25.max_at.map(|t| t.to_string()),
            Some("2024-03-01 08:05:00".to_string())
        );
    }

    #[test]
    fn empty_batch_keeps_sentinels() {
        let aggregation = aggregate(&[]).expect("aggregate");
        assert!(aggregation.series.is_empty());
        assert!(aggregation.extrema.is_empty());
        assert_eq!(aggregation.extrema.co2.max, MAX_SENTINEL);
        assert_eq!(aggregation.extrema.voc.min, MIN_SENTINEL);
    }

    #[test]
    fn one_bad_record_fails_the_batch() {
        let mut records = batch();
        records[1].co2 = "abc".to_string();
        let err = aggregate(&records).unwrap_err();
        assert!(matches!(
            err,
            ReportError::Parse { index: 1, field: "Co2", .. }
        ));
    }

    #[test]
    fn input_order_is_preserved_without_sorting() {
        let mut records = batch();
        records.reverse();
        let aggregation = aggregate(&records).expect("aggregate");
        assert_eq!(aggregation.series.series(Metric::Co2), &[600.0, 850.0, 400.0]);
    }
}
