use airq_sdk::{AlertComposer, ComposerMetadata, Extrema, Metric, register_composer};

const CLOCK_FORMAT: &str = "%H:%M";

/// Reports every pollutant whose peak went above its limit.
struct ExceedanceComposer {
    limits: Vec<(Metric, f32)>,
}

impl Default for ExceedanceComposer {
    fn default() -> Self {
        Self {
            limits: vec![
                (Metric::Co2, 800.0),
                (Metric::Pm25, 15.0),
                (Metric::Pm10, 30.0),
                (Metric::Voc, 250.0),
            ],
        }
    }
}

impl AlertComposer for ExceedanceComposer {
    fn metadata(&self) -> ComposerMetadata {
        ComposerMetadata {
            id: "exceedance",
            title: "Exceedance alert",
            description: "Peak value and time of each pollutant above its limit",
        }
    }

    fn compose(&self, extrema: &Extrema) -> String {
        let mut text = String::new();
        for (metric, limit) in &self.limits {
            let Some(range) = extrema.get(*metric) else {
                continue;
            };
            if range.max <= *limit {
                continue;
            }

            let at = range
                .max_at
                .map(|moment| moment.format(CLOCK_FORMAT).to_string())
                .unwrap_or_else(|| "--:--".to_string());
            text.push_str(&format!(
                " {} level {} at {} (limit {} {})",
                metric.label(),
                bold(&format!("high ({:.1} {})", range.max, metric.unit())),
                at,
                limit,
                metric.unit()
            ));
        }
        text
    }
}

fn create_composer() -> Box<dyn AlertComposer> {
    Box::new(ExceedanceComposer::default())
}

register_composer!(create_composer);

/// Maps ASCII letters and digits to Unicode mathematical bold so the emphasis
/// survives plain-text messengers.
pub fn bold(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let offset = match ch {
                'A'..='Z' => Some(0x1D400 + (ch as u32 - 'A' as u32)),
                'a'..='z' => Some(0x1D41A + (ch as u32 - 'a' as u32)),
                '0'..='9' => Some(0x1D7CE + (ch as u32 - '0' as u32)),
                _ => None,
            };
            offset.and_then(char::from_u32).unwrap_or(ch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use airq_sdk::Sample;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|day| day.and_hms_opt(hour, minute, 0))
            .expect("valid time")
    }

    fn sample(timestamp: NaiveDateTime, co2: f32, pm25: f32) -> Sample {
        Sample {
            timestamp,
            co2,
            voc: 120.0,
            pm10: 12.0,
            pm25,
            temperature: 21.0,
            humidity: 40.0,
        }
    }

    fn extrema(samples: &[Sample]) -> Extrema {
        let mut extrema = Extrema::new();
        for sample in samples {
            extrema.observe(sample);
        }
        extrema
    }

    #[test]
    fn co2_peak_is_reported_with_time_and_limit() {
        let extrema = extrema(&[
            sample(at(8, 0), 400.0, 5.0),
            sample(at(8, 5), 850.0, 5.0),
            sample(at(8, 10), 600.0, 5.0),
        ]);
        let text = ExceedanceComposer::default().compose(&extrema);
        assert!(text.contains("800"), "{text}");
        assert!(text.contains(&bold("850.0")), "{text}");
        assert!(text.contains("at 08:05"), "{text}");
        assert!(text.starts_with(" CO₂ level "));
        assert!(!text.contains("PM2.5"));
    }

    #[test]
    fn clauses_follow_fixed_order() {
        let extrema = extrema(&[sample(at(9, 30), 1200.0, 40.0)]);
        let text = ExceedanceComposer::default().compose(&extrema);
        let co2 = text.find("CO₂").expect("co2 clause");
        let pm25 = text.find("PM2.5").expect("pm25 clause");
        assert!(co2 < pm25);
    }

    #[test]
    fn limits_are_exclusive() {
        let extrema = extrema(&[sample(at(9, 30), 800.0, 15.0)]);
        assert!(ExceedanceComposer::default().compose(&extrema).is_empty());
    }

    #[test]
    fn empty_batch_gives_empty_text() {
        assert!(ExceedanceComposer::default().compose(&Extrema::new()).is_empty());
    }

    #[test]
    fn bold_maps_letters_and_digits_only() {
        assert_eq!(bold("Ab9"), "\u{1D400}\u{1D41B}\u{1D7D7}");
        assert_eq!(bold("(1.5 µg/m³)"), "(\u{1D7CF}.\u{1D7D3} µ\u{1D420}/\u{1D426}³)");
    }
}
