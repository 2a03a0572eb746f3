use airq_sdk::{AlertComposer, ComposerMetadata, Extrema, register_composer};

/// Summarises the observed range of every tracked pollutant.
struct RangeComposer;

impl AlertComposer for RangeComposer {
    fn metadata(&self) -> ComposerMetadata {
        ComposerMetadata {
            id: "range",
            title: "Range summary",
            description: "Minimum and maximum of each tracked pollutant",
        }
    }

    fn compose(&self, extrema: &Extrema) -> String {
        if extrema.is_empty() {
            return String::new();
        }

        let clauses: Vec<String> = extrema
            .tracked()
            .map(|(metric, range)| {
                format!(
                    "{} {:.1}–{:.1} {}",
                    metric.label(),
                    range.min,
                    range.max,
                    metric.unit()
                )
            })
            .collect();
        format!("Air quality: {}.", clauses.join(", "))
    }
}

fn create_composer() -> Box<dyn AlertComposer> {
    Box::new(RangeComposer)
}

register_composer!(create_composer);
