use airq_sdk::Metric;
use plotters::style::RGBColor;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Low,
    Moderate,
    Elevated,
    Severe,
}

impl SeverityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Low => "low",
            SeverityBand::Moderate => "moderate",
            SeverityBand::Elevated => "elevated",
            SeverityBand::Severe => "severe",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            SeverityBand::Low => "Low",
            SeverityBand::Moderate => "Moderate",
            SeverityBand::Elevated => "Elevated",
            SeverityBand::Severe => "Severe",
        }
    }
}

use SeverityBand::{Elevated, Low, Moderate, Severe};

const PM25_SCALE: &[(f32, SeverityBand)] = &[(15.0, Low), (35.0, Moderate), (75.0, Elevated)];
const PM10_SCALE: &[(f32, SeverityBand)] = &[(30.0, Low), (80.0, Moderate), (150.0, Elevated)];
const VOC_SCALE: &[(f32, SeverityBand)] = &[(249.0, Low), (449.0, Moderate)];
const CO2_SCALE: &[(f32, SeverityBand)] = &[(800.0, Low), (1000.0, Moderate), (2000.0, Elevated)];

/// Ascending upper bounds of each band below `Severe`.
fn scale(metric: Metric) -> Option<&'static [(f32, SeverityBand)]> {
    match metric {
        Metric::Pm25 => Some(PM25_SCALE),
        Metric::Pm10 => Some(PM10_SCALE),
        Metric::Voc => Some(VOC_SCALE),
        Metric::Co2 => Some(CO2_SCALE),
        Metric::Temperature | Metric::Humidity => None,
    }
}

pub fn has_scale(metric: Metric) -> bool {
    scale(metric).is_some()
}

/// Band of `value` for `metric`; `None` for metrics without a scale.
///
/// Each bound is exclusive: a value equal to a bound falls into the next band.
pub fn severity(metric: Metric, value: f32) -> Option<SeverityBand> {
    let bounds = scale(metric)?;
    let band = bounds
        .iter()
        .find(|(limit, _)| value < *limit)
        .map(|(_, band)| *band)
        .unwrap_or(Severe);
    Some(band)
}

/// How the dots of one chart are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointColor {
    Fixed,
    Banded(Metric),
}

impl PointColor {
    pub fn for_metric(metric: Metric) -> Self {
        if has_scale(metric) {
            PointColor::Banded(metric)
        } else {
            PointColor::Fixed
        }
    }
}

/// Band to color lookup used by the chart renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub low: RGBColor,
    pub moderate: RGBColor,
    pub elevated: RGBColor,
    pub severe: RGBColor,
    pub fixed: RGBColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            low: RGBColor(0, 116, 217),
            moderate: RGBColor(0, 217, 101),
            elevated: RGBColor(217, 101, 0),
            severe: RGBColor(217, 0, 116),
            fixed: RGBColor(51, 51, 51),
        }
    }
}

impl Palette {
    pub fn band_color(&self, band: SeverityBand) -> RGBColor {
        match band {
            Low => self.low,
            Moderate => self.moderate,
            Elevated => self.elevated,
            Severe => self.severe,
        }
    }

    pub fn point_color(&self, policy: PointColor, value: f32) -> RGBColor {
        match policy {
            PointColor::Fixed => self.fixed,
            PointColor::Banded(metric) => severity(metric, value)
                .map(|band| self.band_color(band))
                .unwrap_or(self.fixed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pm25_bands() {
        assert_eq!(severity(Metric::Pm25, 10.0), Some(Low));
        assert_eq!(severity(Metric::Pm25, 20.0), Some(Moderate));
        assert_eq!(severity(Metric::Pm25, 74.9), Some(Elevated));
        assert_eq!(severity(Metric::Pm25, 75.0), Some(Severe));
    }

    #[test]
    fn bounds_belong_to_the_upper_band() {
        assert_eq!(severity(Metric::Pm10, 29.99), Some(Low));
        assert_eq!(severity(Metric::Pm10, 30.0), Some(Moderate));
        assert_eq!(severity(Metric::Co2, 800.0), Some(Moderate));
        assert_eq!(severity(Metric::Co2, 1999.0), Some(Elevated));
        assert_eq!(severity(Metric::Co2, 2000.0), Some(Severe));
    }

    #[test]
    fn voc_has_no_elevated_band() {
        assert_eq!(severity(Metric::Voc, 248.0), Some(Low));
        assert_eq!(severity(Metric::Voc, 300.0), Some(Moderate));
        assert_eq!(severity(Metric::Voc, 449.0), Some(Severe));
        assert!(
            (0..2000)
                .map(|v| severity(Metric::Voc, v as f32))
                .all(|band| band != Some(Elevated))
        );
    }

    #[test]
    fn comfort_metrics_have_no_scale() {
        assert_eq!(severity(Metric::Temperature, 40.0), None);
        assert_eq!(severity(Metric::Humidity, 99.0), None);
        assert_eq!(PointColor::for_metric(Metric::Humidity), PointColor::Fixed);
        assert_eq!(
            PointColor::for_metric(Metric::Co2),
            PointColor::Banded(Metric::Co2)
        );
    }

    #[test]
    fn palette_colors_by_band() {
        let palette = Palette::default();
        let banded = PointColor::Banded(Metric::Pm25);
        assert_eq!(palette.point_color(banded, 5.0), palette.low);
        assert_eq!(palette.point_color(banded, 80.0), palette.severe);
        assert_eq!(palette.point_color(PointColor::Fixed, 80.0), palette.fixed);
    }

    #[test]
    fn bands_order_by_severity() {
        assert!(Low < Moderate && Moderate < Elevated && Elevated < Severe);
        assert_eq!(Severe.as_str(), "severe");
    }
}
