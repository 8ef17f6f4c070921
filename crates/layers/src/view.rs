use std::str::FromStr;

use foundation::GeoPoint;
use serde::Serialize;

use crate::layer::IntensityMode;

/// Threshold boundary rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `weight >= threshold`
    #[default]
    AtLeast,
    /// `weight > threshold`
    Above,
}

impl FromStr for ThresholdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "at-least" | "at_least" | ">=" | "gte" => Ok(ThresholdMode::AtLeast),
            "above" | ">" | "gt" => Ok(ThresholdMode::Above),
            other => Err(format!("unknown threshold mode {other:?} (use at-least or above)")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct HeatmapOptions {
    pub max_intensity: f64,
    pub opacity: f64,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            max_intensity: 30.0,
            opacity: 0.4,
        }
    }
}

/// Everything that shapes a layer's derived view.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RenderSettings {
    pub threshold: f64,
    pub mode: ThresholdMode,
    pub exponent: f64,
    pub multiplier: f64,
    /// Multi-intensity levels below this are never drawn.
    pub min_intensity: u32,
    pub heatmap: HeatmapOptions,
}

pub const DEFAULT_THRESHOLD: f64 = 1.0;
pub const DEFAULT_EXPONENT: f64 = 2.0;
// 5^2 * 1.2 = 30, the heatmap's max intensity.
pub const DEFAULT_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_MIN_INTENSITY: u32 = 1;

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            mode: ThresholdMode::AtLeast,
            exponent: DEFAULT_EXPONENT,
            multiplier: DEFAULT_MULTIPLIER,
            min_intensity: DEFAULT_MIN_INTENSITY,
            heatmap: HeatmapOptions::default(),
        }
    }
}

impl RenderSettings {
    pub fn passes(&self, weight: f64) -> bool {
        match self.mode {
            ThresholdMode::AtLeast => weight >= self.threshold,
            ThresholdMode::Above => weight > self.threshold,
        }
    }

    /// `weight^exponent * multiplier`, never negative.
    pub fn display_weight(&self, weight: f64) -> f64 {
        let w = weight.max(0.0).powf(self.exponent) * self.multiplier;
        if w.is_finite() && w > 0.0 { w } else { 0.0 }
    }

    pub fn visible_point(&self, location: GeoPoint) -> VisiblePoint {
        VisiblePoint {
            location,
            weight: self.display_weight(location.intensity),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisiblePoint {
    pub location: GeoPoint,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelView {
    pub level: u32,
    pub points: Vec<VisiblePoint>,
}

/// Filtered, weighted points of one layer under one `RenderSettings`.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerView {
    Single(Vec<VisiblePoint>),
    Multi(Vec<LevelView>),
}

impl LayerView {
    pub fn build(points: &[GeoPoint], mode: IntensityMode, settings: &RenderSettings) -> Self {
        match mode {
            IntensityMode::Single => LayerView::Single(filter_points(points, settings)),
            IntensityMode::Multi { levels } => {
                LayerView::Multi(partition_levels(points, levels, settings))
            }
        }
    }

    pub fn points(&self) -> Box<dyn Iterator<Item = &VisiblePoint> + '_> {
        match self {
            LayerView::Single(pts) => Box::new(pts.iter()),
            LayerView::Multi(levels) => Box::new(levels.iter().flat_map(|l| l.points.iter())),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LayerView::Single(pts) => pts.len(),
            LayerView::Multi(levels) => levels.iter().map(|l| l.points.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn filter_points(points: &[GeoPoint], settings: &RenderSettings) -> Vec<VisiblePoint> {
    points
        .iter()
        .filter(|p| settings.passes(p.intensity))
        .map(|p| settings.visible_point(*p))
        .collect()
}

/// One bucket per drawable level (`min_intensity..levels`), each holding the
/// threshold-passing points whose intensity is exactly that level.
pub fn partition_levels(
    points: &[GeoPoint],
    levels: usize,
    settings: &RenderSettings,
) -> Vec<LevelView> {
    let floor = settings.min_intensity as usize;
    let mut out: Vec<LevelView> = (floor..levels)
        .map(|level| LevelView {
            level: level as u32,
            points: Vec::new(),
        })
        .collect();

    for p in points.iter().filter(|p| settings.passes(p.intensity)) {
        let Some(level) = p.intensity_level().map(|l| l as usize) else {
            continue;
        };
        if level < floor || level >= levels {
            continue;
        }
        out[level - floor].points.push(settings.visible_point(*p));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{LayerView, RenderSettings, ThresholdMode, filter_points, partition_levels};
    use crate::layer::IntensityMode;
    use foundation::GeoPoint;

    fn settings(threshold: f64) -> RenderSettings {
        RenderSettings {
            threshold,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn threshold_is_inclusive_by_default() {
        let pts: Vec<GeoPoint> = (0..=5).map(|w| GeoPoint::new(0.0, 0.0, w as f64)).collect();
        for t in 0..=6 {
            let s = settings(t as f64);
            let kept = filter_points(&pts, &s);
            for p in &pts {
                let present = kept.iter().any(|v| v.location == *p);
                assert_eq!(present, p.intensity >= t as f64, "w={} t={t}", p.intensity);
            }
        }
    }

    #[test]
    fn strict_mode_excludes_the_boundary() {
        let s = RenderSettings {
            mode: ThresholdMode::Above,
            ..settings(2.0)
        };
        assert!(!s.passes(2.0));
        assert!(s.passes(2.5));
    }

    #[test]
    fn weights_are_amplified_and_non_negative() {
        let s = RenderSettings::default();
        assert_eq!(s.display_weight(5.0), 30.0);
        assert_eq!(s.display_weight(0.0), 0.0);
        assert_eq!(s.display_weight(-3.0), 0.0);
        assert!(s.display_weight(2.0) > s.display_weight(1.0));
    }

    #[test]
    fn levels_below_floor_get_no_bucket() {
        let pts = [
            GeoPoint::new(0.0, 0.0, 0.0),
            GeoPoint::new(0.0, 0.0, 1.0),
            GeoPoint::new(0.0, 0.0, 2.0),
            GeoPoint::new(0.0, 0.0, 2.0),
            GeoPoint::new(0.0, 0.0, 1.5),
            GeoPoint::new(0.0, 0.0, 7.0),
        ];
        let s = RenderSettings {
            min_intensity: 1,
            ..settings(0.0)
        };
        let levels = partition_levels(&pts, 3, &s);
        assert_eq!(levels.iter().map(|l| l.level).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(levels[0].points.len(), 1);
        assert_eq!(levels[1].points.len(), 2);
    }

    #[test]
    fn threshold_applies_before_partitioning() {
        let pts = [GeoPoint::new(0.0, 0.0, 1.0), GeoPoint::new(0.0, 0.0, 2.0)];
        let view = LayerView::build(&pts, IntensityMode::Multi { levels: 3 }, &settings(2.0));
        match &view {
            LayerView::Multi(levels) => {
                assert_eq!(levels.len(), 2);
                assert!(levels[0].points.is_empty());
                assert_eq!(levels[1].points.len(), 1);
            }
            other => panic!("expected multi view, got {other:?}"),
        }
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn parses_threshold_modes() {
        assert_eq!(">=".parse::<ThresholdMode>(), Ok(ThresholdMode::AtLeast));
        assert_eq!("Above".parse::<ThresholdMode>(), Ok(ThresholdMode::Above));
        assert!("sideways".parse::<ThresholdMode>().is_err());
    }
}
