use serde::Serialize;

/// sRGB color with straight alpha.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Heatmap color ramp, lowest density first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradient(pub Vec<Color>);

impl Gradient {
    /// Transparent-to-opaque ramp over a single hue.
    pub fn fade(color: Color) -> Self {
        Gradient(vec![
            color.with_alpha(0.0),
            color.with_alpha(0.5),
            color.with_alpha(1.0),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "gradients", rename_all = "snake_case")]
pub enum GradientAssignment {
    Single(Gradient),
    /// One gradient per legend level, index = level.
    PerLevel(Vec<Gradient>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    pub color: Color,
    pub gradients: GradientAssignment,
}

impl LayerStyle {
    pub fn gradient_for_level(&self, level: u32) -> &Gradient {
        match &self.gradients {
            GradientAssignment::Single(g) => g,
            GradientAssignment::PerLevel(gs) => clamped(gs, level as usize),
        }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        let color = Color::rgb(230, 25, 75);
        Self {
            color,
            gradients: GradientAssignment::Single(Gradient::fade(color)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub color: Color,
    pub gradient: Gradient,
}

/// Position-indexed layer colors.
///
/// Lookups past the end clamp to the last entry instead of wrapping, so
/// overflow layers keep the same extreme color on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    level_ramp: Vec<Gradient>,
}

impl Palette {
    /// Both lists must be non-empty.
    pub fn new(entries: Vec<PaletteEntry>, level_ramp: Vec<Gradient>) -> Option<Self> {
        if entries.is_empty() || level_ramp.is_empty() {
            return None;
        }
        Some(Self {
            entries,
            level_ramp,
        })
    }

    pub fn standard() -> Self {
        let hues = [
            Color::rgb(230, 25, 75),
            Color::rgb(245, 130, 48),
            Color::rgb(255, 225, 25),
            Color::rgb(60, 180, 75),
            Color::rgb(0, 130, 200),
        ];
        let ramp = [
            Color::rgb(26, 152, 80),
            Color::rgb(166, 217, 106),
            Color::rgb(254, 224, 139),
            Color::rgb(253, 174, 97),
            Color::rgb(215, 48, 39),
            Color::rgb(165, 0, 38),
        ];
        Self {
            entries: hues
                .iter()
                .map(|c| PaletteEntry {
                    color: *c,
                    gradient: Gradient::fade(*c),
                })
                .collect(),
            level_ramp: ramp.iter().map(|c| Gradient::fade(*c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &PaletteEntry {
        clamped(&self.entries, index)
    }

    /// Style for the layer at `index` within its group.
    pub fn style_for(&self, index: usize, legend_len: usize) -> LayerStyle {
        let entry = self.entry(index);
        let gradients = if legend_len > 1 {
            GradientAssignment::PerLevel(
                (0..legend_len)
                    .map(|level| clamped(&self.level_ramp, level).clone())
                    .collect(),
            )
        } else {
            GradientAssignment::Single(entry.gradient.clone())
        };
        LayerStyle {
            color: entry.color,
            gradients,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

fn clamped<T>(items: &[T], index: usize) -> &T {
    &items[index.min(items.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::{Color, Gradient, GradientAssignment, Palette, PaletteEntry};

    #[test]
    fn overflow_layers_clamp_to_last_entry() {
        let palette = Palette::standard();
        assert_eq!(palette.len(), 5);
        let colors: Vec<Color> = (0..7).map(|i| palette.style_for(i, 0).color).collect();
        assert_eq!(colors[5], palette.entry(4).color);
        assert_eq!(colors[6], palette.entry(4).color);
        // No wrap back to the first entry.
        assert_ne!(colors[5], colors[0]);
        assert_ne!(colors[3], colors[4]);
    }

    #[test]
    fn multi_level_layers_get_one_gradient_per_level() {
        let palette = Palette::standard();
        let style = palette.style_for(0, 3);
        match &style.gradients {
            GradientAssignment::PerLevel(gs) => assert_eq!(gs.len(), 3),
            other => panic!("expected per-level gradients, got {other:?}"),
        }
        assert_ne!(style.gradient_for_level(0), style.gradient_for_level(2));
    }

    #[test]
    fn single_legend_is_single_gradient() {
        let style = Palette::standard().style_for(1, 1);
        assert!(matches!(style.gradients, GradientAssignment::Single(_)));
        assert_eq!(style.gradient_for_level(4), style.gradient_for_level(0));
    }

    #[test]
    fn empty_palettes_are_rejected() {
        let g = Gradient::fade(Color::rgb(0, 0, 0));
        assert!(Palette::new(Vec::new(), vec![g.clone()]).is_none());
        let entry = PaletteEntry {
            color: Color::rgb(0, 0, 0),
            gradient: g,
        };
        assert!(Palette::new(vec![entry], Vec::new()).is_none());
    }

    #[test]
    fn css_output() {
        assert_eq!(
            Color::rgb(1, 2, 3).with_alpha(0.5).to_css(),
            "rgba(1, 2, 3, 0.5)"
        );
    }
}
