use std::env;

use layers::{RenderSettings, ThresholdMode};

pub const DEFAULT_API_HOST: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub api_host: String,
    pub settings: RenderSettings,
}

impl ViewerConfig {
    /// Read `HAZARD_*` variables, falling back to defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        let defaults = RenderSettings::default();
        let mode = match env::var("HAZARD_THRESHOLD_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("HAZARD_THRESHOLD_MODE ignored: {err}");
                defaults.mode
            }),
            Err(_) => defaults.mode,
        };
        Self {
            api_host: env::var("HAZARD_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string()),
            settings: RenderSettings {
                threshold: env_var_f64("HAZARD_THRESHOLD", defaults.threshold),
                mode,
                exponent: env_var_f64("HAZARD_EXPONENT", defaults.exponent),
                multiplier: env_var_f64("HAZARD_MULTIPLIER", defaults.multiplier),
                min_intensity: env_var_u32("HAZARD_MIN_INTENSITY", defaults.min_intensity),
                heatmap: defaults.heatmap,
            },
        }
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(host) = &overrides.host {
            self.api_host = host.clone();
        }
        let s = &mut self.settings;
        s.threshold = overrides.threshold.unwrap_or(s.threshold);
        s.mode = overrides.threshold_mode.unwrap_or(s.mode);
        s.exponent = overrides.exponent.unwrap_or(s.exponent);
        s.multiplier = overrides.multiplier.unwrap_or(s.multiplier);
        s.min_intensity = overrides.min_intensity.unwrap_or(s.min_intensity);
        self
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub threshold: Option<f64>,
    pub threshold_mode: Option<ThresholdMode>,
    pub exponent: Option<f64>,
    pub multiplier: Option<f64>,
    pub min_intensity: Option<u32>,
}

fn env_var_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{Overrides, ViewerConfig, DEFAULT_API_HOST};
    use layers::{RenderSettings, ThresholdMode};

    #[test]
    fn flags_override_configured_values() {
        let base = ViewerConfig {
            api_host: DEFAULT_API_HOST.to_string(),
            settings: RenderSettings::default(),
        };
        let cfg = base.with_overrides(&Overrides {
            host: Some("http://api:3000".to_string()),
            threshold: Some(3.0),
            threshold_mode: Some(ThresholdMode::Above),
            ..Overrides::default()
        });
        assert_eq!(cfg.api_host, "http://api:3000");
        assert_eq!(cfg.settings.threshold, 3.0);
        assert_eq!(cfg.settings.mode, ThresholdMode::Above);
        assert_eq!(cfg.settings.exponent, RenderSettings::default().exponent);
    }
}
