use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{transition::Easing, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewport: Viewport,
    pub orchestrator: OrchestratorConfig,
    pub wave: WaveFieldConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing fields fall back to their defaults.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&source)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Ok(config)
    }
}

/// Pixel dimensions of the host viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Timing of the view orchestrator: the loading splash delay and the
/// cross-fades between screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub loading_delay_ms: u64,
    /// Exit of the loading splash.
    pub loading_exit: TransitionTiming,
    /// First reveal of the content after the splash has gone.
    pub content_reveal: TransitionTiming,
    /// Exit and enter of content views and the menu.
    pub page: TransitionTiming,
}

impl OrchestratorConfig {
    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            loading_delay_ms: 2_000,
            loading_exit: TransitionTiming::new(800, Easing::cubic_bezier(0.76, 0.0, 0.24, 1.0)),
            content_reveal: TransitionTiming::new(800, Easing::EaseOut),
            page: TransitionTiming::new(600, Easing::cubic_bezier(0.43, 0.13, 0.23, 0.96)),
        }
    }
}

/// Duration and easing curve of one half (exit or enter) of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionTiming {
    pub duration_ms: u64,
    pub easing: Easing,
}

impl TransitionTiming {
    pub const fn new(duration_ms: u64, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Constants of the animated dot field. Fixed for the lifetime of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveFieldConfig {
    /// Distance between neighbouring dots, in pixels.
    pub dot_spacing: f32,
    pub dot_radius: f32,
    pub wave_amplitude: f32,
    /// Spatial frequency of the wave, radians per pixel.
    pub wave_frequency: f32,
    /// Wave phase added per frame.
    pub wave_speed: f32,
    /// Sweep phase added per frame.
    pub sweep_speed: f32,
    /// Width of the sweep travel as a multiple of the viewport width.
    pub sweep_range: f32,
    /// Distance, as a fraction of the viewport width, at which a dot fades out.
    pub sweep_falloff: f32,
}

impl Default for WaveFieldConfig {
    fn default() -> Self {
        Self {
            dot_spacing: 35.0,
            dot_radius: 2.0,
            wave_amplitude: 25.0,
            wave_frequency: 0.005,
            wave_speed: 0.03,
            sweep_speed: 0.005,
            sweep_range: 1.4,
            sweep_falloff: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.orchestrator.loading_delay(), Duration::from_secs(2));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = AppConfig::from_json_str(
            r#"{
                "viewport": { "width": 1600, "height": 900 },
                "orchestrator": {
                    "loading_delay_ms": 50,
                    "page": { "duration_ms": 10, "easing": { "kind": "linear" } }
                },
                "wave": { "dot_spacing": 20.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.viewport, Viewport::new(1600, 900));
        assert_eq!(config.orchestrator.loading_delay_ms, 50);
        assert_eq!(config.orchestrator.page.easing, Easing::Linear);
        assert_eq!(config.wave.dot_spacing, 20.0);
        assert_eq!(config.wave.wave_amplitude, 25.0);
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = AppConfig::from_json_str("{ \"viewport\": 3 }").unwrap_err();
        assert!(format!("{err}").starts_with("invalid configuration"));
    }
}
