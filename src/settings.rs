//! Player settings and preferences
//!
//! Persisted separately from discoveries, through the same key-value store.

use serde::{Deserialize, Serialize};

use crate::persistence::KeyValueStore;
use crate::tuning::Tuning;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particle pool capacity for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 2000,
            QualityPreset::Medium => 8000,
            QualityPreset::High => 16000,
        }
    }

    /// Particles emitted per tick while pouring
    pub fn pour_rate(&self) -> u32 {
        match self {
            QualityPreset::Low => 2,
            QualityPreset::Medium => 4,
            QualityPreset::High => 8,
        }
    }
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics/simulation quality preset
    pub quality: QualityPreset,
    /// Let the pour rate drop under sustained slow frames
    pub adaptive_quality: bool,
    /// Show the FPS/particle-count overlay
    pub show_debug: bool,
    /// Press-and-hold pours; when set, a tap toggles pouring instead
    pub tap_to_toggle: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            adaptive_quality: true,
            show_debug: false,
            tap_to_toggle: false,
        }
    }
}

impl Settings {
    /// Store key
    pub const STORAGE_KEY: &'static str = "alchemy-settings";

    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Apply the preset to a tuning: pool size, pour rate, adaptive toggle
    pub fn apply_to(&self, tuning: &mut Tuning) {
        tuning.physics.max_particles = self.quality.max_particles();
        tuning.pour.rate = self.quality.pour_rate();
        tuning.pour.min_rate = tuning.pour.min_rate.min(tuning.pour.rate);
        tuning.pour.adaptive = self.adaptive_quality;
    }

    /// Load from a store; absent or unreadable settings give defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Some(json) = store.get(Self::STORAGE_KEY) {
            match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
            }
        }
        log::info!("Using default settings");
        Self::default()
    }

    /// Save to a store (best-effort)
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(json) => match store.set(Self::STORAGE_KEY, &json) {
                Ok(()) => log::info!("Settings saved"),
                Err(e) => log::warn!("Failed to save settings: {}", e),
            },
            Err(e) => log::warn!("Failed to serialize settings: {}", e),
        }
    }
}
