//! Pipeline-wide settings, per-phase settings and solver configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyper-mode features that extend a phase with noise and sky fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperFeature {
    /// Scale the noise map around each galaxy
    HyperGalaxies,
    /// Fit the background sky level
    HyperImageSky,
    /// Fit the background noise level
    HyperBackgroundNoise,
}

impl fmt::Display for HyperFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HyperFeature::HyperGalaxies => "hyper_galaxies",
            HyperFeature::HyperImageSky => "hyper_image_sky",
            HyperFeature::HyperBackgroundNoise => "hyper_background_noise",
        };
        f.write_str(name)
    }
}

/// Settings shared by every phase of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default)]
    pub hyper_galaxies: bool,

    #[serde(default)]
    pub hyper_image_sky: bool,

    #[serde(default)]
    pub hyper_background_noise: bool,
}

impl GeneralSettings {
    /// Settings with every hyper feature turned on
    pub fn all() -> Self {
        Self {
            hyper_galaxies: true,
            hyper_image_sky: true,
            hyper_background_noise: true,
        }
    }

    pub fn is_enabled(&self, feature: HyperFeature) -> bool {
        match feature {
            HyperFeature::HyperGalaxies => self.hyper_galaxies,
            HyperFeature::HyperImageSky => self.hyper_image_sky,
            HyperFeature::HyperBackgroundNoise => self.hyper_background_noise,
        }
    }

    /// Tag naming the output directory for these settings
    ///
    /// `general` alone when no hyper feature is on, otherwise e.g.
    /// `general__hyper_galaxies_bg_sky_bg_noise`.
    pub fn tag(&self) -> String {
        let mut tag = String::from("general");
        if self.hyper_galaxies || self.hyper_image_sky || self.hyper_background_noise {
            tag.push_str("__hyper");
            if self.hyper_galaxies {
                tag.push_str("_galaxies");
            }
            if self.hyper_image_sky {
                tag.push_str("_bg_sky");
            }
            if self.hyper_background_noise {
                tag.push_str("_bg_noise");
            }
        }
        tag
    }
}

/// Data-preparation settings of a single phase
///
/// Opaque to prior passing; they are forwarded to the fitter and tag the
/// phase's output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_to_noise_limit: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_up_factor: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_scale_interpolation_grid: Option<f64>,
}

impl PhaseSettings {
    /// Suffix appended to the phase name, empty when nothing is set
    pub fn tag(&self) -> String {
        let mut tag = String::new();
        if let Some(sub_size) = self.sub_size {
            tag.push_str(&format!("__sub_{}", sub_size));
        }
        if let Some(limit) = self.signal_to_noise_limit {
            tag.push_str(&format!("__snr_{}", limit));
        }
        if let Some(factor) = self.bin_up_factor {
            tag.push_str(&format!("__bin_{}", factor));
        }
        if let Some(threshold) = self.positions_threshold {
            tag.push_str(&format!("__pos_{:.2}", threshold));
        }
        if let Some(grid) = self.pixel_scale_interpolation_grid {
            tag.push_str(&format!("__interp_{:.3}", grid));
        }
        tag
    }
}

fn default_sampler() -> String {
    "multinest".to_string()
}

/// Non-linear search configuration handed to the fitter untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_sampler")]
    pub sampler: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_live_points: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_efficiency: Option<f64>,

    #[serde(default)]
    pub const_efficiency_mode: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            sampler: default_sampler(),
            n_live_points: None,
            sampling_efficiency: None,
            const_efficiency_mode: false,
        }
    }
}
