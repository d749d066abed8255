//! Line model configuration.

use serde::{Deserialize, Serialize};
use synth_common::{Polarization, Result, SynthError};

/// A contiguous block of equally spaced wavelength points around one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralRegion {
    /// Region name (used for logging only).
    pub name: String,
    /// Line center [Angstrom].
    pub line_center: f64,
    /// First wavelength point, relative to the line center [mAngstrom].
    pub start_offset: f64,
    /// Wavelength step [mAngstrom].
    pub step: f64,
    /// Number of points.
    pub points: usize,
    /// Effective Lande factor.
    #[serde(default = "default_lande")]
    pub lande: f64,
    /// Central line depth in units of the continuum, in (0, 1).
    #[serde(default = "default_depth")]
    pub depth: f64,
}

fn default_lande() -> f64 {
    1.5
}

fn default_depth() -> f64 {
    0.6
}

/// Configuration of [`crate::LineModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineModelConfig {
    pub regions: Vec<SpectralRegion>,

    /// Wavelength the output axis is relative to [Angstrom].
    pub lambda_zeropoint: f64,

    #[serde(default)]
    pub polarization: Polarization,

    /// Microturbulent broadening [cm/s].
    #[serde(default = "default_microturbulence")]
    pub microturbulence: f64,

    /// Atomic mass of the absorber [amu].
    #[serde(default = "default_atomic_mass")]
    pub atomic_mass: f64,

    /// log10(tau) nodes for model resampling.
    #[serde(default = "default_log_tau")]
    pub log_tau: Vec<f64>,
}

fn default_microturbulence() -> f64 {
    1.0e5
}

fn default_atomic_mass() -> f64 {
    55.845
}

fn default_log_tau() -> Vec<f64> {
    (0..=14).map(|i| -5.0 + 0.5 * i as f64).collect()
}

impl Default for LineModelConfig {
    fn default() -> Self {
        Self {
            regions: vec![SpectralRegion {
                name: "fe6302".to_string(),
                line_center: 6302.4936,
                start_offset: -500.0,
                step: 10.0,
                points: 101,
                lande: 2.5,
                depth: 0.6,
            }],
            lambda_zeropoint: 6302.4936,
            polarization: Polarization::Full,
            microturbulence: default_microturbulence(),
            atomic_mass: default_atomic_mass(),
            log_tau: default_log_tau(),
        }
    }
}

impl LineModelConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(SynthError::invalid_config("at least one spectral region is required"));
        }

        for region in &self.regions {
            if region.points == 0 {
                return Err(SynthError::invalid_config(format!(
                    "region {} has no wavelength points",
                    region.name
                )));
            }
            if region.step <= 0.0 {
                return Err(SynthError::invalid_config(format!(
                    "region {} must have a positive step",
                    region.name
                )));
            }
            if !(0.0..1.0).contains(&region.depth) {
                return Err(SynthError::invalid_config(format!(
                    "region {} line depth must be in [0, 1)",
                    region.name
                )));
            }
        }

        if self.log_tau.is_empty() {
            return Err(SynthError::invalid_config("log_tau must not be empty"));
        }

        if self.atomic_mass <= 0.0 {
            return Err(SynthError::invalid_config("atomic_mass must be > 0"));
        }

        Ok(())
    }

    /// Total number of wavelength points over all regions.
    pub fn n_lambda(&self) -> usize {
        self.regions.iter().map(|r| r.points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = LineModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_lambda(), 101);
        assert_eq!(config.log_tau.len(), 15);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LineModelConfig::default();
        config.regions.clear();
        assert!(config.validate().is_err());

        let mut config = LineModelConfig::default();
        config.regions[0].points = 0;
        assert!(config.validate().is_err());

        let mut config = LineModelConfig::default();
        config.regions[0].depth = 1.0;
        assert!(config.validate().is_err());

        let mut config = LineModelConfig::default();
        config.log_tau.clear();
        assert!(config.validate().is_err());
    }
}
