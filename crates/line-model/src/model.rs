//! Gaussian line synthesis.

use ndarray::{Array1, Array2};
use synth_common::{
    Column, OutputLayout, PhysicsModel, Polarization, Quantity, Result, Synthesis, SynthError,
};
use tracing::debug;

use crate::config::LineModelConfig;
use crate::interp::interp_linear;

const SPEED_OF_LIGHT: f64 = 2.997_924_58e10; // cm/s
const BOLTZMANN: f64 = 1.380_649e-16; // erg/K
const AMU: f64 = 1.660_539_07e-24; // g
const LARMOR: f64 = 4.6686e-13; // Angstrom^-1 G^-1
const SOLAR_TEFF: f64 = 5778.0;

/// Quantities written to a resampled model, in channel order.
pub const MODEL_CHANNELS: [Quantity; 7] = [
    Quantity::Temperature,
    Quantity::Pressure,
    Quantity::ElectronDensity,
    Quantity::Velocity,
    Quantity::FieldX,
    Quantity::FieldY,
    Quantity::FieldZ,
];

/// Analytic line model. See the crate docs.
#[derive(Debug, Clone)]
pub struct LineModel {
    config: LineModelConfig,
    /// Output axis, relative to the zero point [mAngstrom].
    wavelength: Array1<f64>,
    /// Absolute wavelength of each point [Angstrom].
    absolute: Vec<f64>,
    /// Region each wavelength point belongs to.
    region_of: Vec<usize>,
}

struct FormationPoint {
    temperature: f64,
    velocity: f64,
    bx: f64,
    by: f64,
    bz: f64,
}

impl LineModel {
    fn formation_point(column: &Column) -> Result<FormationPoint> {
        let log_tau: Vec<f64> = column
            .get(Quantity::Tau)
            .iter()
            .map(|&t| t.max(f64::MIN_POSITIVE).log10())
            .collect();

        let at_unity = |q: Quantity| -> f64 {
            let values = column.get(q).to_vec();
            interp_linear(&log_tau, &values, 0.0)
        };

        let temperature = at_unity(Quantity::Temperature);
        if !(temperature > 0.0) {
            return Err(SynthError::model(format!(
                "non-positive temperature {} at the formation height",
                temperature
            )));
        }

        Ok(FormationPoint {
            temperature,
            velocity: at_unity(Quantity::Velocity),
            bx: at_unity(Quantity::FieldX),
            by: at_unity(Quantity::FieldY),
            bz: at_unity(Quantity::FieldZ),
        })
    }

    fn resample(&self, column: &Column) -> Array2<f64> {
        let log_tau: Vec<f64> = column
            .get(Quantity::Tau)
            .iter()
            .map(|&t| t.max(f64::MIN_POSITIVE).log10())
            .collect();

        let mut model = Array2::zeros((MODEL_CHANNELS.len(), self.config.log_tau.len()));
        for (c, quantity) in MODEL_CHANNELS.iter().enumerate() {
            let values = column.get(*quantity).to_vec();
            for (k, &node) in self.config.log_tau.iter().enumerate() {
                model[[c, k]] = interp_linear(&log_tau, &values, node);
            }
        }
        model
    }
}

impl PhysicsModel for LineModel {
    type Config = LineModelConfig;

    fn from_config(config: LineModelConfig) -> Result<Self> {
        config.validate()?;

        let n = config.n_lambda();
        let mut wavelength = Vec::with_capacity(n);
        let mut absolute = Vec::with_capacity(n);
        let mut region_of = Vec::with_capacity(n);

        for (r, region) in config.regions.iter().enumerate() {
            for i in 0..region.points {
                let offset = region.start_offset + region.step * i as f64;
                let lambda = region.line_center + offset * 1.0e-3;
                absolute.push(lambda);
                wavelength.push((lambda - config.lambda_zeropoint) * 1.0e3);
                region_of.push(r);
            }
            debug!(region = %region.name, points = region.points, "Initialized spectral region");
        }

        Ok(Self {
            config,
            wavelength: Array1::from(wavelength),
            absolute,
            region_of,
        })
    }

    fn config(&self) -> &LineModelConfig {
        &self.config
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout {
            polarization: self.config.polarization,
            n_lambda: self.wavelength.len(),
            lambda_zeropoint: self.config.lambda_zeropoint,
            n_model_channels: MODEL_CHANNELS.len(),
            n_depth_samples: self.config.log_tau.len(),
        }
    }

    fn synth(&self, column: &Column, interpolate: bool) -> Result<Synthesis> {
        let point = Self::formation_point(column)?;
        let n_channels = self.config.polarization.channel_count();
        let mut stokes = Array2::zeros((n_channels, self.wavelength.len()));

        let thermal = 2.0 * BOLTZMANN * point.temperature / (self.config.atomic_mass * AMU);
        let broadening = (thermal + self.config.microturbulence.powi(2)).sqrt() / SPEED_OF_LIGHT;
        let continuum = point.temperature / SOLAR_TEFF;

        for (l, (&lambda, &r)) in self.absolute.iter().zip(&self.region_of).enumerate() {
            let region = &self.config.regions[r];
            let center = region.line_center;
            let doppler = center * broadening;
            let shift = center * point.velocity / SPEED_OF_LIGHT;

            let u = (lambda - center - shift) / doppler;
            let phi = (-u * u).exp();
            let depth = continuum * region.depth;
            stokes[[0, l]] = continuum - depth * phi;

            if self.config.polarization == Polarization::Full {
                let d_i = depth * phi * 2.0 * u / doppler;
                let d2_i = depth * phi * (2.0 - 4.0 * u * u) / (doppler * doppler);
                let zeeman = LARMOR * center * center;
                let transverse = 0.25 * region.lande.powi(2) * zeeman * zeeman;

                stokes[[1, l]] = -transverse * (point.bx * point.bx - point.by * point.by) * d2_i;
                stokes[[2, l]] = -transverse * (2.0 * point.bx * point.by) * d2_i;
                stokes[[3, l]] = -region.lande * zeeman * point.bz * d_i;
            }
        }

        Ok(Synthesis {
            wavelength: self.wavelength.clone(),
            stokes,
            model: interpolate.then(|| self.resample(column)),
        })
    }
}
