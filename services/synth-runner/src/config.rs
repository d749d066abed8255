//! Configuration loader for the synthesis runner.
//!
//! A single YAML file describes the input atmosphere, the line model, the
//! run parameters and the output stores. Values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grid_dispatch::{ExecutionMode, OutputPaths, RunConfig, RunPlan};
use line_model::LineModelConfig;
use serde::{Deserialize, Serialize};
use spectral_store::StoreConfig;
use synth_common::AtmosphereConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub atmosphere: AtmosphereConfig,
    #[serde(default)]
    pub model: LineModelConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub outputs: OutputPaths,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<ExecutionMode>,
    pub processes: Option<usize>,
    pub batch_size: Option<usize>,
    pub interpolate: bool,
    pub overwrite: bool,
    pub spectra: Option<PathBuf>,
    pub model: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.mode {
            self.run.mode = mode;
        }
        if let Some(processes) = overrides.processes {
            self.run.processes = processes;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.run.batch_size = batch_size;
        }
        if overrides.interpolate {
            self.run.interpolate = true;
        }
        if overrides.overwrite {
            self.store.overwrite = true;
        }
        if let Some(path) = &overrides.spectra {
            self.outputs.spectra = path.clone();
        }
        if let Some(path) = &overrides.model {
            self.outputs.model = Some(path.clone());
        }
    }

    pub fn plan(&self) -> RunPlan {
        RunPlan {
            run: self.run.clone(),
            store: self.store.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// Checks that need no input data.
    pub fn validate(&self) -> Result<()> {
        self.plan().validate()?;
        self.atmosphere.validate()?;
        self.model.validate()?;
        Ok(())
    }
}

/// Load and parse the runner configuration with environment variable
/// substitution.
pub fn load_runner_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read runner config from {:?}", path.as_ref()))?;

    parse_runner_config(&content)
        .with_context(|| format!("Invalid runner config {:?}", path.as_ref()))
}

pub fn parse_runner_config(content: &str) -> Result<RunnerConfig> {
    let expanded = expand_env_vars(content)?;
    let config: RunnerConfig =
        serde_yaml::from_str(&expanded).context("Failed to parse runner config YAML")?;
    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_common::{Polarization, Quantity, VelocityKind};

    const EXAMPLE: &str = r#"
atmosphere:
  raw_shape: [48, 32, 32]
  axes: [0, 1, 2]
  files:
    T: /data/snap/temperature.raw
    P: /data/snap/pressure.raw
    rho: /data/snap/density.raw
    vz: /data/snap/vz.raw
    Bx: /data/snap/bx.raw
    By: /data/snap/by.raw
    Bz: /data/snap/bz.raw
    tau: /data/snap/tau.raw
    ne: /data/snap/ne.raw
run:
  mode: distributed
  processes: 5
  batch_size: 64
  velocity: momentum
outputs:
  spectra: /out/spectra.zarr
"#;

    #[test]
    fn test_parse_example() {
        let config = parse_runner_config(EXAMPLE).unwrap();
        assert_eq!(config.atmosphere.files.len(), Quantity::COUNT);
        assert_eq!(
            config.atmosphere.files[&Quantity::Velocity],
            PathBuf::from("/data/snap/vz.raw")
        );
        assert_eq!(config.run.mode, ExecutionMode::Distributed);
        assert_eq!(config.run.workers(), 4);
        assert_eq!(config.run.velocity, VelocityKind::Momentum);
        assert_eq!(config.model, LineModelConfig::default());
        assert_eq!(config.model.polarization, Polarization::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = parse_runner_config(EXAMPLE).unwrap();
        config.apply(&Overrides {
            mode: Some(ExecutionMode::Serial),
            batch_size: Some(8),
            interpolate: true,
            model: Some(PathBuf::from("/out/model.zarr")),
            ..Default::default()
        });

        assert_eq!(config.run.mode, ExecutionMode::Serial);
        assert_eq!(config.run.batch_size, 8);
        assert_eq!(config.run.processes, 5);
        assert!(config.run.interpolate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interpolate_without_model_path_invalid() {
        let mut config = parse_runner_config(EXAMPLE).unwrap();
        config.apply(&Overrides {
            interpolate: true,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_output_paths_invalid() {
        let mut config = parse_runner_config(EXAMPLE).unwrap();
        config.apply(&Overrides {
            model: Some(PathBuf::from("/out/spectra.zarr")),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("SYNTH_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${SYNTH_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("SYNTH_NONEXISTENT_VAR");
        let result = expand_env_vars("value_${SYNTH_NONEXISTENT_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("SYNTH_REQUIRED_VAR");
        assert!(expand_env_vars("${SYNTH_REQUIRED_VAR}").is_err());
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        assert!(expand_env_vars("${SYNTH_OPEN").is_err());
    }

    #[test]
    fn test_env_substitution_in_paths() {
        std::env::set_var("SYNTH_OUT_DIR", "/scratch/run42");
        let yaml = EXAMPLE.replace("/out/spectra.zarr", "${SYNTH_OUT_DIR}/spectra.zarr");
        let config = parse_runner_config(&yaml).unwrap();
        assert_eq!(
            config.outputs.spectra,
            PathBuf::from("/scratch/run42/spectra.zarr")
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_runner_config("/nonexistent/synth.yaml").is_err());
    }
}
