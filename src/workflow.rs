use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use crate::evaluation::{compute_error, print_error, save_error, ErrorSummary};
use crate::io::npz::{read_matrix, write_npz_f64, SnapshotArchive};
use crate::params::AeParams;
use crate::scaling::{tensor_scaling, FittedScaling, IdentityScaler, InverseScaler};

/// Where run parameters come from: an optional JSON file, then per-field overrides.
#[derive(Debug, Clone, Default)]
pub struct ParamSource {
    pub params: Option<PathBuf>,
    pub net_dir: Option<String>,
    pub net_run: Option<String>,
}

impl ParamSource {
    /// Overrides win over the file; the file wins over `AeParams::default()`.
    pub fn resolve(self) -> Result<AeParams> {
        let base = match &self.params {
            Some(path) => AeParams::from_path(path).context("load params")?,
            None => AeParams::default(),
        };
        Ok(AeParams {
            net_dir: self.net_dir.unwrap_or(base.net_dir),
            net_run: self.net_run.unwrap_or(base.net_run),
            ..base
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScaleConfig {
    pub input: PathBuf,
    pub key: String,
    pub out_npz: PathBuf,
    pub out_scaler: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub npz: PathBuf,
    /// Without a fitted scaler the archive is taken to hold physical units.
    pub scaler: Option<PathBuf>,
    pub reference_key: String,
    pub prediction_key: String,
    pub field: String,
    pub out_json: Option<PathBuf>,
}

impl EvaluateConfig {
    pub fn new(npz: impl Into<PathBuf>) -> Self {
        Self {
            npz: npz.into(),
            scaler: None,
            reference_key: "ground_truth".to_string(),
            prediction_key: "prediction".to_string(),
            field: "U".to_string(),
            out_json: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluateOutcome {
    pub summary: ErrorSummary,
    pub relative_errors: PathBuf,
    pub report: Option<PathBuf>,
}

/// Fits the configured scaling on `config.key` and stores the scaled matrix and the scaler.
pub fn run_scale(params: &AeParams, config: &ScaleConfig) -> Result<FittedScaling> {
    let data = read_matrix(&config.input, &config.key)?;
    info!(
        "Scaling {} {:?} with {} scaling, {:?} scaler",
        config.key,
        data.shape(),
        params.scaling_type,
        params.scaler_number
    );
    let (scaler, scaled) = tensor_scaling(data.view(), params.scaling_type, params.scaler_number)?;
    write_npz_f64(&config.out_npz, &[(config.key.as_str(), scaled)])?;
    scaler.write_json(&config.out_scaler)?;
    Ok(scaler)
}

/// Loads both matrices, measures them, prints and saves the statistics, and optionally writes a JSON summary.
pub fn run_evaluate(params: &AeParams, config: &EvaluateConfig) -> Result<EvaluateOutcome> {
    let archive = SnapshotArchive::load(
        &config.npz,
        &[config.reference_key.as_str(), config.prediction_key.as_str()],
    )?;
    let var = archive.require(&config.reference_key)?;
    let res = archive.require(&config.prediction_key)?;

    let fitted;
    let scaler: &dyn InverseScaler = match &config.scaler {
        Some(path) => {
            fitted = FittedScaling::from_path(path).context("load scaler")?;
            &fitted
        }
        None => &IdentityScaler,
    };

    let field = config.field.as_str();
    let errors = compute_error(res.view(), var.view(), scaler, params)
        .with_context(|| format!("compute errors for field {field}"))?;
    let summary = print_error(errors.error(), errors.norm(), field)?;
    let relative_errors = save_error(errors.error(), errors.norm(), params, field)?;

    let report = match &config.out_json {
        Some(path) => {
            summary.write_json(path)?;
            Some(path.clone())
        }
        None => None,
    };
    Ok(EvaluateOutcome {
        summary,
        relative_errors,
        report,
    })
}
