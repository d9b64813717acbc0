use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scaling::{ScalerKind, ScalingType};

/// Autoencoder run parameters needed to locate outputs and undo scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeParams {
    /// Output directory prefix. Joined by plain concatenation, so it normally ends in `/`.
    pub net_dir: String,
    /// Run tag embedded in output file names.
    pub net_run: String,
    pub scaling_type: ScalingType,
    pub scaler_number: ScalerKind,
}

impl Default for AeParams {
    fn default() -> Self {
        Self {
            net_dir: "./".to_string(),
            net_run: "gca_rom".to_string(),
            scaling_type: ScalingType::SampleFeature,
            scaler_number: ScalerKind::Standard,
        }
    }
}

impl AeParams {
    pub fn new(
        net_dir: impl Into<String>,
        net_run: impl Into<String>,
        scaling_type: ScalingType,
        scaler_number: ScalerKind,
    ) -> Self {
        Self {
            net_dir: net_dir.into(),
            net_run: net_run.into(),
            scaling_type,
            scaler_number,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("read params: {}", path.display()))?;
        let params: AeParams =
            serde_json::from_str(&text).with_context(|| format!("parse params: {}", path.display()))?;
        Ok(params)
    }

    /// `<net_dir>relative_errors<net_run><field>.txt`
    pub fn relative_error_path(&self, field: &str) -> PathBuf {
        PathBuf::from(format!("{}relative_errors{}{}.txt", self.net_dir, self.net_run, field))
    }
}
