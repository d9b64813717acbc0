use anyhow::{bail, Context, Result};
use log::{debug, info};
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::evaluation::stats::{display_value, relative_errors, savetxt_value, ErrorStats};
use crate::params::AeParams;
use crate::scaling::InverseScaler;

pub mod stats;

/// Per-snapshot absolute error and reference norm, indexed identically.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotErrors {
    error: Vec<f64>,
    norm: Vec<f64>,
}

impl SnapshotErrors {
    pub fn error(&self) -> &[f64] {
        &self.error
    }

    pub fn norm(&self) -> &[f64] {
        &self.norm
    }

    pub fn len(&self) -> usize {
        self.error.len()
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub field: String,
    pub snapshots: usize,
    pub absolute: ErrorStats,
    pub relative: ErrorStats,
}

impl ErrorSummary {
    pub fn from_sequences(error: &[f64], norm: &[f64], field: &str) -> Result<Self> {
        let relative = relative_errors(error, norm)?;
        Ok(Self {
            field: field.to_string(),
            snapshots: error.len(),
            absolute: ErrorStats::from_values(error).context("absolute error statistics")?,
            relative: ErrorStats::from_values(&relative).context("relative error statistics")?,
        })
    }

    /// Non-finite statistics serialize as `null`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create report dir: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serialize error summary")?;
        std::fs::write(path, text).with_context(|| format!("write report: {}", path.display()))?;
        Ok(())
    }
}

/// Inverse-scales `res` (reconstruction) and `var` (ground truth), then measures every snapshot column.
pub fn compute_error(
    res: ArrayView2<'_, f64>,
    var: ArrayView2<'_, f64>,
    scaler: &dyn InverseScaler,
    params: &AeParams,
) -> Result<SnapshotErrors> {
    if res.shape() != var.shape() {
        bail!(
            "shape mismatch: reconstruction {:?} vs ground truth {:?}",
            res.shape(),
            var.shape()
        );
    }
    let z = scaler
        .invert(var, params.scaling_type)
        .context("inverse-scale ground truth")?;
    let z_net = scaler
        .invert(res, params.scaling_type)
        .context("inverse-scale reconstruction")?;
    if z.shape() != z_net.shape() {
        bail!(
            "inverse scaling produced mismatched shapes: {:?} vs {:?}",
            z.shape(),
            z_net.shape()
        );
    }

    let snapshots = z.len_of(Axis(1));
    let mut error = Vec::with_capacity(snapshots);
    let mut norm = Vec::with_capacity(snapshots);
    for (truth, recon) in z.axis_iter(Axis(1)).zip(z_net.axis_iter(Axis(1))) {
        let diff = &truth - &recon;
        error.push(l2_norm(diff.view()));
        norm.push(l2_norm(truth));
    }
    debug!(
        "computed errors for {} snapshots of {} nodes ({} scaling)",
        snapshots,
        z.len_of(Axis(0)),
        params.scaling_type
    );
    Ok(SnapshotErrors { error, norm })
}

fn l2_norm(v: ArrayView1<'_, f64>) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Writes the absolute and relative error report for `field` to `out`.
pub fn write_error<W: Write>(out: &mut W, error: &[f64], norm: &[f64], field: &str) -> Result<ErrorSummary> {
    let summary = ErrorSummary::from_sequences(error, norm, field)?;
    for (kind, stats) in [("absolute", &summary.absolute), ("relative", &summary.relative)] {
        writeln!(out)?;
        writeln!(out, "Maximum {kind} error for field {field} =  {}", display_value(stats.max))?;
        writeln!(out, "Mean {kind} error for field {field} =  {}", display_value(stats.mean))?;
        writeln!(out, "Minimum {kind} error for field {field} =  {}", display_value(stats.min))?;
    }
    Ok(summary)
}

/// Prints the error report for `field` to stdout.
pub fn print_error(error: &[f64], norm: &[f64], field: &str) -> Result<ErrorSummary> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = write_error(&mut out, error, norm, field)?;
    out.flush().context("flush stdout")?;
    Ok(summary)
}

/// Writes max, mean and min of the relative error, one per line, to
/// `<net_dir>relative_errors<net_run><field>.txt`, replacing any existing file.
pub fn save_error(error: &[f64], norm: &[f64], params: &AeParams, field: &str) -> Result<PathBuf> {
    let relative = relative_errors(error, norm)?;
    let stats = ErrorStats::from_values(&relative).context("relative error statistics")?;
    let path = params.relative_error_path(field);
    let text: String = [stats.max, stats.mean, stats.min]
        .iter()
        .map(|v| format!("{}\n", savetxt_value(*v)))
        .collect();
    std::fs::write(&path, text).with_context(|| format!("write relative errors: {}", path.display()))?;
    info!("Saved relative errors for field {}: {}", field, path.display());
    Ok(path)
}
