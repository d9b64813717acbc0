use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use crate::scaling::axis::{AxisScaler, ScaleAxis};

pub mod axis;

/// Order in which per-snapshot and per-node scaling are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ScalingType {
    Sample,
    Feature,
    FeatureSample,
    SampleFeature,
}

impl ScalingType {
    /// Forward stages, in application order.
    pub fn stages(self) -> &'static [ScaleAxis] {
        match self {
            ScalingType::Sample => &[ScaleAxis::Snapshot],
            ScalingType::Feature => &[ScaleAxis::Node],
            ScalingType::FeatureSample => &[ScaleAxis::Node, ScaleAxis::Snapshot],
            ScalingType::SampleFeature => &[ScaleAxis::Snapshot, ScaleAxis::Node],
        }
    }
}

impl TryFrom<u8> for ScalingType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ScalingType::Sample),
            2 => Ok(ScalingType::Feature),
            3 => Ok(ScalingType::FeatureSample),
            4 => Ok(ScalingType::SampleFeature),
            other => Err(anyhow!("unknown scaling type {other} (expected 1-4)")),
        }
    }
}

impl From<ScalingType> for u8 {
    fn from(value: ScalingType) -> Self {
        match value {
            ScalingType::Sample => 1,
            ScalingType::Feature => 2,
            ScalingType::FeatureSample => 3,
            ScalingType::SampleFeature => 4,
        }
    }
}

impl fmt::Display for ScalingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalingType::Sample => "sample",
            ScalingType::Feature => "feature",
            ScalingType::FeatureSample => "feature-sample",
            ScalingType::SampleFeature => "sample-feature",
        };
        write!(f, "{name} ({})", u8::from(*self))
    }
}

/// Statistic used by each scaling stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ScalerKind {
    MinMax,
    Robust,
    Standard,
}

impl TryFrom<u8> for ScalerKind {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ScalerKind::MinMax),
            2 => Ok(ScalerKind::Robust),
            3 => Ok(ScalerKind::Standard),
            other => Err(anyhow!("unknown scaler number {other} (expected 1-3)")),
        }
    }
}

impl From<ScalerKind> for u8 {
    fn from(value: ScalerKind) -> Self {
        match value {
            ScalerKind::MinMax => 1,
            ScalerKind::Robust => 2,
            ScalerKind::Standard => 3,
        }
    }
}

/// Maps scaled snapshot matrices (snapshots as columns) back to physical units.
pub trait InverseScaler {
    fn invert(&self, data: ArrayView2<'_, f64>, scaling_type: ScalingType) -> Result<Array2<f64>>;
}

/// Pass-through for data that was never scaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScaler;

impl InverseScaler for IdentityScaler {
    fn invert(&self, data: ArrayView2<'_, f64>, _scaling_type: ScalingType) -> Result<Array2<f64>> {
        Ok(data.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaling {
    pub scaling_type: ScalingType,
    pub stages: Vec<AxisScaler>,
}

impl FittedScaling {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("read scaler: {}", path.display()))?;
        let scaling: FittedScaling =
            serde_json::from_str(&text).with_context(|| format!("parse scaler: {}", path.display()))?;
        Ok(scaling)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create scaler dir: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serialize scaler")?;
        std::fs::write(path, text).with_context(|| format!("write scaler: {}", path.display()))?;
        Ok(())
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut current = data.to_owned();
        for stage in &self.stages {
            current = stage.transform(current.view())?;
        }
        Ok(current)
    }
}

impl InverseScaler for FittedScaling {
    fn invert(&self, data: ArrayView2<'_, f64>, scaling_type: ScalingType) -> Result<Array2<f64>> {
        if scaling_type != self.scaling_type {
            bail!(
                "scaler was fitted with scaling type {}, asked to invert {}",
                self.scaling_type,
                scaling_type
            );
        }
        let mut current = data.to_owned();
        for stage in self.stages.iter().rev() {
            current = stage
                .inverse_transform(current.view())
                .with_context(|| format!("invert {:?} stage", stage.axis))?;
        }
        Ok(current)
    }
}

/// Fits the stages of `scaling_type` on `data` and returns the scaler with the scaled matrix.
pub fn tensor_scaling(
    data: ArrayView2<'_, f64>,
    scaling_type: ScalingType,
    kind: ScalerKind,
) -> Result<(FittedScaling, Array2<f64>)> {
    let mut current = data.to_owned();
    let mut stages = Vec::with_capacity(scaling_type.stages().len());
    for &axis in scaling_type.stages() {
        let stage = AxisScaler::fit(current.view(), axis, kind)
            .with_context(|| format!("fit {:?} stage of {} scaling", axis, scaling_type))?;
        current = stage.transform(current.view())?;
        debug!("fitted {:?} {:?} stage over {} lanes", kind, axis, stage.lanes());
        stages.push(stage);
    }
    Ok((FittedScaling { scaling_type, stages }, current))
}
