use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::scaling::ScalerKind;

/// Scales below this magnitude are treated as constant lanes and left unscaled.
const ZERO_SCALE: f64 = 10.0 * f64::EPSILON;

/// Which lanes carry their own statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAxis {
    /// One offset/scale per snapshot column, computed over its nodes.
    Snapshot,
    /// One offset/scale per node row, computed over all snapshots.
    Node,
}

impl ScaleAxis {
    fn lane_axis(self) -> Axis {
        match self {
            ScaleAxis::Snapshot => Axis(1),
            ScaleAxis::Node => Axis(0),
        }
    }
}

/// Per-lane affine scaler: `scaled = (x - offset) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScaler {
    pub kind: ScalerKind,
    pub axis: ScaleAxis,
    pub offset: Vec<f64>,
    pub scale: Vec<f64>,
}

impl AxisScaler {
    pub fn fit(data: ArrayView2<'_, f64>, axis: ScaleAxis, kind: ScalerKind) -> Result<Self> {
        if data.is_empty() {
            bail!("cannot fit {:?} scaler on empty matrix {:?}", kind, data.shape());
        }
        let lanes = data.len_of(axis.lane_axis());
        let mut offset = Vec::with_capacity(lanes);
        let mut scale = Vec::with_capacity(lanes);
        for lane in data.axis_iter(axis.lane_axis()) {
            let (o, s) = lane_statistics(lane, kind);
            offset.push(o);
            scale.push(if s.abs() < ZERO_SCALE { 1.0 } else { s });
        }
        Ok(Self {
            kind,
            axis,
            offset,
            scale,
        })
    }

    pub fn lanes(&self) -> usize {
        self.offset.len()
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.apply(data, |x, o, s| (x - o) / s)
    }

    pub fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.apply(data, |x, o, s| x * s + o)
    }

    fn apply(&self, data: ArrayView2<'_, f64>, f: impl Fn(f64, f64, f64) -> f64) -> Result<Array2<f64>> {
        let lane_axis = self.axis.lane_axis();
        let lanes = data.len_of(lane_axis);
        if lanes != self.lanes() {
            bail!(
                "{:?} scaler fitted on {} lanes, got matrix {:?} with {} lanes",
                self.axis,
                self.lanes(),
                data.shape(),
                lanes
            );
        }
        let mut out = data.to_owned();
        for (i, mut lane) in out.axis_iter_mut(lane_axis).enumerate() {
            let (o, s) = (self.offset[i], self.scale[i]);
            lane.mapv_inplace(|x| f(x, o, s));
        }
        Ok(out)
    }
}

fn lane_statistics(lane: ArrayView1<'_, f64>, kind: ScalerKind) -> (f64, f64) {
    match kind {
        ScalerKind::MinMax => {
            let min = lane.iter().copied().fold(f64::INFINITY, f64::min);
            let max = lane.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min, max - min)
        }
        ScalerKind::Robust => {
            let mut sorted: Vec<f64> = lane.iter().copied().collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let median = quantile(&sorted, 0.5);
            (median, quantile(&sorted, 0.75) - quantile(&sorted, 0.25))
        }
        ScalerKind::Standard => {
            let n = lane.len() as f64;
            let mean = lane.sum() / n;
            // population std, matching sklearn
            let var = lane.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
            (mean, var.sqrt())
        }
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
