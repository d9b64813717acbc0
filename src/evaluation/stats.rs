use anyhow::{bail, Result};
use serde::Serialize;

/// Max, mean and min of one error sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    pub max: f64,
    pub mean: f64,
    pub min: f64,
}

impl ErrorStats {
    /// A NaN anywhere in `values` makes every statistic NaN; infinities propagate as usual.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            bail!("cannot summarize an empty error sequence");
        }
        if values.iter().any(|v| v.is_nan()) {
            return Ok(Self {
                max: f64::NAN,
                mean: f64::NAN,
                min: f64::NAN,
            });
        }
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(Self { max, mean, min })
    }
}

/// Elementwise `error / norm`. Zero norms are not guarded: they yield `inf` or `NaN`.
pub fn relative_errors(error: &[f64], norm: &[f64]) -> Result<Vec<f64>> {
    if error.len() != norm.len() {
        bail!(
            "error and norm sequences differ in length: {} vs {}",
            error.len(),
            norm.len()
        );
    }
    Ok(error.iter().zip(norm).map(|(e, n)| e / n).collect())
}

/// Formats `value` like numpy's default `savetxt` (`%.18e`).
pub fn savetxt_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    pad_exponent(format!("{value:.18e}"))
}

/// Formats `value` for console output like Python's float `repr`:
/// shortest round-trip digits, `1e-05`-style exponents, lowercase `nan`.
pub fn display_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        pad_exponent(format!("{value:?}"))
    }
}

/// Rewrites a Rust exponent (`e5`, `e-7`) as a signed, two-digit-minimum C exponent.
fn pad_exponent(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}
