//! NTC thermistor polynomial fit.
//!
//! The firmware converts the ADC ratio of a thermistor voltage divider to a
//! temperature with a polynomial. This computes that polynomial from the
//! thermistor's datasheet values.

use super::check_arity;
use crate::shell::error::ShellError;
use crate::shell::value::Value;

const KELVIN_OFFSET: f64 = 273.15;
const T_25_KELVIN: f64 = 25.0 + KELVIN_OFFSET;
const SAMPLES: usize = 1000;
const MAX_DEGREE: i64 = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub degree: usize,
    /// Fixed resistor of the divider, ohms.
    pub r_load: f64,
    /// Thermistor resistance at 25 °C, ohms.
    pub r_25: f64,
    pub beta: f64,
    /// Fit range, °C.
    pub t_min: f64,
    pub t_max: f64,
    /// Thermistor on the low side of the divider.
    pub thermistor_bottom: bool,
}

pub(crate) fn calculate_thermistor_coeffs(args: &[Value]) -> Result<Value, ShellError> {
    let params = parse_params("calculate_thermistor_coeffs", args)?;
    let coeffs = fit(&params).ok_or(ShellError::InvalidArgument {
        helper: "calculate_thermistor_coeffs",
        reason: "fit is numerically singular for these parameters".to_string(),
    })?;
    Ok(Value::List(coeffs.into_iter().map(Value::Float).collect()))
}

pub(crate) fn parse_params(helper: &'static str, args: &[Value]) -> Result<FitParams, ShellError> {
    check_arity(helper, args, 6, 7, "6 or 7")?;

    let number = |index: usize| -> Result<f64, ShellError> {
        args[index].as_f64().ok_or(ShellError::ArgumentType {
            helper,
            index: index + 1,
            expected: "a number",
            found: args[index].type_name(),
        })
    };
    let invalid = |reason: &str| ShellError::InvalidArgument {
        helper,
        reason: reason.to_string(),
    };

    let degree = args[0].as_i64().ok_or(ShellError::ArgumentType {
        helper,
        index: 1,
        expected: "an integer",
        found: args[0].type_name(),
    })?;
    if !(1..=MAX_DEGREE).contains(&degree) {
        return Err(invalid(&format!("degree must be between 1 and {MAX_DEGREE}")));
    }

    let params = FitParams {
        degree: degree as usize,
        r_load: number(1)?,
        r_25: number(2)?,
        beta: number(3)?,
        t_min: number(4)?,
        t_max: number(5)?,
        thermistor_bottom: match args.get(6) {
            None => false,
            Some(v) => v.as_bool().ok_or(ShellError::ArgumentType {
                helper,
                index: 7,
                expected: "a bool",
                found: v.type_name(),
            })?,
        },
    };

    if params.r_load <= 0.0 || params.r_25 <= 0.0 {
        return Err(invalid("resistances must be positive"));
    }
    if params.beta <= 0.0 {
        return Err(invalid("Beta must be positive"));
    }
    if params.t_min <= -KELVIN_OFFSET {
        return Err(invalid("Tmin must be above absolute zero"));
    }
    if params.t_min >= params.t_max {
        return Err(invalid("Tmin must be below Tmax"));
    }
    Ok(params)
}

/// Resistance of the thermistor at `temp_c` (beta model).
pub fn resistance(params: &FitParams, temp_c: f64) -> f64 {
    let temp_k = temp_c + KELVIN_OFFSET;
    params.r_25 * (params.beta * (1.0 / temp_k - 1.0 / T_25_KELVIN)).exp()
}

/// Divider output as a fraction of the supply at `temp_c`.
pub fn voltage_ratio(params: &FitParams, temp_c: f64) -> f64 {
    let r = resistance(params, temp_c);
    if params.thermistor_bottom {
        r / (params.r_load + r)
    } else {
        params.r_load / (params.r_load + r)
    }
}

/// Least-squares polynomial mapping voltage ratio to °C, highest power first.
///
/// `None` when the system is singular.
pub fn fit(params: &FitParams) -> Option<Vec<f64>> {
    let step = (params.t_max - params.t_min) / (SAMPLES - 1) as f64;
    let temps: Vec<f64> = (0..SAMPLES).map(|i| params.t_min + step * i as f64).collect();
    let ratios: Vec<f64> = temps.iter().map(|&t| voltage_ratio(params, t)).collect();
    polyfit(&ratios, &temps, params.degree)
}

/// Evaluate a polynomial given highest power first.
pub fn evaluate(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Householder QR least squares on a column-scaled Vandermonde matrix.
fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let rows = x.len();
    let cols = degree + 1;
    if rows < cols {
        return None;
    }

    // column-major; column j holds x^(degree - j)
    let mut a: Vec<Vec<f64>> = (0..cols)
        .map(|j| x.iter().map(|xi| xi.powi((degree - j) as i32)).collect())
        .collect();
    let mut b = y.to_vec();

    let mut scale = vec![1.0; cols];
    for (j, col) in a.iter_mut().enumerate() {
        let norm = col.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        col.iter_mut().for_each(|v| *v /= norm);
        scale[j] = norm;
    }

    for k in 0..cols {
        let norm = a[k][k..].iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        let alpha = if a[k][k] > 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = a[k][k..].to_vec();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|x| x * x).sum();
        if v_norm2 == 0.0 {
            continue;
        }

        for col in a.iter_mut().skip(k) {
            let dot: f64 = v.iter().zip(&col[k..]).map(|(vi, ci)| vi * ci).sum();
            let s = 2.0 * dot / v_norm2;
            for (ci, vi) in col[k..].iter_mut().zip(&v) {
                *ci -= s * vi;
            }
        }
        let dot: f64 = v.iter().zip(&b[k..]).map(|(vi, bi)| vi * bi).sum();
        let s = 2.0 * dot / v_norm2;
        for (bi, vi) in b[k..].iter_mut().zip(&v) {
            *bi -= s * vi;
        }
    }

    // back substitution on the upper triangle
    let mut coeffs = vec![0.0; cols];
    for i in (0..cols).rev() {
        let diag = a[i][i];
        if diag.abs() < f64::EPSILON * 1e-3 {
            return None;
        }
        let tail: f64 = (i + 1..cols).map(|j| a[j][i] * coeffs[j]).sum();
        coeffs[i] = (b[i] - tail) / diag;
    }

    for (c, s) in coeffs.iter_mut().zip(&scale) {
        *c /= s;
    }
    Some(coeffs)
}
