//! Statistical functions: descriptive statistics, Student's t distribution
//! and per-feature t-tests

use log::debug;
use ndarray::{Array1, Axis};
use serde::Serialize;

use crate::channels;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};

/// Arithmetic mean; NaN for empty input
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - ddof) as f64
}

/// Median; NaN for empty input
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation from the median (unscaled)
pub fn mad(data: &[f64]) -> f64 {
    let m = median(data);
    let deviations: Vec<f64> = data.iter().map(|x| (x - m).abs()).collect();
    median(&deviations)
}

/// Natural log of the gamma function (Lanczos approximation, g = 7)
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = COEFFS[0];
    let t = x + 7.5;
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// Regularized incomplete beta function I_x(a, b)
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln())
        .exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

// Modified Lentz evaluation of the continued fraction for I_x(a, b).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Cumulative distribution function of Student's t with `df` degrees of freedom
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() {
        return f64::NAN;
    }
    if t == f64::INFINITY {
        return 1.0;
    }
    if t == f64::NEG_INFINITY {
        return 0.0;
    }
    let tail = 0.5 * incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Alternative hypothesis of a t-test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alternative {
    /// Mean differs from the reference
    TwoSided,
    /// Mean is larger than the reference
    Greater,
    /// Mean is smaller than the reference
    Less,
}

/// p-value of a t statistic under the given alternative
pub fn t_pvalue(t: f64, df: f64, alternative: Alternative) -> f64 {
    match alternative {
        Alternative::TwoSided => {
            if t.is_nan() {
                f64::NAN
            } else if t.is_infinite() {
                0.0
            } else {
                incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
            }
        }
        Alternative::Greater => 1.0 - student_t_cdf(t, df),
        Alternative::Less => student_t_cdf(t, df),
    }
}

/// One-sample t-test of `data` against `mu`, returning `(t, p)`
pub fn ttest_1samp(data: &[f64], mu: f64, alternative: Alternative) -> Result<(f64, f64)> {
    if data.len() < 2 {
        return Err(MvpaError::param(format!(
            "a t-test needs at least 2 samples, got {}",
            data.len()
        )));
    }
    let n = data.len() as f64;
    let diff = mean(data) - mu;
    let sem = (variance(data, 1) / n).sqrt();
    let t = if sem == 0.0 {
        if diff == 0.0 {
            f64::NAN
        } else {
            diff.signum() * f64::INFINITY
        }
    } else {
        diff / sem
    };
    Ok((t, t_pvalue(t, n - 1.0, alternative)))
}

/// Per-feature t and p values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTTest {
    /// t statistic per feature
    pub t: Array1<f64>,
    /// p-value per feature
    pub p: Array1<f64>,
}

/// One-sample t-test across samples, separately for every feature
pub fn ttest_features(ds: &Dataset, mu: f64, alternative: Alternative) -> Result<FeatureTTest> {
    let mut t = Array1::zeros(ds.nfeatures());
    let mut p = Array1::zeros(ds.nfeatures());
    for (j, column) in ds.samples().axis_iter(Axis(1)).enumerate() {
        let values: Vec<f64> = column.to_vec();
        let (tj, pj) = ttest_1samp(&values, mu, alternative)?;
        t[j] = tj;
        p[j] = pj;
    }
    debug!(
        target: channels::STATS,
        "t-test over {} samples x {} features against {}",
        ds.nsamples(),
        ds.nfeatures(),
        mu
    );
    Ok(FeatureTTest { t, p })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(close(ln_gamma(1.0), 0.0, 1e-12));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn t_cdf_reference_values() {
        // df = 1 is the Cauchy distribution
        assert!(close(student_t_cdf(1.0, 1.0), 0.75, 1e-9));
        assert!(close(student_t_cdf(0.0, 7.0), 0.5, 1e-12));
        // 97.5% quantile of t(10)
        assert!(close(student_t_cdf(2.228_138_851_986_5, 10.0), 0.975, 1e-6));
        assert!(close(t_pvalue(2.228_138_851_986_5, 10.0, Alternative::TwoSided), 0.05, 1e-6));
    }

    #[test]
    fn one_sample_ttest() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (t, p) = ttest_1samp(&data, 3.0, Alternative::TwoSided).unwrap();
        assert!(close(t, 0.0, 1e-12));
        assert!(close(p, 1.0, 1e-9));

        // mean 3, sem = sqrt(2.5/5); t = 3 / 0.70710678
        let (t, p) = ttest_1samp(&data, 0.0, Alternative::Greater).unwrap();
        assert!(close(t, 4.242_640_687, 1e-6));
        assert!(p < 0.01);

        let (t, p) = ttest_1samp(&[2.0, 2.0, 2.0], 0.0, Alternative::TwoSided).unwrap();
        assert!(t.is_infinite() && p == 0.0);
        assert!(ttest_1samp(&[1.0], 0.0, Alternative::TwoSided).is_err());
    }

    #[test]
    fn robust_location_and_scale() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(mad(&[1.0, 1.0, 2.0, 2.0, 4.0, 6.0, 9.0]), 1.0);
    }
}
