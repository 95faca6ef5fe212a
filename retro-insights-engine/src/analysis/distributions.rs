//! Significance testing for correlation coefficients.

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Two-tailed p-value for a Pearson coefficient over `n` observations.
///
/// Student's t with `n - 2` degrees of freedom:
/// `t = r * sqrt((n - 2) / (1 - r^2))`, `p = 2 * (1 - F(|t|))`.
/// Fewer than three observations give `1.0`, a perfect correlation `0.0`.
pub fn pearson_p_value(r: f64, n: usize) -> f64 {
    if n < 3 || !r.is_finite() {
        return 1.0;
    }
    let r_squared = r * r;
    if r_squared >= 1.0 {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r_squared)).sqrt();
    student_t_two_tailed(t, df)
}

/// Two-tailed tail probability of a t statistic.
pub fn student_t_two_tailed(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(e) => {
            debug!(df, error = %e, "Invalid t distribution, treating as not significant");
            1.0
        }
    }
}
