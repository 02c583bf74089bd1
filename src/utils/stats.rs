//! Summary statistics over non-missing samples. Missing values are expected
//! to be dropped by the caller before these are invoked; every function is
//! defined only on the concrete values it receives.

/// Arithmetic mean. `None` on an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator). `None` when n < 2.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Standard error of the mean: sample std dev / √n. Undefined (not zero)
/// when n < 2.
pub fn sem(values: &[f64]) -> Option<f64> {
    sample_std_dev(values).map(|sd| sd / (values.len() as f64).sqrt())
}

/// Quantile with linear interpolation between order statistics, the same
/// method pandas uses by default. `q` must be in [0, 1] and `sorted` must be
/// ascending; `None` on an empty sample.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;
    if lo + 1 >= sorted.len() {
        return Some(sorted[sorted.len() - 1]);
    }
    Some(sorted[lo] + frac * (sorted[lo + 1] - sorted[lo]))
}

pub fn median(sorted: &[f64]) -> Option<f64> {
    quantile(sorted, 0.5)
}

/// Percentile rank of `score` within `values` with weak ordering: the share
/// of values less than or equal to the score, as a percentage. This matches
/// `scipy.stats.percentileofscore(kind='weak')`.
pub fn percentile_rank(values: &[f64], score: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let at_or_below = values.iter().filter(|v| **v <= score).count();
    Some(at_or_below as f64 * 100.0 / values.len() as f64)
}

/// Sorts a copy ascending, dropping nothing; callers filter missing values
/// out before reaching the stats layer.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}
