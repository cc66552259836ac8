//! Summary statistics of sampled attribute values.
//!
//! All functions take unsorted samples and return `None` for empty input.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the mean of the two middle values for an even sample size.
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    Some(if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    })
}

/// Smallest and largest value.
pub fn range(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x))),
    )
}

/// Shortest interval containing `mass` of the sample (highest posterior
/// density interval).
///
/// Every window of `ceil(mass * n)` consecutive sorted values is checked and
/// the first narrowest one wins, so the bounds are sample values.
///
/// # Example
/// ```
/// use treeannotator::summary::stats::hpd_interval;
///
/// let values = [1.0, 2.0, 2.1, 2.2, 9.0];
/// assert_eq!(hpd_interval(&values, 0.6), Some((2.0, 2.2)));
/// ```
pub fn hpd_interval(values: &[f64], mass: f64) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let window = ((mass * n as f64).ceil() as usize).clamp(1, n);
    let mut best_start = 0;
    let mut best_width = f64::INFINITY;
    for start in 0..=(n - window) {
        let width = sorted[start + window - 1] - sorted[start];
        if width < best_width {
            best_width = width;
            best_start = start;
        }
    }

    Some((sorted[best_start], sorted[best_start + window - 1]))
}

/// Quantile `p` of the sample, interpolating linearly between order
/// statistics (R's default, type 7).
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    Some(sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower]))
}

/// Sample standard deviation (denominator `n - 1`), `0.0` for fewer than
/// two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    if values.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Fraction of `true` values.
pub fn fraction_true(values: &[bool]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().filter(|&&b| b).count() as f64 / values.len() as f64)
}

// =#========================================================================#=
// DISCRETE VALUES
// =#========================================================================€=
/// Mode and frequency table of a discrete attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSummary {
    /// Most frequent value, tied values joined with `+` in first-seen order
    pub mode: String,
    /// Combined frequency of the tied most frequent values
    pub mode_probability: f64,
    /// Distinct values in first-seen order
    pub set: Vec<String>,
    /// Frequency of each value of `set`, summing to one
    pub set_probabilities: Vec<f64>,
}

/// Summarizes discrete values by mode and relative frequencies.
///
/// # Example
/// ```
/// use treeannotator::summary::stats::discrete_summary;
///
/// let summary = discrete_summary(&["X", "X", "Y"]).unwrap();
/// assert_eq!(summary.mode, "X");
/// assert!((summary.mode_probability - 2.0 / 3.0).abs() < 1e-12);
/// assert_eq!(summary.set, ["X", "Y"]);
/// ```
pub fn discrete_summary<S: AsRef<str>>(values: &[S]) -> Option<DiscreteSummary> {
    if values.is_empty() {
        return None;
    }

    let mut set: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for value in values {
        let value = value.as_ref();
        match set.iter().position(|seen| seen == value) {
            Some(i) => counts[i] += 1,
            None => {
                set.push(value.to_string());
                counts.push(1);
            }
        }
    }

    let max_count = counts.iter().copied().max().unwrap_or(0);
    let modes: Vec<&str> = set
        .iter()
        .zip(&counts)
        .filter(|&(_, &count)| count == max_count)
        .map(|(value, _)| value.as_str())
        .collect();

    let total = values.len() as f64;
    Some(DiscreteSummary {
        mode: modes.join("+"),
        mode_probability: max_count as f64 / total * modes.len() as f64,
        set_probabilities: counts.iter().map(|&c| c as f64 / total).collect(),
        set,
    })
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_and_even_samples() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn hpd_is_narrowest_window_of_sample_values() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin()).collect();
        let mass = 0.9;
        let (lo, hi) = hpd_interval(&values, mass).unwrap();
        assert!(values.contains(&lo) && values.contains(&hi));

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let window = (mass * 100.0_f64).ceil() as usize;
        for start in 0..=(100 - window) {
            assert!(hi - lo <= sorted[start + window - 1] - sorted[start]);
        }
    }

    #[test]
    fn hpd_keeps_first_of_equal_windows() {
        assert_eq!(hpd_interval(&[1.0, 2.0, 3.0, 4.0], 0.5), Some((1.0, 2.0)));
    }

    #[test]
    fn hpd_of_full_mass_is_range() {
        let values = [5.0, -1.0, 3.0];
        assert_eq!(hpd_interval(&values, 1.0), range(&values));
    }

    #[test]
    fn quantile_interpolates_like_r() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
    }

    #[test]
    fn ties_in_mode_are_joined() {
        let summary = discrete_summary(&["B", "A", "A", "B", "C"]).unwrap();
        assert_eq!(summary.mode, "B+A");
        assert!((summary.mode_probability - 0.8).abs() < 1e-12);
        assert_eq!(summary.set, ["B", "A", "C"]);
        let total: f64 = summary.set_probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fraction_of_true_values() {
        assert_eq!(fraction_true(&[true, false, true, true]), Some(0.75));
        assert_eq!(std_dev(&[2.0]), 0.0);
    }
}
