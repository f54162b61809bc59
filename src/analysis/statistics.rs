// src/analysis/statistics.rs

use serde::{Serialize, Deserialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub center: f64,
    pub label: String,
    /// Relative frequency in [0, 1].
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub p: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub confidence_level: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Everything the reducer derives from one result population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub valid_count: usize,
    pub invalid_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Vec<Percentile>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub histogram: Vec<HistogramBin>,
}

pub fn valid_values(results: &[f64]) -> Vec<f64> {
    results.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean; NaN for an empty population.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Sample standard deviation (n - 1). Fewer than two values give 0.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// R-7 percentile (linear interpolation between closest ranks).
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// [`percentile`] over data that is already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 || p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 100.0 {
        return sorted[n - 1];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Central intervals from the sorted population: the full [min, max] span,
/// the standard 90/95/99% levels and the caller's level.
pub fn confidence_intervals(sorted: &[f64], user_confidence: f64) -> Vec<ConfidenceInterval> {
    if sorted.is_empty() {
        return Vec::new();
    }

    let mut intervals = vec![ConfidenceInterval {
        confidence_level: 1.0,
        lower_bound: sorted[0],
        upper_bound: sorted[sorted.len() - 1],
    }];

    let levels = [0.90, 0.95, 0.99, user_confidence.clamp(0.0, 0.9999)];
    intervals.extend(levels.into_iter().map(|confidence| {
        let alpha = 1.0 - confidence;
        ConfidenceInterval {
            confidence_level: confidence,
            lower_bound: percentile_sorted(sorted, alpha / 2.0 * 100.0),
            upper_bound: percentile_sorted(sorted, (1.0 - alpha / 2.0) * 100.0),
        }
    }));

    intervals
}

/// Equal-width histogram over [min, max]. Bins are left-closed, right-open,
/// except the last one which also holds the maximum.
pub fn histogram(values: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() {
        return Vec::new();
    }

    let num_bins = num_bins.max(1);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / num_bins as f64;

    if min == max || !(width > 0.0) || !width.is_finite() {
        return vec![single_bin(min, max)];
    }

    let mut counts = vec![0usize; num_bins];
    for &v in values {
        let index = (((v - min) / width).floor() as usize).min(num_bins - 1);
        counts[index] += 1;
    }

    let total = values.len() as f64;
    let decimals = label_decimals(width);
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lower_bound = min + i as f64 * width;
            let upper_bound = if i == num_bins - 1 { max } else { min + (i + 1) as f64 * width };
            let closing = if i == num_bins - 1 { ']' } else { ')' };
            HistogramBin {
                lower_bound,
                upper_bound,
                center: (lower_bound + upper_bound) / 2.0,
                label: format!(
                    "[{:.*}, {:.*}{}",
                    decimals, lower_bound, decimals, upper_bound, closing
                ),
                probability: count as f64 / total,
            }
        })
        .collect()
}

fn single_bin(min: f64, max: f64) -> HistogramBin {
    let decimals = label_decimals(max.abs().max(1.0) * 1e-3);
    HistogramBin {
        lower_bound: min,
        upper_bound: max,
        center: (min + max) / 2.0,
        label: if min == max {
            format!("{:.*}", decimals, min)
        } else {
            format!("[{:.*}, {:.*}]", decimals, min, decimals, max)
        },
        probability: 1.0,
    }
}

// Enough decimals to tell neighbouring bin edges apart.
fn label_decimals(width: f64) -> usize {
    let digits = -width.abs().log10().floor() + 2.0;
    digits.clamp(0.0, 10.0) as usize
}

/// Filters the population and reduces it in one pass.
pub fn summarize(results: &[f64], num_bins: usize, percentiles: &[f64], confidence: f64) -> Summary {
    let mut valid = valid_values(results);
    valid.sort_by(f64::total_cmp);

    Summary {
        valid_count: valid.len(),
        invalid_count: results.len() - valid.len(),
        min: valid.first().copied().unwrap_or(f64::NAN),
        max: valid.last().copied().unwrap_or(f64::NAN),
        mean: mean(&valid),
        std_dev: std_dev(&valid),
        percentiles: percentiles
            .iter()
            .map(|&p| Percentile { p, value: percentile_sorted(&valid, p) })
            .collect(),
        confidence_intervals: confidence_intervals(&valid, confidence),
        histogram: histogram(&valid, num_bins),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_mean_and_std_dev() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < EPS);
        // sample variance = 32 / 7
        assert!((std_dev(&data) - (32.0f64 / 7.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn test_small_populations() {
        assert!(mean(&[]).is_nan());
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 50.0), 2.5);
        assert!((percentile(&data, 25.0) - 1.75).abs() < EPS);
        assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 0.0), 1.0);
        assert_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 100.0), 4.0);
        assert_eq!(percentile(&data, -5.0), 1.0);
        assert_eq!(percentile(&data, 150.0), 4.0);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_histogram_bins() {
        let data: Vec<f64> = (0..=10).map(f64::from).collect();
        let bins = histogram(&data, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].lower_bound, 0.0);
        assert_eq!(bins[4].upper_bound, 10.0);
        // 0,1 | 2,3 | 4,5 | 6,7 | 8,9,10
        assert!((bins[4].probability - 3.0 / 11.0).abs() < EPS);
        let total: f64 = bins.iter().map(|b| b.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(bins[4].label.ends_with(']'));
        assert!(bins[0].label.ends_with(')'));
    }

    #[test]
    fn test_histogram_identical_values() {
        let bins = histogram(&[2.5, 2.5, 2.5], 23);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].probability, 1.0);
        assert_eq!(bins[0].center, 2.5);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram(&[], 10).is_empty());
    }

    #[test]
    fn test_summary_filters_invalid() {
        let summary = summarize(&[1.0, f64::NAN, 3.0, f64::INFINITY], 4, &[50.0], 0.95);
        assert_eq!(summary.valid_count, 2);
        assert_eq!(summary.invalid_count, 2);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.percentiles[0].value, 2.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
    }

    #[test]
    fn test_confidence_intervals_widen() {
        let data: Vec<f64> = (0..1000).map(f64::from).collect();
        let intervals = confidence_intervals(&data, 0.5);
        assert_eq!(intervals[0].lower_bound, 0.0);
        assert_eq!(intervals[0].upper_bound, 999.0);
        let width = |c: &ConfidenceInterval| c.upper_bound - c.lower_bound;
        assert!(width(&intervals[1]) < width(&intervals[2]));
        assert!(width(&intervals[2]) < width(&intervals[3]));
        assert!(width(&intervals[4]) < width(&intervals[1]));
    }
}
