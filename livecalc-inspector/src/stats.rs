//! Summary statistics and histograms over a decoded resource's values.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Linear-interpolated percentile over a sorted copy of `values`, matching
/// the "R-7" method most statistics packages default to.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * frac
    }
}

pub fn statistics(values: &[f64]) -> Statistics {
    if values.is_empty() {
        return Statistics {
            count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            stddev: 0.0,
            p25: 0.0,
            p50: 0.0,
            p75: 0.0,
            p90: 0.0,
            p95: 0.0,
            p99: 0.0,
        };
    }
    let count = values.len();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    Statistics {
        count,
        min,
        max,
        mean,
        stddev: variance.sqrt(),
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.50),
        p75: percentile(&sorted, 0.75),
        p90: percentile(&sorted, 0.90),
        p95: percentile(&sorted, 0.95),
        p99: percentile(&sorted, 0.99),
    }
}

/// One bin of a fixed-width histogram over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub min: f64,
    pub max: f64,
    pub center: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub bin_width: f64,
    pub total_count: u64,
}

/// Fixed-width histogram over `[min, max]`. Values at or above `max` fall
/// into the last bin, matching `min(floor((v-min)/bin_width), bin_count-1)`.
pub fn histogram(values: &[f64], bin_count: usize) -> Histogram {
    if bin_count == 0 || values.is_empty() {
        return Histogram { bins: Vec::new(), bin_width: 0.0, total_count: 0 };
    }
    let stats = statistics(values);
    let span = stats.max - stats.min;
    let bin_width = if span == 0.0 { 1.0 } else { span / bin_count as f64 };

    let mut counts = vec![0u64; bin_count];
    for &v in values {
        let idx = if span == 0.0 {
            0
        } else {
            (((v - stats.min) / bin_width).floor() as isize).max(0) as usize
        };
        counts[idx.min(bin_count - 1)] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let bin_min = stats.min + i as f64 * bin_width;
            let bin_max = bin_min + bin_width;
            HistogramBin { min: bin_min, max: bin_max, center: (bin_min + bin_max) / 2.0, count }
        })
        .collect();

    Histogram { bins, bin_width, total_count: values.len() as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_over_known_values() {
        let stats = statistics(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.p50, 2.5);
    }

    #[test]
    fn percentiles_interpolate_linearly_over_ten_values() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let stats = statistics(&values);
        assert!((stats.p90 - 9.1).abs() < 1e-9);
    }

    #[test]
    fn histogram_sums_to_total_count() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let hist = histogram(&values, 3);
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<u64>(), values.len() as u64);
        assert_eq!(hist.total_count, values.len() as u64);
    }

    #[test]
    fn histogram_max_value_falls_in_last_bin() {
        let values = vec![0.0, 10.0];
        let hist = histogram(&values, 5);
        assert_eq!(hist.bins.last().unwrap().count, 1);
    }

    #[test]
    fn empty_values_yield_zeroed_statistics() {
        assert_eq!(statistics(&[]).count, 0);
    }
}
