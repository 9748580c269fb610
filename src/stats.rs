use serde::Serialize;

// ──────────────────────────────────────────────────────────────────────────────
// Sample Statistics
// ──────────────────────────────────────────────────────────────────────────────

/// Arithmetic mean. An empty slice yields 0.
pub fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len().max(1) as f64
}

/// Unbiased sample covariance matrix (divisor T−1) of aligned series.
///
/// `series[i]` is the return history of asset i. Every row is expected to have
/// the same length T; if T < 2 the result is an n×n matrix of zeros.
pub fn covariance(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = series.len();
    let mut cov = vec![vec![0.0; n]; n];
    let periods = series.iter().map(Vec::len).min().unwrap_or(0);
    if periods < 2 {
        return cov;
    }

    let means: Vec<f64> = series.iter().map(|s| mean(&s[..periods])).collect();
    let denom = (periods - 1) as f64;
    for i in 0..n {
        for j in i..n {
            let sum: f64 = (0..periods)
                .map(|t| (series[i][t] - means[i]) * (series[j][t] - means[j]))
                .sum();
            let c = sum / denom;
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

/// Pearson correlation derived from a covariance matrix.
/// Entries involving a zero standard deviation are 0.
pub fn correlation(cov: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = cov.len();
    let sd: Vec<f64> = (0..n).map(|i| cov[i][i].max(0.0).sqrt()).collect();
    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if sd[i] > 0.0 && sd[j] > 0.0 {
                corr[i][j] = (cov[i][j] / (sd[i] * sd[j])).clamp(-1.0, 1.0);
            }
        }
    }
    corr
}

/// Everything the metrics and frontier layers need from a set of aligned series.
#[derive(Clone, Debug, Serialize)]
pub struct ReturnStatistics {
    pub means: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub correlation: Vec<Vec<f64>>,
}

impl ReturnStatistics {
    pub fn from_series(series: &[Vec<f64>]) -> Self {
        let means = series.iter().map(|s| mean(s)).collect();
        let covariance = covariance(series);
        let correlation = correlation(&covariance);
        Self {
            means,
            covariance,
            correlation,
        }
    }

    pub fn asset_count(&self) -> usize {
        self.means.len()
    }
}

/// A distinct (i, j) asset pair with its correlation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub first: usize,
    pub second: usize,
    pub correlation: f64,
}

/// The `k` most positively correlated distinct pairs, highest first.
pub fn top_correlated_pairs(corr: &[Vec<f64>], k: usize) -> Vec<CorrelatedPair> {
    let n = corr.len();
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push(CorrelatedPair {
                first: i,
                second: j,
                correlation: corr[i][j],
            });
        }
    }
    pairs.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    pairs.truncate(k);
    pairs
}
