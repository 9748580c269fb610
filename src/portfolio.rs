use crate::config::{MONTHS_PER_YEAR, RISK_FREE_RATE};
use serde::Serialize;

// ──────────────────────────────────────────────────────────────────────────────
// Portfolio Metrics
// ──────────────────────────────────────────────────────────────────────────────

/// Annualized risk/return summary of one weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub annual_return: f64,
    pub annual_vol: f64,
    pub sharpe: f64,
}

pub fn portfolio_return(weights: &[f64], means: &[f64]) -> f64 {
    weights.iter().zip(means.iter()).map(|(w, r)| w * r).sum()
}

/// Quadratic form wᵀΣw.
pub fn portfolio_variance(weights: &[f64], cov: &[Vec<f64>]) -> f64 {
    let n = weights.len().min(cov.len());
    let mut var = 0.0;
    for i in 0..n {
        for j in 0..n {
            var += weights[i] * weights[j] * cov[i][j];
        }
    }
    var
}

/// Excess return per unit of volatility; 0 when volatility is 0.
pub fn sharpe_ratio(annual_return: f64, annual_vol: f64) -> f64 {
    if annual_vol > 0.0 {
        (annual_return - RISK_FREE_RATE) / annual_vol
    } else {
        0.0
    }
}

/// Annualizes monthly mean/covariance for the given weights.
///
/// Return is the simple ×12 scaling of the monthly mean; volatility is the
/// square root of wᵀ(12Σ)w with negative noise clamped to zero.
pub fn evaluate(weights: &[f64], means: &[f64], cov: &[Vec<f64>]) -> PortfolioMetrics {
    let annual_return = portfolio_return(weights, means) * MONTHS_PER_YEAR;
    let annual_var = portfolio_variance(weights, cov) * MONTHS_PER_YEAR;
    let annual_vol = annual_var.max(0.0).sqrt();
    PortfolioMetrics {
        annual_return,
        annual_vol,
        sharpe: sharpe_ratio(annual_return, annual_vol),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────
