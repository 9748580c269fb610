use crate::config::{FRONTIER_BUCKETS, FRONTIER_POINTS};
use crate::portfolio;
use crate::rng::SeededRng;
use crate::stats::ReturnStatistics;
use crate::weights;
use serde::Serialize;
use tracing::debug;

// ──────────────────────────────────────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct FrontierConfig {
    pub points: usize,
    pub buckets: usize,
    pub seed: u64,
}

impl FrontierConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            points: FRONTIER_POINTS,
            buckets: FRONTIER_BUCKETS,
            seed,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Data Structures
// ──────────────────────────────────────────────────────────────────────────────

/// One sampled portfolio.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontierPoint {
    pub risk: f64,
    #[serde(rename = "return")]
    pub ret: f64,
    pub sharpe: f64,
    pub weights: Vec<f64>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FrontierResult {
    /// Every sampled portfolio, ordered by risk ascending.
    pub cloud: Vec<FrontierPoint>,
    /// Highest-return point of each non-empty risk bucket, ordered by risk.
    pub frontier: Vec<FrontierPoint>,
    pub best_sharpe: Option<FrontierPoint>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Sampler
// ──────────────────────────────────────────────────────────────────────────────

/// Samples random long-only portfolios and extracts the risk-bucketed upper envelope.
///
/// The envelope is a sampled approximation: each bucket keeps its own best return,
/// with no dominance filtering across buckets.
pub fn sample_frontier(stats: &ReturnStatistics, cfg: &FrontierConfig) -> FrontierResult {
    let n = stats.asset_count();
    if n == 0 || cfg.points == 0 {
        return FrontierResult::default();
    }

    let mut rng = SeededRng::new(cfg.seed);
    let mut cloud = Vec::with_capacity(cfg.points);
    let mut best_sharpe: Option<FrontierPoint> = None;

    for _ in 0..cfg.points {
        let w = weights::random(n, &mut rng);
        let m = portfolio::evaluate(&w, &stats.means, &stats.covariance);
        let point = FrontierPoint {
            risk: m.annual_vol,
            ret: m.annual_return,
            sharpe: m.sharpe,
            weights: w,
        };
        if best_sharpe.as_ref().is_none_or(|b| point.sharpe > b.sharpe) {
            best_sharpe = Some(point.clone());
        }
        cloud.push(point);
    }

    cloud.sort_by(|a, b| a.risk.total_cmp(&b.risk));
    let frontier = upper_envelope(&cloud, cfg.buckets);

    debug!(
        "Frontier sampled: {} points, {} envelope buckets, best sharpe {:.3}",
        cloud.len(),
        frontier.len(),
        best_sharpe.as_ref().map(|b| b.sharpe).unwrap_or(0.0)
    );

    FrontierResult {
        cloud,
        frontier,
        best_sharpe,
    }
}

/// Keeps the max-return point of each equal-width risk bucket.
/// `sorted` must be ordered by risk ascending.
fn upper_envelope(sorted: &[FrontierPoint], buckets: usize) -> Vec<FrontierPoint> {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let buckets = buckets.max(1);
    let min_risk = first.risk;
    let span = last.risk - min_risk;
    let mut width = span / buckets as f64;
    if !(width.is_finite() && width > 0.0) {
        width = 1.0;
    }

    let mut best: Vec<Option<&FrontierPoint>> = vec![None; buckets];
    for p in sorted {
        let idx = (((p.risk - min_risk) / width).floor() as usize).min(buckets - 1);
        match best[idx] {
            Some(b) if b.ret >= p.ret => {}
            _ => best[idx] = Some(p),
        }
    }

    best.into_iter().flatten().cloned().collect()
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────
