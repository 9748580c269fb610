use crate::align;
use crate::config::{DEFAULT_ASSETS, DEFAULT_MOCK_MONTHS, DEFAULT_SEED};
use crate::data::{self, CsvImportError};
use crate::frontier::{self, FrontierConfig, FrontierResult};
use crate::portfolio::{self, PortfolioMetrics};
use crate::rng::SeededRng;
use crate::stats::ReturnStatistics;
use crate::synthetic;
use crate::weights;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// ──────────────────────────────────────────────────────────────────────────────
// Data Structures
// ──────────────────────────────────────────────────────────────────────────────

/// Stable identifier of an asset; never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SeriesSource {
    #[serde(rename = "MOCK")]
    Mock,
    #[serde(rename = "CSV")]
    Csv,
}

impl SeriesSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "MOCK",
            Self::Csv => "CSV",
        }
    }
}

#[derive(Clone, Debug)]
struct Upload {
    filename: Option<String>,
    returns: Vec<f64>,
}

/// One asset plus the data backing it. Slot order is display order.
#[derive(Clone, Debug)]
pub struct AssetSlot {
    pub id: AssetId,
    pub ticker: String,
    pub name: String,
    mock: Vec<f64>,
    upload: Option<Upload>,
}

impl AssetSlot {
    pub fn series(&self) -> &[f64] {
        match &self.upload {
            Some(u) => &u.returns,
            None => &self.mock,
        }
    }

    pub fn source(&self) -> SeriesSource {
        if self.upload.is_some() {
            SeriesSource::Csv
        } else {
            SeriesSource::Mock
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.upload.as_ref().and_then(|u| u.filename.as_deref())
    }
}

/// Derived values, recomputed only by `Session::recompute`.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub aligned_len: usize,
    pub statistics: ReturnStatistics,
    pub metrics: PortfolioMetrics,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            aligned_len: 0,
            statistics: ReturnStatistics::from_series(&[]),
            metrics: PortfolioMetrics::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FrontierState {
    pub result: Option<FrontierResult>,
    /// True when statistics changed after the last run (or no run happened yet).
    pub stale: bool,
    pub generated_at: Option<String>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Dirty {
    statistics: bool,
    metrics: bool,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("ticker cannot be empty")]
    EmptyTicker,

    #[error("cannot remove the last asset")]
    LastAsset,

    #[error("{ticker}: {source}")]
    Upload {
        ticker: String,
        #[source]
        source: CsvImportError,
    },
}

// ──────────────────────────────────────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────────────────────────────────────

/// The single in-memory portfolio: assets, weights, generator settings, and the
/// derived statistics/frontier.
///
/// Every mutation marks what it invalidates; `recompute` brings the snapshot up to
/// date. Weight edits never invalidate the frontier.
#[derive(Clone, Debug)]
pub struct Session {
    slots: Vec<AssetSlot>,
    weights: Vec<f64>,
    seed: u64,
    months: usize,
    next_id: u64,
    weight_draws: u64,
    snapshot: Snapshot,
    dirty: Dirty,
    frontier: FrontierState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_ASSETS, DEFAULT_SEED, DEFAULT_MOCK_MONTHS)
    }
}

impl Session {
    /// Creates a session over `(ticker, name)` pairs with uniform weights.
    pub fn new(assets: &[(&str, &str)], seed: u64, months: usize) -> Self {
        let mut session = Self {
            slots: Vec::with_capacity(assets.len()),
            weights: Vec::new(),
            seed,
            months,
            next_id: 0,
            weight_draws: 0,
            snapshot: Snapshot::default(),
            dirty: Dirty {
                statistics: true,
                metrics: true,
            },
            frontier: FrontierState {
                stale: true,
                ..FrontierState::default()
            },
        };
        for (ticker, name) in assets {
            let id = session.allocate_id();
            session.slots.push(AssetSlot {
                id,
                ticker: ticker.trim().to_uppercase(),
                name: name.to_string(),
                mock: Vec::new(),
                upload: None,
            });
        }
        session.weights = weights::uniform(session.slots.len());
        session.regenerate_mock();
        session.recompute();
        session
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn assets(&self) -> &[AssetSlot] {
        &self.slots
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn months(&self) -> usize {
        self.months
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn frontier(&self) -> &FrontierState {
        &self.frontier
    }

    pub fn index_of(&self, id: AssetId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    fn require_index(&self, id: AssetId) -> Result<usize, SessionError> {
        self.index_of(id).ok_or(SessionError::UnknownAsset(id))
    }

    pub fn asset(&self, id: AssetId) -> Option<&AssetSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Raw per-asset series in slot order (uploaded data wins over mock data).
    pub fn series(&self) -> Vec<Vec<f64>> {
        self.slots.iter().map(|s| s.series().to_vec()).collect()
    }

    pub fn aligned_series(&self) -> Vec<Vec<f64>> {
        align::align_series(&self.series())
    }

    // ── Asset set ──────────────────────────────────────────────────────────

    pub fn add_asset(&mut self, ticker: &str, name: Option<&str>) -> Result<AssetId, SessionError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(SessionError::EmptyTicker);
        }
        let id = self.allocate_id();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ticker.clone());
        info!("Adding asset {} ({}) as {}", ticker, name, id);

        self.slots.push(AssetSlot {
            id,
            ticker,
            name,
            mock: Vec::new(),
            upload: None,
        });
        self.weights = weights::resize(&self.weights, self.slots.len());
        self.regenerate_mock();
        Ok(id)
    }

    /// Removes an asset, compacting the slot list and its weight entry together.
    pub fn remove_asset(&mut self, id: AssetId) -> Result<(), SessionError> {
        let idx = self.require_index(id)?;
        if self.slots.len() == 1 {
            return Err(SessionError::LastAsset);
        }
        let slot = self.slots.remove(idx);
        let mut remaining = self.weights.clone();
        remaining.remove(idx);
        self.weights = weights::resize(&remaining, self.slots.len());
        info!("Removed asset {} ({})", slot.ticker, id);
        self.regenerate_mock();
        Ok(())
    }

    // ── Weights ────────────────────────────────────────────────────────────

    pub fn set_weight(&mut self, id: AssetId, value: f64) -> Result<(), SessionError> {
        let idx = self.require_index(id)?;
        self.weights = weights::set_weight(&self.weights, idx, value);
        self.dirty.metrics = true;
        Ok(())
    }

    pub fn reset_weights(&mut self) {
        self.weights = weights::uniform(self.slots.len());
        self.dirty.metrics = true;
    }

    /// Seeded random long-only weights; successive calls draw different vectors.
    pub fn randomize_weights(&mut self) {
        self.weight_draws += 1;
        let mut rng = SeededRng::new(
            self.seed
                .wrapping_add(self.weight_draws.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        );
        self.weights = weights::random(self.slots.len(), &mut rng);
        self.dirty.metrics = true;
    }

    // ── Data ───────────────────────────────────────────────────────────────

    /// Regenerates every mock series with a new seed (and optionally a new length).
    pub fn set_seed(&mut self, seed: u64, months: Option<usize>) {
        self.seed = seed;
        if let Some(m) = months {
            self.months = m;
        }
        self.weight_draws = 0;
        info!("Regenerating synthetic series: seed={}, months={}", self.seed, self.months);
        self.regenerate_mock();
    }

    /// Replaces an asset's series with returns parsed from CSV text.
    /// On failure the asset keeps its previous series.
    pub fn upload_csv(
        &mut self,
        id: AssetId,
        filename: Option<&str>,
        text: &str,
    ) -> Result<usize, SessionError> {
        let idx = self.require_index(id)?;
        let returns = data::import_upload(text).map_err(|source| SessionError::Upload {
            ticker: self.slots[idx].ticker.clone(),
            source,
        })?;
        let count = returns.len();
        let slot = &mut self.slots[idx];
        info!("Accepted upload for {}: {} monthly returns", slot.ticker, count);
        slot.upload = Some(Upload {
            filename: filename.map(str::to_string),
            returns,
        });
        self.invalidate_statistics();
        Ok(count)
    }

    /// Drops an uploaded series so the asset falls back to mock data.
    pub fn clear_upload(&mut self, id: AssetId) -> Result<(), SessionError> {
        let idx = self.require_index(id)?;
        if self.slots[idx].upload.take().is_some() {
            self.invalidate_statistics();
        }
        Ok(())
    }

    fn regenerate_mock(&mut self) {
        let tickers: Vec<&str> = self.slots.iter().map(|s| s.ticker.as_str()).collect();
        let series = synthetic::generate_series(&tickers, self.months, self.seed);
        for (slot, s) in self.slots.iter_mut().zip(series) {
            slot.mock = s;
        }
        self.invalidate_statistics();
    }

    fn invalidate_statistics(&mut self) {
        self.dirty.statistics = true;
        self.dirty.metrics = true;
        self.frontier.stale = true;
    }

    fn allocate_id(&mut self) -> AssetId {
        let id = AssetId(self.next_id);
        self.next_id += 1;
        id
    }

    // ── Derived values ─────────────────────────────────────────────────────

    /// Brings the snapshot up to date with whatever the last mutations invalidated.
    pub fn recompute(&mut self) -> &Snapshot {
        if self.dirty.statistics {
            let aligned = self.aligned_series();
            self.snapshot.aligned_len = align::aligned_len(&aligned);
            self.snapshot.statistics = ReturnStatistics::from_series(&aligned);
        }
        if self.dirty.statistics || self.dirty.metrics {
            let stats = &self.snapshot.statistics;
            self.snapshot.metrics =
                portfolio::evaluate(&self.weights, &stats.means, &stats.covariance);
        }
        self.dirty = Dirty::default();
        &self.snapshot
    }

    /// Runs the Monte-Carlo sampler on current statistics using the session seed.
    pub fn generate_frontier(&mut self) -> &FrontierResult {
        self.recompute();
        let cfg = FrontierConfig::with_seed(self.seed);
        let result = frontier::sample_frontier(&self.snapshot.statistics, &cfg);
        info!(
            "Frontier generated: {} portfolios, {} envelope points",
            result.cloud.len(),
            result.frontier.len()
        );
        self.frontier.stale = false;
        self.frontier.generated_at = Some(chrono::Local::now().to_rfc3339());
        self.frontier.result.insert(result)
    }

    // ── Views ──────────────────────────────────────────────────────────────

    pub fn view(&self) -> SessionView {
        SessionView {
            seed: self.seed,
            months: self.months,
            assets: self
                .slots
                .iter()
                .zip(self.weights.iter())
                .map(|(s, &w)| AssetView {
                    id: s.id,
                    ticker: s.ticker.clone(),
                    name: s.name.clone(),
                    weight: w,
                    source: s.source(),
                    filename: s.filename().map(str::to_string),
                    points: s.series().len(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AssetView {
    pub id: AssetId,
    pub ticker: String,
    pub name: String,
    pub weight: f64,
    pub source: SeriesSource,
    pub filename: Option<String>,
    pub points: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub seed: u64,
    pub months: usize,
    pub assets: Vec<AssetView>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_with_returns(count: usize) -> String {
        let mut out = String::from("Date,Close\n");
        let mut price = 100.0;
        for i in 0..=count {
            out.push_str(&format!("2015-{:02}-{:02},{}\n", i / 28 + 1, i % 28 + 1, price));
            price *= if i % 2 == 0 { 1.03 } else { 0.99 };
        }
        out
    }

    fn id_at(session: &Session, idx: usize) -> AssetId {
        session.assets()[idx].id
    }

    fn assert_weights_valid(session: &Session) {
        let sum: f64 = session.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(session.weights().iter().all(|&w| w >= 0.0));
        assert_eq!(session.weights().len(), session.assets().len());
    }

    #[test]
    fn test_default_session_is_consistent() {
        let s = Session::default();
        assert_eq!(s.assets().len(), DEFAULT_ASSETS.len());
        assert_weights_valid(&s);
        assert_eq!(s.snapshot().aligned_len, DEFAULT_MOCK_MONTHS);
        assert_eq!(s.snapshot().statistics.asset_count(), DEFAULT_ASSETS.len());
        assert!(s.frontier().stale);
        assert!(s.frontier().result.is_none());
    }

    #[test]
    fn test_same_seed_same_snapshot() {
        let a = Session::default();
        let b = Session::default();
        assert_eq!(a.series(), b.series());
        assert_eq!(a.snapshot().metrics, b.snapshot().metrics);
    }

    #[test]
    fn test_weight_edit_updates_metrics_but_not_frontier() {
        let mut s = Session::default();
        s.generate_frontier();
        assert!(!s.frontier().stale);
        let before = s.snapshot().metrics;

        let id = id_at(&s, 2);
        s.set_weight(id, 0.9).unwrap();
        s.recompute();
        assert_weights_valid(&s);
        assert!((s.weights()[2] - 0.9).abs() < 1e-12);
        assert_ne!(s.snapshot().metrics, before);
        assert!(!s.frontier().stale, "weight edits must not stale the frontier");
    }

    #[test]
    fn test_statistics_change_stales_frontier() {
        let mut s = Session::default();
        s.generate_frontier();
        s.set_seed(7, None);
        assert!(s.frontier().stale);
        assert!(s.frontier().result.is_some(), "old result is kept until regenerated");

        s.generate_frontier();
        assert!(!s.frontier().stale);
    }

    #[test]
    fn test_frontier_is_reproducible_per_seed() {
        let mut a = Session::default();
        let mut b = Session::default();
        let fa = a.generate_frontier().clone();
        let fb = b.generate_frontier().clone();
        assert_eq!(fa.frontier, fb.frontier);
        assert_eq!(fa.best_sharpe, fb.best_sharpe);
    }

    #[test]
    fn test_add_and_remove_keep_ids_and_weights_aligned() {
        let mut s = Session::default();
        let first = id_at(&s, 0);
        let added = s.add_asset(" msft ", None).unwrap();
        assert_eq!(s.asset(added).map(|a| a.ticker.as_str()), Some("MSFT"));
        assert_eq!(s.asset(added).map(|a| a.name.as_str()), Some("MSFT"));
        assert_weights_valid(&s);
        assert!(s.frontier().stale);

        s.set_weight(first, 0.5).unwrap();
        let w_added = s.weights()[s.index_of(added).unwrap()];
        s.remove_asset(first).unwrap();
        assert!(s.index_of(first).is_none());
        assert_eq!(s.index_of(added), Some(DEFAULT_ASSETS.len() - 1));
        assert_weights_valid(&s);
        // Remaining weights keep their relative shares.
        let idx = s.index_of(added).unwrap();
        assert!((s.weights()[idx] - w_added / 0.5).abs() < 1e-9);

        let again = s.add_asset("AAPL", Some("Apple")).unwrap();
        assert_ne!(again, first, "ids are never reused");
    }

    #[test]
    fn test_remove_errors() {
        let mut s = Session::new(&[("SPY", "S&P 500")], 1, 24);
        assert!(matches!(s.remove_asset(AssetId(99)), Err(SessionError::UnknownAsset(_))));
        let only = id_at(&s, 0);
        assert!(matches!(s.remove_asset(only), Err(SessionError::LastAsset)));
        assert!(matches!(s.add_asset("   ", None), Err(SessionError::EmptyTicker)));
    }

    #[test]
    fn test_upload_replaces_series_and_aligns() {
        let mut s = Session::default();
        let id = id_at(&s, 1);
        let count = s.upload_csv(id, Some("qqq.csv"), &csv_with_returns(30)).unwrap();
        assert_eq!(count, 30);
        assert_eq!(s.asset(id).unwrap().source(), SeriesSource::Csv);
        assert_eq!(s.asset(id).unwrap().filename(), Some("qqq.csv"));

        s.recompute();
        assert_eq!(s.snapshot().aligned_len, 30);

        s.clear_upload(id).unwrap();
        s.recompute();
        assert_eq!(s.asset(id).unwrap().source(), SeriesSource::Mock);
        assert_eq!(s.snapshot().aligned_len, DEFAULT_MOCK_MONTHS);
    }

    #[test]
    fn test_rejected_upload_leaves_state_untouched() {
        let mut s = Session::default();
        s.generate_frontier();
        let id = id_at(&s, 0);
        let before = s.asset(id).unwrap().series().to_vec();

        let err = s
            .upload_csv(id, Some("bad.csv"), "Date,Open,High,Low,Volume\n2024-01-01,1,2,0,5\n")
            .unwrap_err();
        assert!(err.to_string().starts_with("SPY:"));
        let err = s.upload_csv(id, None, &csv_with_returns(5)).unwrap_err();
        assert!(err.to_string().contains("found 5"));

        assert_eq!(s.asset(id).unwrap().series(), before.as_slice());
        assert_eq!(s.asset(id).unwrap().source(), SeriesSource::Mock);
        assert!(!s.frontier().stale);
    }

    #[test]
    fn test_randomize_and_reset() {
        let mut s = Session::default();
        s.randomize_weights();
        let first = s.weights().to_vec();
        assert_weights_valid(&s);
        s.randomize_weights();
        assert_ne!(s.weights(), first.as_slice());

        let mut t = Session::default();
        t.randomize_weights();
        assert_eq!(t.weights(), first.as_slice(), "randomize is seeded");

        s.reset_weights();
        let n = s.assets().len() as f64;
        assert!(s.weights().iter().all(|&w| (w - 1.0 / n).abs() < 1e-12));
    }

    #[test]
    fn test_view_reports_sources() {
        let mut s = Session::default();
        let id = id_at(&s, 3);
        s.upload_csv(id, Some("tlt.csv"), &csv_with_returns(14)).unwrap();
        let view = s.view();
        assert_eq!(view.assets.len(), DEFAULT_ASSETS.len());
        assert_eq!(view.assets[3].source, SeriesSource::Csv);
        assert_eq!(view.assets[3].points, 14);
        assert_eq!(view.assets[0].points, DEFAULT_MOCK_MONTHS);
    }
}
