use crate::config::{RETURN_CAP, RETURN_FLOOR};
use crate::rng::SeededRng;

// ──────────────────────────────────────────────────────────────────────────────
// Latent Factor Model
// ──────────────────────────────────────────────────────────────────────────────

pub const FACTOR_COUNT: usize = 4;

/// Monthly volatility of each latent factor:
/// broad market, sector/growth, speculative/high-beta, defensive/commodity.
pub const FACTOR_VOLS: [f64; FACTOR_COUNT] = [0.040, 0.030, 0.055, 0.025];

/// Probability that a month is a shared stress month.
pub const TAIL_SHOCK_PROB: f64 = 0.07;
/// Multiplier applied to every factor draw in a stress month.
pub const TAIL_SHOCK_MULT: f64 = 2.2;

/// Per-asset parameters: monthly drift, idiosyncratic vol, factor loadings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssetProfile {
    pub drift: f64,
    pub idio_vol: f64,
    pub loadings: [f64; FACTOR_COUNT],
}

const fn profile(drift: f64, idio_vol: f64, loadings: [f64; FACTOR_COUNT]) -> AssetProfile {
    AssetProfile {
        drift,
        idio_vol,
        loadings,
    }
}

/// Moderate-risk profile for tickers without tuned parameters.
pub const DEFAULT_PROFILE: AssetProfile = profile(0.007, 0.045, [0.9, 0.3, 0.2, 0.0]);

const TUNED_PROFILES: &[(&str, AssetProfile)] = &[
    ("SPY", profile(0.0075, 0.010, [1.00, 0.20, 0.05, 0.00])),
    ("QQQ", profile(0.0095, 0.015, [1.05, 0.75, 0.20, -0.05])),
    ("DIA", profile(0.0065, 0.012, [0.95, 0.05, 0.00, 0.10])),
    ("NVDA", profile(0.0210, 0.070, [1.30, 1.10, 0.90, -0.10])),
    ("MSFT", profile(0.0120, 0.040, [1.00, 0.80, 0.20, 0.00])),
    ("AAPL", profile(0.0115, 0.045, [1.05, 0.70, 0.25, 0.00])),
    ("TSLA", profile(0.0180, 0.110, [1.40, 0.60, 1.30, -0.10])),
    ("ARKK", profile(0.0080, 0.060, [1.30, 0.70, 1.40, -0.15])),
    ("TLT", profile(0.0030, 0.025, [-0.20, 0.00, -0.10, 0.80])),
    ("IAU", profile(0.0050, 0.030, [0.05, -0.10, 0.00, 1.00])),
    ("SLV", profile(0.0045, 0.060, [0.25, -0.05, 0.30, 1.20])),
    ("XLE", profile(0.0060, 0.050, [0.90, -0.40, 0.20, 0.70])),
    ("XLU", profile(0.0055, 0.025, [0.45, -0.30, -0.10, 0.45])),
    ("XLP", profile(0.0055, 0.020, [0.55, -0.20, -0.15, 0.35])),
];

/// Looks up the tuned profile for a ticker (case-insensitive), else the default.
pub fn profile_for(ticker: &str) -> AssetProfile {
    TUNED_PROFILES
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(ticker.trim()))
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Draws `months` periods of the four latent factors, returned as `[t][k]`.
///
/// A stress month scales all four factor draws by the same multiplier.
fn draw_factors(months: usize, rng: &mut SeededRng) -> Vec<[f64; FACTOR_COUNT]> {
    (0..months)
        .map(|_| {
            let mult = if rng.chance(TAIL_SHOCK_PROB) { TAIL_SHOCK_MULT } else { 1.0 };
            let mut f = [0.0; FACTOR_COUNT];
            for (k, slot) in f.iter_mut().enumerate() {
                *slot = rng.normal() * FACTOR_VOLS[k] * mult;
            }
            f
        })
        .collect()
}

/// One month's return: drift plus factor exposure plus scaled idiosyncratic noise, clamped.
fn monthly_return(profile: &AssetProfile, factors: &[f64; FACTOR_COUNT], noise: f64) -> f64 {
    let systematic: f64 = profile
        .loadings
        .iter()
        .zip(factors.iter())
        .map(|(b, x)| b * x)
        .sum();
    let r = profile.drift + systematic + profile.idio_vol * noise;
    r.clamp(RETURN_FLOOR, RETURN_CAP)
}

/// Generates `months` monthly simple returns for each ticker, deterministic in `seed`.
pub fn generate_series<S: AsRef<str>>(
    tickers: &[S],
    months: usize,
    seed: u64,
) -> Vec<Vec<f64>> {
    let mut rng = SeededRng::new(seed);
    let factors = draw_factors(months, &mut rng);

    tickers
        .iter()
        .map(|ticker| {
            let profile = profile_for(ticker.as_ref());
            factors
                .iter()
                .map(|f| monthly_return(&profile, f, rng.normal()))
                .collect()
        })
        .collect()
}
