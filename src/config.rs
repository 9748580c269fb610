use std::sync::OnceLock;
use tracing::{info, warn};

static DOTENV_INIT: OnceLock<()> = OnceLock::new();

/// Loads `.env` from the working directory once. A missing file is not an error.
pub fn init_env() {
    DOTENV_INIT.get_or_init(|| match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment overrides from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    });
}

// ── Finance constants ───────────────────────────────────────────────────────
/// Annual risk-free rate used in every Sharpe calculation.
pub const RISK_FREE_RATE: f64 = 0.035;
/// Monthly statistics are annualized by this factor (mean and covariance alike).
pub const MONTHS_PER_YEAR: f64 = 12.0;
/// Random long-only portfolios drawn per frontier run.
pub const FRONTIER_POINTS: usize = 2600;
/// Equal-width risk buckets used to extract the sampled upper envelope.
pub const FRONTIER_BUCKETS: usize = 40;
/// Below this, a weight sum counts as zero during renormalization.
pub const WEIGHT_EPSILON: f64 = 1e-12;

// ── Data constants ──────────────────────────────────────────────────────────
pub const DEFAULT_SEED: u64 = 42;
/// Length of each generated monthly series (10 years).
pub const DEFAULT_MOCK_MONTHS: usize = 120;
/// Uploaded histories shorter than this many monthly returns are rejected.
pub const MIN_UPLOAD_RETURNS: usize = 12;
/// Generated monthly returns are clamped into this range.
pub const RETURN_FLOOR: f64 = -0.35;
pub const RETURN_CAP: f64 = 0.45;

/// Starting portfolio: (ticker, display name).
pub const DEFAULT_ASSETS: &[(&str, &str)] = &[
    ("SPY", "S&P 500 ETF"),
    ("QQQ", "Nasdaq-100 ETF"),
    ("NVDA", "NVIDIA"),
    ("TLT", "20+ Year Treasury ETF"),
    ("IAU", "Gold Trust"),
];

// ── Commentary provider ─────────────────────────────────────────────────────
pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Settings for the external commentary provider, read from the environment.
#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: env_non_empty("PORTFOLIO_LAB_LLM_API_KEY"),
            url: env_non_empty("PORTFOLIO_LAB_LLM_URL")
                .unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            model: env_non_empty("PORTFOLIO_LAB_LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
