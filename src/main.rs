mod align;
mod commentary;
mod config;
mod data;
mod frontier;
mod portfolio;
mod report;
mod rng;
mod session;
mod stats;
mod synthetic;
mod weights;
mod webui;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use session::Session;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Portfolio Lab: long-only portfolio analytics with a sampled efficient frontier",
    after_help = "EXAMPLES:
    # Print metrics for the default portfolio
    cargo run --release

    # Custom tickers, a different seed, and the sampled frontier
    cargo run --release -- --tickers SPY,TLT,IAU,NVDA --seed 7 --frontier

    # Replace one asset's synthetic history with an uploaded CSV
    cargo run --release -- --csv SPY=data/spy_monthly.csv

    # Launch the web dashboard
    cargo run --release -- --webui --port 8080"
)]
struct Args {
    /// Launch the web dashboard
    #[arg(long)]
    webui: bool,

    /// WebUI server port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Seed for synthetic series and frontier sampling
    #[arg(long, default_value_t = config::DEFAULT_SEED)]
    seed: u64,

    /// Length of each synthetic monthly series
    #[arg(long, default_value_t = config::DEFAULT_MOCK_MONTHS)]
    months: usize,

    /// Comma-separated tickers (e.g., SPY,QQQ,TLT). Defaults to a five-asset demo portfolio.
    #[arg(long)]
    tickers: Option<String>,

    /// Print the sampled efficient frontier in report mode
    #[arg(long)]
    frontier: bool,

    /// Load a Date/Close CSV for one asset, as TICKER=PATH. Repeatable.
    #[arg(long = "csv", value_name = "TICKER=PATH")]
    csv: Vec<String>,
}

fn build_session(args: &Args) -> Result<Session> {
    if args.months < 2 {
        return Err(anyhow!("--months must be at least 2"));
    }

    let Some(ref tickers_str) = args.tickers else {
        return Ok(Session::new(config::DEFAULT_ASSETS, args.seed, args.months));
    };
    let mut tickers: Vec<String> = tickers_str
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    let mut seen = std::collections::HashSet::new();
    tickers.retain(|t| seen.insert(t.clone()));
    if tickers.is_empty() {
        return Err(anyhow!("--tickers needs at least one symbol, e.g. --tickers SPY,TLT"));
    }

    let assets: Vec<(&str, &str)> = tickers
        .iter()
        .map(|t| {
            let name = config::DEFAULT_ASSETS
                .iter()
                .find(|(ticker, _)| *ticker == t.as_str())
                .map(|(_, name)| *name)
                .unwrap_or(t.as_str());
            (t.as_str(), name)
        })
        .collect();
    Ok(Session::new(&assets, args.seed, args.months))
}

fn load_csv_uploads(session: &mut Session, args: &[String]) -> Result<()> {
    for arg in args {
        let (ticker, path) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --csv value '{}', expected TICKER=PATH", arg))?;
        let ticker = ticker.trim().to_uppercase();
        let Some(id) = session
            .assets()
            .iter()
            .find(|a| a.ticker == ticker)
            .map(|a| a.id)
        else {
            warn!("--csv {}: ticker is not in the portfolio, skipping", ticker);
            continue;
        };

        let path = std::path::Path::new(path.trim());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path.file_name().and_then(|f| f.to_str());
        match session.upload_csv(id, filename, &text) {
            Ok(_) => {
                if let Some(slot) = session.asset(id) {
                    info!("{} series source: {}", slot.ticker, slot.source().as_str());
                }
            }
            Err(e) => error!("Upload rejected for {}: {}", path.display(), e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portfolio_lab=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    config::init_env();
    let args = Args::parse();

    let mut session = build_session(&args)?;
    load_csv_uploads(&mut session, &args.csv)?;
    session.recompute();

    if args.webui {
        let llm = config::LlmSettings::from_env();
        match webui::run_webui_server(args.port, session, llm).await {
            Ok(_) => info!("WebUI exited."),
            Err(e) => error!("WebUI failed: {}", e),
        }
        return Ok(());
    }

    if args.frontier {
        session.generate_frontier();
    }
    report::print_report(&session);
    Ok(())
}
