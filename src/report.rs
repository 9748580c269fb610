use crate::config::{MONTHS_PER_YEAR, RISK_FREE_RATE};
use crate::session::Session;
use crate::stats;

/// Pretty-prints the session's current portfolio (and frontier, if generated) to stdout.
pub fn print_report(session: &Session) {
    let snapshot = session.snapshot();
    let s = &snapshot.statistics;
    let m = &snapshot.metrics;

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║                Portfolio Lab: Current Mix                  ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!(
        "║  Expected Annual Return : {:>+7.2}%                          ║",
        m.annual_return * 100.0
    );
    println!(
        "║  Annual Volatility      : {:>7.2}%                          ║",
        m.annual_vol * 100.0
    );
    println!(
        "║  Sharpe Ratio           : {:>7.2}   (rf {:.1}%)             ║",
        m.sharpe,
        RISK_FREE_RATE * 100.0
    );
    println!("║  Aligned Months         : {:>7}                           ║", snapshot.aligned_len);
    println!(
        "║  Seed / Mock Months     : {:>7} / {:<4}                    ║",
        session.seed(),
        session.months()
    );
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Asset   Weight   Ann.Ret   Ann.Vol  Source  Points        ║");
    println!("╠════════════════════════════════════════════════════════════╣");

    for (i, (slot, w)) in session.assets().iter().zip(session.weights()).enumerate() {
        let ann_ret = s.means.get(i).copied().unwrap_or(0.0) * MONTHS_PER_YEAR;
        let ann_vol = s
            .covariance
            .get(i)
            .and_then(|row| row.get(i))
            .map(|v| (v.max(0.0) * MONTHS_PER_YEAR).sqrt())
            .unwrap_or(0.0);
        println!(
            "║  {:<6} {:>6.2}%  {:>+7.2}%  {:>6.2}%   {:<5} {:>6}        ║",
            slot.ticker,
            w * 100.0,
            ann_ret * 100.0,
            ann_vol * 100.0,
            slot.source().as_str(),
            slot.series().len()
        );
    }

    let pairs = stats::top_correlated_pairs(&s.correlation, 3);
    if !pairs.is_empty() {
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Most Correlated Pairs                                     ║");
        for p in pairs {
            let a = &session.assets()[p.first].ticker;
            let b = &session.assets()[p.second].ticker;
            println!(
                "║    {:<6} / {:<6}  {:>+6.2}                               ║",
                a,
                b,
                p.correlation
            );
        }
    }

    if let Some(result) = &session.frontier().result {
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║  Sampled Frontier ({} portfolios, {} envelope points)    ║",
            result.cloud.len(),
            result.frontier.len()
        );
        println!("║      Risk    Return   Sharpe                               ║");
        for p in &result.frontier {
            println!(
                "║    {:>6.2}%  {:>+7.2}%  {:>6.2}                               ║",
                p.risk * 100.0,
                p.ret * 100.0,
                p.sharpe
            );
        }
        if let Some(best) = &result.best_sharpe {
            println!("╠════════════════════════════════════════════════════════════╣");
            println!(
                "║  Best Sharpe {:.2}: return {:+.2}%, risk {:.2}%              ║",
                best.sharpe,
                best.ret * 100.0,
                best.risk * 100.0
            );
            for (slot, w) in session.assets().iter().zip(best.weights.iter()) {
                println!(
                    "║    {:<6} {:>6.2}%                                         ║",
                    slot.ticker,
                    w * 100.0
                );
            }
        }
    }

    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("⚠  Synthetic data is for demonstration only. Not financial advice.");
}
