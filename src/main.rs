//! Kalman pairs binary
//!
//! Usage: `kalman-pairs [prices.csv] [filter.json]`
//!
//! Without a CSV file a synthetic cointegrated pair is generated.

use anyhow::Context;
use kalman_pairs::*;
use log::info;

const PAIR_ID: &str = "A/B";

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config: FilterConfig = match args.get(1) {
        Some(path) => FilterConfig::from_json_file(path)
            .with_context(|| format!("loading filter config from {}", path))?,
        None => FilterConfig::default(),
    };

    let pairs: Vec<PricePair> = match args.first() {
        Some(path) => load_pair_csv(path).with_context(|| format!("loading prices from {}", path))?,
        None => synthetic_pairs(500),
    };
    info!("Loaded {} aligned bars", pairs.len());

    println!("Kalman Pairs v{}\n", env!("CARGO_PKG_VERSION"));
    println!(
        "  delta={}  v={}  qty={}\n",
        config.delta, config.observation_noise_variance, config.quantity_scale
    );

    let book: PairBook = PairBook::new(config)?;
    book.register(PAIR_ID)?;
    let mut signal: SpreadSignal = SpreadSignal::new(SignalConfig::default())?;

    for pair in &pairs {
        let out: FilterOutput = match book.update(PAIR_ID, pair.price_a, pair.price_b) {
            Ok(out) => out,
            Err(e @ Error::InvalidInput(_)) => {
                log::warn!("{}: skipped ({})", pair.date, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(trade) = signal.evaluate(&out) {
            println!(
                "{}  {:?}  A: {:?} {:.0}  B: {:?} {:.0}  ({})",
                pair.date,
                trade.action,
                trade.leg_a.side,
                trade.leg_a.quantity,
                trade.leg_b.side,
                trade.leg_b.quantity,
                trade.reason
            );
        }
    }

    let filter: HedgeRatioFilter = book.filter_state(PAIR_ID)?;
    println!("\n{}", "═".repeat(50));
    println!("Final hedge ratio: {:.4}", filter.hedge_ratio());
    println!("Final intercept:   {:.4}", filter.intercept());
    println!("Hedge quantity:    {:.0}", filter.hedge_quantity());
    println!("Open position:     {:?}", signal.position());
    println!("\n{}", book.metrics().summary());

    Ok(())
}

/// `B = 1.5 * A + 2 + wobble`, daily bars from 2024-01-01
fn synthetic_pairs(n: usize) -> Vec<PricePair> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    (0..n)
        .map(|i| {
            let t = i as f64;
            let a = 40.0 + (t * 0.05).sin() * 6.0 + t * 0.01;
            let wobble = (t * 0.7).sin() * 0.4 + (t * 0.13).cos() * 0.3;
            PricePair::new(start + chrono::Days::new(i as u64), a, 1.5 * a + 2.0 + wobble)
        })
        .collect()
}
