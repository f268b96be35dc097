//! Pairs backtest with the Kalman hedge ratio filter

use kalman_pairs::signal::Side;
use kalman_pairs::*;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    println!("=== Pairs Backtest ===\n");

    let pairs: Vec<PricePair> = load_sample_data()?;
    println!("Loaded {} aligned bars\n", pairs.len());

    let config = FilterConfig::default();
    let mut filter: HedgeRatioFilter = HedgeRatioFilter::new(config)?;
    let mut signal: SpreadSignal = SpreadSignal::new(SignalConfig::default())?;

    println!("Configuration:");
    println!("  delta:          {}", config.delta);
    println!("  v:              {}", config.observation_noise_variance);
    println!("  quantity scale: {}\n", config.quantity_scale);

    let start_time: Instant = Instant::now();
    let mut cash: f64 = 0.0;
    let mut units_a: f64 = 0.0;
    let mut units_b: f64 = 0.0;
    let mut trade_count: usize = 0;

    for pair in &pairs {
        let out: FilterOutput = filter.update(pair.price_a, pair.price_b)?;

        if let Some(trade) = signal.evaluate(&out) {
            trade_count += 1;
            let signed = |side: Side, qty: f64| match side {
                Side::Buy => qty,
                Side::Sell => -qty,
            };
            let da = signed(trade.leg_a.side, trade.leg_a.quantity);
            let db = signed(trade.leg_b.side, trade.leg_b.quantity);
            units_a += da;
            units_b += db;
            cash -= da * pair.price_a + db * pair.price_b;

            if trade_count <= 6 {
                println!(
                    "{}  {:?} z={:>6.2}  A {:?} {:.0}  B {:?} {:.0}",
                    pair.date,
                    trade.action,
                    trade.z_score,
                    trade.leg_a.side,
                    trade.leg_a.quantity,
                    trade.leg_b.side,
                    trade.leg_b.quantity
                );
            }
        }
    }

    let elapsed: Duration = start_time.elapsed();

    let last = pairs.last().copied();
    let equity = match last {
        Some(p) => cash + units_a * p.price_a + units_b * p.price_b,
        None => cash,
    };

    println!("\n{}", "═".repeat(60));
    println!("BACKTEST RESULTS");
    println!("{}", "═".repeat(60));
    println!("  Bars:             {}", pairs.len());
    println!("  Trades:           {}", trade_count);
    println!("  Final equity:     {:.2}", equity);
    println!("  Hedge ratio:      {:.4}", filter.hedge_ratio());
    println!("  Intercept:        {:.4}", filter.intercept());
    println!(
        "  Time per update:  {:.0} ns",
        elapsed.as_nanos() as f64 / pairs.len().max(1) as f64
    );

    // Persist and restore the filter state
    let bytes: Vec<u8> = filter.snapshot().to_bytes()?;
    let restored = HedgeRatioFilter::from_snapshot(&FilterSnapshot::from_bytes(&bytes)?)?;
    println!(
        "\nSnapshot: {} bytes, restored hedge ratio {:.4}",
        bytes.len(),
        restored.hedge_ratio()
    );

    Ok(())
}

/// Load `data/pairs.csv` or fall back to synthetic series
fn load_sample_data() -> Result<Vec<PricePair>> {
    match load_pair_csv("data/pairs.csv") {
        Ok(pairs) => Ok(pairs),
        Err(_) => {
            println!("  Sample data file not found, generating synthetic data...");
            Ok(generate_synthetic_data(2_000))
        }
    }
}

/// Two separately sampled series; B skips every seventh bar so the
/// alignment step has something to drop
fn generate_synthetic_data(count: usize) -> Vec<PricePair> {
    let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let mut series_a: Vec<PriceBar> = Vec::with_capacity(count);
    let mut series_b: Vec<PriceBar> = Vec::with_capacity(count);

    let mut price_a: f64 = 45.0;
    let mut ratio: f64 = 1.1;

    for i in 0..count {
        let date = start + chrono::Days::new(i as u64);

        price_a += ((i * 7919) % 21) as f64 * 0.05 - 0.5;
        price_a = price_a.max(5.0);
        ratio += if (i / 400) % 2 == 0 { 0.0002 } else { -0.0002 };
        let spread = ((i as f64) * 0.3).sin() * 0.8;

        series_a.push(PriceBar::new(date, price_a));
        if i % 7 != 3 {
            series_b.push(PriceBar::new(date, ratio * price_a + 3.0 + spread));
        }
    }

    align_series(&series_a, &series_b)
}
