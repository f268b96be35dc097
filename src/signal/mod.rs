//! Spread trading signal built on filter output
//!
//! The forecast error is the spread `B - (hedge_ratio * A + intercept)`.
//! A spread far below its predictive band is bought (long B, short A), a
//! spread far above it is sold. Positions are closed once the spread
//! crosses back inside `exit_z` standard deviations.
//!
//! Leg B trades a fixed `base_quantity`; leg A trades the filter's
//! `hedge_quantity`, which is `floor(quantity_scale * beta)` units of A per
//! `quantity_scale` units of B. Keep `base_quantity == quantity_scale` for
//! a notional-neutral entry.
//!
//! ```text
//! et < -entry_z * sqrt(Qt)  →  enter long spread
//! et > +entry_z * sqrt(Qt)  →  enter short spread
//! long  and et > -exit_z * sqrt(Qt)  →  exit
//! short and et < +exit_z * sqrt(Qt)  →  exit
//! ```

use crate::kalman::FilterOutput;
use log::info;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Currently held spread position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadPosition {
    Flat,
    /// Long B, short A
    LongSpread,
    /// Short B, long A
    ShortSpread,
}

/// What a trade does to the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    EnterLong,
    EnterShort,
    Exit,
}

/// One leg of a pair trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegOrder {
    pub side: Side,

    /// Units, always non-negative
    pub quantity: f64,
}

impl LegOrder {
    /// Signed quantities flip the side
    fn signed(side: Side, quantity: f64) -> Self {
        if quantity < 0.0 {
            Self {
                side: side.opposite(),
                quantity: -quantity,
            }
        } else {
            Self { side, quantity }
        }
    }

    fn closing(&self) -> Self {
        Self {
            side: self.side.opposite(),
            quantity: self.quantity,
        }
    }
}

/// Two offsetting orders produced by the signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    pub action: TradeAction,
    pub leg_a: LegOrder,
    pub leg_b: LegOrder,

    /// et / sqrt(Qt) at decision time
    pub z_score: f64,

    /// Two-sided normal probability mass inside |z|
    pub confidence: f64,

    pub reason: String,
}

/// Signal thresholds and leg-B size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Entry band in forecast standard deviations
    pub entry_z: f64,

    /// Exit band in forecast standard deviations (0 <= exit_z <= entry_z)
    pub exit_z: f64,

    /// Fixed unit count for leg B
    pub base_quantity: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            entry_z: 1.0,
            exit_z: 1.0,
            base_quantity: 2000.0,
        }
    }
}

impl SignalConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.entry_z > 0.0 && self.entry_z.is_finite()) {
            return Err(crate::Error::Config(
                "Entry threshold must be positive".to_string(),
            ));
        }

        if !(self.exit_z >= 0.0 && self.exit_z <= self.entry_z) {
            return Err(crate::Error::Config(
                "Exit threshold must be in [0, entry_z]".to_string(),
            ));
        }

        if !(self.base_quantity > 0.0 && self.base_quantity.is_finite()) {
            return Err(crate::Error::Config(
                "Base quantity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Stateful entry/exit decisions over a stream of filter outputs
#[derive(Debug, Clone)]
pub struct SpreadSignal {
    config: SignalConfig,
    position: SpreadPosition,

    /// Legs of the open position, reversed on exit
    open_legs: Option<(LegOrder, LegOrder)>,

    standard_normal: Normal,
}

impl SpreadSignal {
    pub fn new(config: SignalConfig) -> crate::Result<Self> {
        config.validate()?;
        let standard_normal =
            Normal::new(0.0, 1.0).map_err(|e| crate::Error::Config(e.to_string()))?;

        Ok(Self {
            config,
            position: SpreadPosition::Flat,
            open_legs: None,
            standard_normal,
        })
    }

    pub fn position(&self) -> SpreadPosition {
        self.position
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Decide on a trade for this bar, updating the held position
    pub fn evaluate(&mut self, output: &FilterOutput) -> Option<PairTrade> {
        let et = output.forecast_error;
        let band = output.forecast_std_dev;
        let z_score = output.z_score();

        let action = match self.position {
            SpreadPosition::Flat if et < -self.config.entry_z * band => TradeAction::EnterLong,
            SpreadPosition::Flat if et > self.config.entry_z * band => TradeAction::EnterShort,
            SpreadPosition::LongSpread if et > -self.config.exit_z * band => TradeAction::Exit,
            SpreadPosition::ShortSpread if et < self.config.exit_z * band => TradeAction::Exit,
            _ => return None,
        };

        let (leg_a, leg_b, reason) = match action {
            TradeAction::EnterLong => {
                let legs = (
                    LegOrder::signed(Side::Sell, output.hedge_quantity),
                    LegOrder::signed(Side::Buy, self.config.base_quantity),
                );
                self.position = SpreadPosition::LongSpread;
                self.open_legs = Some(legs);
                (legs.0, legs.1, format!("Spread below band (z={:.2})", z_score))
            }
            TradeAction::EnterShort => {
                let legs = (
                    LegOrder::signed(Side::Buy, output.hedge_quantity),
                    LegOrder::signed(Side::Sell, self.config.base_quantity),
                );
                self.position = SpreadPosition::ShortSpread;
                self.open_legs = Some(legs);
                (legs.0, legs.1, format!("Spread above band (z={:.2})", z_score))
            }
            TradeAction::Exit => {
                let (a, b) = self.open_legs.take()?;
                self.position = SpreadPosition::Flat;
                (
                    a.closing(),
                    b.closing(),
                    format!("Spread reverted (z={:.2})", z_score),
                )
            }
        };

        info!("{:?}: {}", action, reason);

        Some(PairTrade {
            action,
            leg_a,
            leg_b,
            z_score,
            confidence: self.confidence(z_score),
            reason,
        })
    }

    /// Drop any open position without trading
    pub fn reset(&mut self) {
        self.position = SpreadPosition::Flat;
        self.open_legs = None;
    }

    fn confidence(&self, z_score: f64) -> f64 {
        2.0 * self.standard_normal.cdf(z_score.abs()) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kalman::{FilterConfig, HedgeRatioFilter};

    fn output(et: f64, std: f64, qty: f64) -> FilterOutput {
        FilterOutput {
            forecast_error: et,
            forecast_std_dev: std,
            hedge_quantity: qty,
        }
    }

    fn signed_notional(leg: &LegOrder, price: f64) -> f64 {
        match leg.side {
            Side::Buy => leg.quantity * price,
            Side::Sell => -leg.quantity * price,
        }
    }

    #[test]
    fn test_no_trade_inside_band() {
        let mut signal = SpreadSignal::new(SignalConfig::default()).unwrap();

        assert!(signal.evaluate(&output(0.5, 1.0, 1500.0)).is_none());
        assert_eq!(signal.position(), SpreadPosition::Flat);
    }

    #[test]
    fn test_long_entry_and_exit() {
        let config = SignalConfig {
            exit_z: 0.0,
            ..Default::default()
        };
        let mut signal = SpreadSignal::new(config).unwrap();

        let entry = signal.evaluate(&output(-2.0, 1.0, 1500.0)).unwrap();
        assert_eq!(entry.action, TradeAction::EnterLong);
        assert_eq!(entry.leg_a, LegOrder { side: Side::Sell, quantity: 1500.0 });
        assert_eq!(entry.leg_b, LegOrder { side: Side::Buy, quantity: 2000.0 });
        assert_eq!(signal.position(), SpreadPosition::LongSpread);

        // Still below -exit band: hold
        assert!(signal.evaluate(&output(-0.5, 1.0, 1600.0)).is_none());

        let exit = signal.evaluate(&output(0.1, 1.0, 1600.0)).unwrap();
        assert_eq!(exit.action, TradeAction::Exit);
        // Closes what was opened, not the current sizing
        assert_eq!(exit.leg_a, LegOrder { side: Side::Buy, quantity: 1500.0 });
        assert_eq!(exit.leg_b, LegOrder { side: Side::Sell, quantity: 2000.0 });
        assert_eq!(signal.position(), SpreadPosition::Flat);
    }

    #[test]
    fn test_short_entry() {
        let mut signal = SpreadSignal::new(SignalConfig::default()).unwrap();

        let entry = signal.evaluate(&output(3.0, 1.0, 800.0)).unwrap();
        assert_eq!(entry.action, TradeAction::EnterShort);
        assert_eq!(entry.leg_a, LegOrder { side: Side::Buy, quantity: 800.0 });
        assert_eq!(entry.leg_b, LegOrder { side: Side::Sell, quantity: 2000.0 });
        assert_eq!(entry.z_score, 3.0);
        assert!((entry.confidence - 0.9973).abs() < 1e-3);
    }

    #[test]
    fn test_exit_band_equal_to_entry_band() {
        let config = SignalConfig {
            entry_z: 1.0,
            exit_z: 1.0,
            ..Default::default()
        };
        let mut signal = SpreadSignal::new(config).unwrap();

        assert_eq!(
            signal.evaluate(&output(-2.0, 1.0, 1500.0)).unwrap().action,
            TradeAction::EnterLong
        );
        assert!(signal.evaluate(&output(-1.5, 1.0, 1500.0)).is_none());
        // Back above -sqrt(Qt)
        assert_eq!(
            signal.evaluate(&output(-0.5, 1.0, 1500.0)).unwrap().action,
            TradeAction::Exit
        );

        assert_eq!(
            signal.evaluate(&output(1.5, 1.0, 1500.0)).unwrap().action,
            TradeAction::EnterShort
        );
        assert!(signal.evaluate(&output(1.2, 1.0, 1500.0)).is_none());
        assert_eq!(
            signal.evaluate(&output(0.8, 1.0, 1500.0)).unwrap().action,
            TradeAction::Exit
        );
        assert_eq!(signal.position(), SpreadPosition::Flat);
    }

    #[test]
    fn test_entry_is_notional_neutral() {
        let filter_config = FilterConfig::default();
        let mut filter = HedgeRatioFilter::new(filter_config).unwrap();
        for i in 0..3000 {
            let a = 100.0 + (i as f64 * 0.07).sin() * 25.0;
            let b = 1.5 * a + (((i * 31) % 17) as f64 / 8.0 - 1.0) * 0.02;
            filter.update(a, b).unwrap();
        }

        let mut signal = SpreadSignal::new(SignalConfig {
            base_quantity: filter_config.quantity_scale,
            ..Default::default()
        })
        .unwrap();

        // B five below the fitted 150
        let (price_a, price_b) = (100.0, 145.0);
        let out = filter.update(price_a, price_b).unwrap();
        let entry = signal.evaluate(&out).unwrap();
        assert_eq!(entry.action, TradeAction::EnterLong);
        assert_eq!(entry.leg_a.side, Side::Sell);
        assert_eq!(entry.leg_b.side, Side::Buy);

        let notional_a = signed_notional(&entry.leg_a, price_a);
        let notional_b = signed_notional(&entry.leg_b, price_b);
        assert!(
            (notional_a + notional_b).abs() < 0.05 * notional_b.abs(),
            "net {} against leg B {}",
            notional_a + notional_b,
            notional_b
        );
    }

    #[test]
    fn test_negative_hedge_quantity_flips_side() {
        let mut signal = SpreadSignal::new(SignalConfig::default()).unwrap();

        let entry = signal.evaluate(&output(-2.0, 1.0, -300.0)).unwrap();
        assert_eq!(entry.leg_a, LegOrder { side: Side::Buy, quantity: 300.0 });
        assert_eq!(entry.leg_b, LegOrder { side: Side::Buy, quantity: 2000.0 });
    }

    #[test]
    fn test_invalid_config() {
        let bad_entry = SignalConfig {
            entry_z: 0.0,
            ..Default::default()
        };
        assert!(SpreadSignal::new(bad_entry).is_err());

        let bad_exit = SignalConfig {
            exit_z: 1.5,
            ..Default::default()
        };
        assert!(SpreadSignal::new(bad_exit).is_err());

        let negative_exit = SignalConfig {
            exit_z: -0.1,
            ..Default::default()
        };
        assert!(SpreadSignal::new(negative_exit).is_err());
    }
}
