//! Bar loop of the SMA-crossover / Bollinger-exit strategy.
//!
//! Per bar t:
//! 1. Open: fill the order pending from bar t-1 at `bars[t].open`.
//! 2. Close: if no order is pending, evaluate the decision rule on the
//!    indicator values at t and submit at most one order.
//! 3. Mark to market at `bars[t].close`.
//!
//! Indicators are precomputed once; the loop only reads index t, so no
//! decision can see bar t+1.

use super::broker::Broker;
use super::config::StrategyConfig;
use super::cost_model::{CostModel, Frictionless};
use super::state::{EquityPoint, RunResult};
use super::trade_extraction::extract_trades;
use crate::domain::{OrderAction, OrderSide, PriceBar, StrategyState};
use crate::error::AnalysisError;
use crate::indicators::{max_lookback, Atr, Bollinger, Indicator, IndicatorValues, Sma};

/// Indicator readings at one bar close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSignals {
    pub close: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub bb_top: f64,
    pub bb_bottom: f64,
}

/// An order the strategy wants submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub side: OrderSide,
    pub action: OrderAction,
}

/// Decision rule. NaN readings never trigger anything.
pub fn decide(state: StrategyState, s: &BarSignals) -> Option<Decision> {
    match state {
        StrategyState::Flat => {
            if s.sma_short > s.sma_long {
                Some(Decision {
                    side: OrderSide::Buy,
                    action: OrderAction::Open,
                })
            } else if s.sma_short < s.sma_long {
                Some(Decision {
                    side: OrderSide::Sell,
                    action: OrderAction::Open,
                })
            } else {
                None
            }
        }
        StrategyState::Long => (s.close < s.bb_bottom).then_some(Decision {
            side: OrderSide::Sell,
            action: OrderAction::Close,
        }),
        StrategyState::Short => (s.close > s.bb_top).then_some(Decision {
            side: OrderSide::Buy,
            action: OrderAction::Close,
        }),
    }
}

struct SeriesNames {
    sma_short: String,
    sma_long: String,
    bb_top: String,
    bb_bottom: String,
}

/// Strategy engine bound to a configuration and a cost model.
#[derive(Debug)]
pub struct StrategyEngine {
    config: StrategyConfig,
    cost_model: Box<dyn CostModel>,
}

impl StrategyEngine {
    pub fn new(config: StrategyConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            cost_model: Box::new(Frictionless),
        })
    }

    pub fn with_cost_model(mut self, cost_model: Box<dyn CostModel>) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost_model.as_ref()
    }

    /// Indicators the strategy reads or tracks.
    pub fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        let c = &self.config;
        vec![
            Box::new(Sma::new(c.sma_short_period)),
            Box::new(Sma::new(c.sma_long_period)),
            Box::new(Bollinger::upper(c.bb_period, c.bb_devfactor).with_stddev_floor(c.bb_stddev_floor)),
            Box::new(Bollinger::middle(c.bb_period, c.bb_devfactor).with_stddev_floor(c.bb_stddev_floor)),
            Box::new(Bollinger::lower(c.bb_period, c.bb_devfactor).with_stddev_floor(c.bb_stddev_floor)),
            Box::new(Atr::new(c.atr_period)),
        ]
    }

    /// Replay `bars` in order and return fills, trades and the equity curve.
    pub fn run(&self, bars: &[PriceBar]) -> Result<RunResult, AnalysisError> {
        let required = self.config.required_history();
        if bars.len() < required {
            return Err(AnalysisError::InsufficientHistory {
                required,
                available: bars.len(),
            });
        }

        let indicators = self.indicators();
        let names = SeriesNames {
            sma_short: indicators[0].name().to_string(),
            sma_long: indicators[1].name().to_string(),
            bb_top: indicators[2].name().to_string(),
            bb_bottom: indicators[4].name().to_string(),
        };
        let values = IndicatorValues::precompute(bars, &indicators);
        let warmup_bars = max_lookback(&indicators);

        let mut broker = Broker::new(self.config.initial_cash, self.cost_model.as_ref());
        let mut fills = Vec::new();
        let mut equity_curve = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            if let Some(fill) = broker.fill_pending(t, bar) {
                tracing::debug!(
                    bar = t,
                    side = ?fill.side,
                    action = ?fill.action,
                    price = fill.price,
                    "order filled"
                );
                fills.push(fill);
            }

            if !broker.has_pending() {
                let signals = read_signals(&values, &names, t, bar.close);
                if let Some(d) = decide(broker.state(), &signals) {
                    broker.submit(d.side, d.action, self.order_quantity(&broker), t, bar.timestamp);
                    tracing::debug!(bar = t, side = ?d.side, action = ?d.action, "order submitted");
                }
            }

            equity_curve.push(EquityPoint {
                bar_index: t,
                timestamp: bar.timestamp,
                cash: broker.cash(),
                position: broker.position(),
                close: bar.close,
                equity: broker.equity(bar.close),
            });
        }

        let unfilled_order = broker.cancel_pending();
        if let Some(order) = &unfilled_order {
            tracing::info!(order_id = order.id, side = ?order.side, "order still pending after last bar; not executed");
        }

        let trades = extract_trades(&fills);
        tracing::info!(
            bars = bars.len(),
            fills = fills.len(),
            trades = trades.len(),
            final_state = ?broker.state(),
            "strategy run complete"
        );

        Ok(RunResult {
            initial_cash: self.config.initial_cash,
            fills,
            trades,
            equity_curve,
            indicators: values,
            final_state: broker.state(),
            final_cash: broker.cash(),
            final_position: broker.position(),
            unfilled_order,
            commission_paid: broker.commission_paid(),
            warmup_bars,
        })
    }

    fn order_quantity(&self, broker: &Broker<'_>) -> f64 {
        if broker.state().is_flat() {
            self.config.stake
        } else {
            broker.position().abs()
        }
    }
}

fn read_signals(values: &IndicatorValues, names: &SeriesNames, t: usize, close: f64) -> BarSignals {
    let get = |name: &str| values.get(name, t).unwrap_or(f64::NAN);
    BarSignals {
        close,
        sma_short: get(&names.sma_short),
        sma_long: get(&names.sma_long),
        bb_top: get(&names.bb_top),
        bb_bottom: get(&names.bb_bottom),
    }
}

/// Run the strategy with `config` and no trading costs.
pub fn run_strategy(bars: &[PriceBar], config: &StrategyConfig) -> Result<RunResult, AnalysisError> {
    StrategyEngine::new(config.clone())?.run(bars)
}
