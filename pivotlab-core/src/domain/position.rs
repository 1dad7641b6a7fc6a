use serde::{Deserialize, Serialize};

/// Position state of the strategy engine.
///
/// Transitions only happen when a fill is applied at a bar open; decisions
/// are taken at bar close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StrategyState {
    #[default]
    Flat,
    Long,
    Short,
}

impl StrategyState {
    /// State implied by a signed position size.
    pub fn from_position(position: f64) -> Self {
        if position > 0.0 {
            StrategyState::Long
        } else if position < 0.0 {
            StrategyState::Short
        } else {
            StrategyState::Flat
        }
    }

    pub fn is_flat(&self) -> bool {
        *self == StrategyState::Flat
    }
}

/// Direction of a round-trip trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}
