//! Domain types for PivotLab

pub mod bar;
pub mod interval;
pub mod level;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::PriceBar;
pub use interval::{Interval, ParseIntervalError};
pub use level::{CombinedLevel, Level, LevelKind, ParseLevelKindError, PivotPoint};
pub use order::{Fill, Order, OrderAction, OrderSide};
pub use position::{Direction, StrategyState};
pub use trade::TradeRecord;

/// Timestamp format used for storage and CSV exchange.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
