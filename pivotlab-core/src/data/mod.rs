//! Bar preparation: cleaning and synthetic generation.

pub mod clean;
pub mod synthetic;

pub use clean::{clean_bars, filter_outliers, forward_fill, CleanReport, DEFAULT_OUTLIER_Z};
pub use synthetic::{linear_ramp, random_walk, RAMP_HALF_RANGE};
