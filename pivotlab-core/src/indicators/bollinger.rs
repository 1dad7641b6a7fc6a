//! Bollinger Bands: moving average +/- a multiple of the rolling stddev.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + devfactor * max(stddev, floor)
//! - Lower: middle - devfactor * max(stddev, floor)
//!
//! Population stddev (divide by N). A window whose stddev is below the floor
//! uses the floor instead, so the outer bands never collapse onto the middle.
//! A flat window does not always yield an exact 0.0: summation rounding can leave a
//! residue around 1e-16, which the floor absorbs as well.
//! Lookback: period - 1.

use super::stats::{mean, population_std};
use super::Indicator;
use crate::domain::PriceBar;

/// Smallest stddev the outer bands are built from.
pub const DEFAULT_STDDEV_FLOOR: f64 = 1e-5;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    devfactor: f64,
    stddev_floor: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    fn with_band(period: usize, devfactor: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            devfactor,
            stddev_floor: DEFAULT_STDDEV_FLOOR,
            band,
            name: format!("bollinger_{label}_{period}_{devfactor}"),
        }
    }

    pub fn upper(period: usize, devfactor: f64) -> Self {
        Self::with_band(period, devfactor, BollingerBand::Upper)
    }

    pub fn middle(period: usize, devfactor: f64) -> Self {
        Self::with_band(period, devfactor, BollingerBand::Middle)
    }

    pub fn lower(period: usize, devfactor: f64) -> Self {
        Self::with_band(period, devfactor, BollingerBand::Lower)
    }

    /// Override the stddev floor (must be positive).
    pub fn with_stddev_floor(mut self, floor: f64) -> Self {
        assert!(floor > 0.0, "stddev floor must be > 0");
        self.stddev_floor = floor;
        self
    }

    pub fn band(&self) -> BollingerBand {
        self.band
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        for i in (self.period - 1)..n {
            let window = &closes[i + 1 - self.period..=i];
            if window.iter().any(|c| c.is_nan()) {
                continue;
            }
            let mid = mean(window);
            let width = || self.devfactor * population_std(window).max(self.stddev_floor);
            result[i] = match self.band {
                BollingerBand::Middle => mid,
                BollingerBand::Upper => mid + width(),
                BollingerBand::Lower => mid - width(),
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Bollinger::middle(3, 2.0).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let upper = Bollinger::upper(3, 2.1).compute(&bars);
        let middle = Bollinger::middle(3, 2.1).compute(&bars);
        let lower = Bollinger::lower(3, 2.1).compute(&bars);

        for i in 2..5 {
            assert_approx(middle[i] - lower[i], upper[i] - middle[i], DEFAULT_EPSILON);
        }
        // stddev of [10,11,12] = sqrt(2/3)
        assert_approx(upper[2], 11.0 + 2.1 * (2.0f64 / 3.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn constant_price_bands_never_collapse() {
        let bars = make_bars(&[1.2; 6]);
        let upper = Bollinger::upper(3, 2.1).compute(&bars);
        let middle = Bollinger::middle(3, 2.1).compute(&bars);
        let lower = Bollinger::lower(3, 2.1).compute(&bars);

        for i in 2..6 {
            assert!(upper[i] > middle[i], "upper collapsed at {i}");
            assert!(lower[i] < middle[i], "lower collapsed at {i}");
            assert_approx(upper[i] - middle[i], 2.1 * DEFAULT_STDDEV_FLOOR, 1e-12);
        }
    }

    #[test]
    fn flat_window_rounding_residue_uses_floor() {
        // 50 closes of 1.1: the mean differs from 1.1 in the last bit.
        let bars = make_bars(&[1.1; 50]);
        let window: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert!(population_std(&window) > 0.0);
        assert!(population_std(&window) < 1e-12);

        let upper = Bollinger::upper(50, 2.1).compute(&bars);
        let middle = Bollinger::middle(50, 2.1).compute(&bars);
        assert_approx(upper[49] - middle[49], 2.1 * DEFAULT_STDDEV_FLOOR, 1e-12);
    }

    #[test]
    fn custom_floor() {
        let bars = make_bars(&[5.0; 4]);
        let upper = Bollinger::upper(2, 1.0).with_stddev_floor(0.5).compute(&bars);
        assert_approx(upper[3], 5.5, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_propagation() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].close = f64::NAN;
        let result = Bollinger::upper(3, 2.0).compute(&bars);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn bollinger_lookback() {
        assert_eq!(Bollinger::upper(50, 2.1).lookback(), 49);
    }

    #[test]
    fn names_distinguish_bands() {
        assert_eq!(Bollinger::lower(50, 2.1).name(), "bollinger_lower_50_2.1");
        assert_ne!(Bollinger::upper(50, 2.1).name(), Bollinger::middle(50, 2.1).name());
    }
}
