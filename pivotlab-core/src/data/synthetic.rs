//! Synthetic bar generators for seeding a store and for tests.

use crate::domain::{Interval, PriceBar};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Distance of high/low from open/close in `linear_ramp`.
pub const RAMP_HALF_RANGE: f64 = 0.005;

/// Deterministic ramp: open = close = `base + step·i`, high/low
/// `RAMP_HALF_RANGE` either side, volume `1000 + 10·i`.
pub fn linear_ramp(
    start: NaiveDateTime,
    interval: Interval,
    n: usize,
    base: f64,
    step: f64,
) -> Vec<PriceBar> {
    let spacing = interval.duration();
    (0..n)
        .map(|i| {
            let price = base + step * i as f64;
            PriceBar {
                timestamp: start + spacing * i as i32,
                open: price,
                high: price + RAMP_HALF_RANGE,
                low: price - RAMP_HALF_RANGE,
                close: price,
                volume: 1000.0 + 10.0 * i as f64,
            }
        })
        .collect()
}

/// Seeded random walk starting at 1.2000. The seed is the BLAKE3 hash of
/// `symbol`, so the same symbol always produces the same bars.
pub fn random_walk(symbol: &str, start: NaiveDateTime, n: usize, interval: Interval) -> Vec<PriceBar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);
    let spacing = interval.duration();

    let mut bars = Vec::with_capacity(n);
    let mut price = 1.2_f64;
    for i in 0..n {
        let bar_return: f64 = rng.gen_range(-0.005..0.005);
        let open = price;
        let close = price * (1.0 + bar_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0001..0.002));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0001..0.002));
        let volume = rng.gen_range(500..5_000u32) as f64;

        bars.push(PriceBar {
            timestamp: start + spacing * i as i32,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}
