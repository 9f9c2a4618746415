//! Column-wise technical indicators over full price series.
//!
//! Every function returns a series of the same length as its input with `NaN`
//! for positions that are not yet defined (warm-up).
//!
//! Simple windows (SMA, rolling max/min, Bollinger bands, OBV) stream through
//! `ta`. The smoothed kernels follow the conventions of the indicator library
//! the deployed models were trained against, which `ta` does not share:
//! - Wilder smoothing (`rma`) is an adjusted EWM with `alpha = 1 / length`
//! - `ema` is seeded with the simple mean of its first `length` values
//! - Zero high-low ranges are nudged by machine epsilon

use statrs::statistics::Statistics;
use ta::indicators::{
    BollingerBands, BollingerBandsOutput, Maximum, Minimum, OnBalanceVolume, SimpleMovingAverage,
};
use ta::{Close, Next, Reset, Volume};

/// Shift a series forward by `periods`, padding the front with `NaN`.
pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if periods < n {
        out[periods..].copy_from_slice(&values[..n - periods]);
    }
    out
}

/// `x[t] / x[t - periods] - 1`
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < periods {
                f64::NAN
            } else {
                values[i] / values[i - periods] - 1.0
            }
        })
        .collect()
}

/// `ln(x[t] / x[t - 1])`
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                (values[i] / values[i - 1]).ln()
            }
        })
        .collect()
}

/// Apply `f` to every full window; windows containing `NaN` yield `NaN`.
fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                f(slice)
            }
        })
        .collect()
}

/// Stream `values` through a `ta` indicator.
///
/// Output is `NaN` until `length` consecutive defined inputs have been seen.
/// A `NaN` input resets the indicator, so no window ever spans a gap.
fn streamed<I, O>(
    values: &[f64],
    length: usize,
    mut indicator: I,
    project: impl Fn(O) -> f64,
) -> Vec<f64>
where
    I: Next<f64, Output = O> + Reset,
{
    let mut run = 0usize;
    values
        .iter()
        .map(|&x| {
            if x.is_nan() {
                indicator.reset();
                run = 0;
                return f64::NAN;
            }
            run += 1;
            let value = project(indicator.next(x));
            if run >= length { value } else { f64::NAN }
        })
        .collect()
}

pub fn sma(values: &[f64], length: usize) -> Vec<f64> {
    match SimpleMovingAverage::new(length) {
        Ok(indicator) => streamed(values, length, indicator, |v| v),
        Err(_) => vec![f64::NAN; values.len()],
    }
}

pub fn rolling_max(values: &[f64], length: usize) -> Vec<f64> {
    match Maximum::new(length) {
        Ok(indicator) => streamed(values, length, indicator, |v| v),
        Err(_) => vec![f64::NAN; values.len()],
    }
}

pub fn rolling_min(values: &[f64], length: usize) -> Vec<f64> {
    match Minimum::new(length) {
        Ok(indicator) => streamed(values, length, indicator, |v| v),
        Err(_) => vec![f64::NAN; values.len()],
    }
}

/// Rolling sample standard deviation (`ddof = 1`).
pub fn rolling_std(values: &[f64], length: usize) -> Vec<f64> {
    rolling(values, length, |w| w.std_dev())
}

/// Wilder's moving average.
///
/// Adjusted exponential mean with `alpha = 1 / length`, defined once `length`
/// observations have been seen. Missing observations decay the weights but
/// do not count towards the minimum.
pub fn rma(values: &[f64], length: usize) -> Vec<f64> {
    let length = length.max(1);
    let decay = 1.0 - 1.0 / length as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut observed = 0usize;

    values
        .iter()
        .map(|&x| {
            numerator *= decay;
            denominator *= decay;
            if !x.is_nan() {
                numerator += x;
                denominator += 1.0;
                observed += 1;
            }
            if observed >= length && denominator > 0.0 {
                numerator / denominator
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Exponential moving average with `alpha = 2 / (length + 1)`, seeded by the
/// mean of the first `length` values after any leading gap.
pub fn ema(values: &[f64], length: usize) -> Vec<f64> {
    let n = values.len();
    let length = length.max(1);
    let mut out = vec![f64::NAN; n];

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    if n - start < length {
        return out;
    }

    let seed_end = start + length - 1;
    let seed = values[start..=seed_end].iter().sum::<f64>() / length as f64;
    let alpha = 2.0 / (length as f64 + 1.0);

    out[seed_end] = seed;
    let mut prev = seed;
    for i in seed_end + 1..n {
        let x = values[i];
        if !x.is_nan() {
            prev = alpha * x + (1.0 - alpha) * prev;
        }
        out[i] = prev;
    }
    out
}

/// `high - low`, shifted by machine epsilon everywhere if any bar has a zero range.
pub fn non_zero_range(high: &[f64], low: &[f64]) -> Vec<f64> {
    let mut range: Vec<f64> = high.iter().zip(low).map(|(h, l)| h - l).collect();
    if range.iter().any(|r| *r == 0.0) {
        range.iter_mut().for_each(|r| *r += f64::EPSILON);
    }
    range
}

pub fn rsi(close: &[f64], length: usize) -> Vec<f64> {
    let change = diff(close);
    let gains: Vec<f64> = change.iter().map(|d| if *d < 0.0 { 0.0 } else { *d }).collect();
    let losses: Vec<f64> = change.iter().map(|d| if *d > 0.0 { 0.0 } else { *d }).collect();

    let avg_gain = rma(&gains, length);
    let avg_loss = rma(&losses, length);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| {
            if gain.is_nan() || loss.is_nan() {
                return f64::NAN;
            }
            let total = gain + loss.abs();
            // No movement at all over the smoothing horizon
            if total == 0.0 { 50.0 } else { 100.0 * gain / total }
        })
        .collect()
}

fn diff(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i == 0 { f64::NAN } else { values[i] - values[i - 1] })
        .collect()
}

/// Stochastic oscillator: returns `(%K, %D)`.
///
/// The raw oscillator over `k` bars is smoothed by an SMA of `smooth_k`
/// to give %K, and %K by an SMA of `d` to give %D.
pub fn stoch(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k: usize,
    d: usize,
    smooth_k: usize,
) -> (Vec<f64>, Vec<f64>) {
    let lowest = rolling_min(low, k);
    let highest = rolling_max(high, k);
    let range = non_zero_range(&highest, &lowest);

    let raw: Vec<f64> = (0..close.len())
        .map(|i| 100.0 * (close[i] - lowest[i]) / range[i])
        .collect();

    let percent_k = sma(&raw, smooth_k);
    let percent_d = sma(&percent_k, d);
    (percent_k, percent_d)
}

/// MACD histogram: `macd - signal`.
pub fn macd_histogram(close: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let macd: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd, signal);
    macd.iter().zip(&signal_line).map(|(m, s)| m - s).collect()
}

pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let high_low = non_zero_range(high, low);
    (0..close.len())
        .map(|i| {
            if i == 0 {
                return f64::NAN;
            }
            let prev_close = close[i - 1];
            high_low[i]
                .abs()
                .max((high[i] - prev_close).abs())
                .max((prev_close - low[i]).abs())
        })
        .collect()
}

pub fn atr(high: &[f64], low: &[f64], close: &[f64], length: usize) -> Vec<f64> {
    rma(&true_range(high, low, close), length)
}

#[derive(Debug, Clone)]
pub struct Adx {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// Average directional index with its +DI / -DI components.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], length: usize) -> Adx {
    let n = close.len();
    let average_range = atr(high, low, close, length);

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = snap_to_zero(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm[i] = snap_to_zero(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let plus_avg = rma(&plus_dm, length);
    let minus_avg = rma(&minus_dm, length);

    let directional = |avg: &[f64]| -> Vec<f64> {
        avg.iter()
            .zip(&average_range)
            .map(|(a, r)| {
                if a.is_nan() || r.is_nan() {
                    f64::NAN
                } else if *r == 0.0 {
                    0.0
                } else {
                    100.0 / r * a
                }
            })
            .collect()
    };
    let plus_di = directional(&plus_avg);
    let minus_di = directional(&minus_avg);

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(p, m)| {
            let total = p + m;
            if total.is_nan() {
                f64::NAN
            } else if total == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / total
            }
        })
        .collect();

    Adx {
        adx: rma(&dx, length),
        plus_di,
        minus_di,
    }
}

fn snap_to_zero(x: f64) -> f64 {
    if x.abs() < f64::EPSILON { 0.0 } else { x }
}

/// Bollinger band width relative to the middle band: `(upper - lower) / middle`.
pub fn bbands_width(close: &[f64], length: usize, std_multiplier: f64) -> Vec<f64> {
    match BollingerBands::new(length, std_multiplier) {
        Ok(indicator) => streamed(close, length, indicator, |bands: BollingerBandsOutput| {
            (bands.upper - bands.lower) / bands.average
        }),
        Err(_) => vec![f64::NAN; close.len()],
    }
}

struct VolumeBar {
    close: f64,
    volume: f64,
}

impl Close for VolumeBar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl Volume for VolumeBar {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// On-balance volume. The first bar counts as an up bar.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut indicator = OnBalanceVolume::new();
    close
        .iter()
        .zip(volume)
        .map(|(&close, &volume)| indicator.next(&VolumeBar { close, volume }))
        .collect()
}

/// Donchian channel width relative to the close.
pub fn donchian_width(high: &[f64], low: &[f64], close: &[f64], length: usize) -> Vec<f64> {
    let upper = rolling_max(high, length);
    let lower = rolling_min(low, length);
    (0..close.len())
        .map(|i| (upper[i] - lower[i]) / close[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_shift_pads_front() {
        let out = shift(&[1.0, 2.0, 3.0], 1);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.0, 2.0]);
        assert!(shift(&[1.0], 3)[0].is_nan());
    }

    #[test]
    fn test_sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_close(out[2], 2.0);
        assert_close(out[3], 3.0);
    }

    #[test]
    fn test_streamed_window_restarts_after_gap() {
        let out = sma(&[1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0], 2);
        assert_close(out[1], 1.5);
        assert!(out[2].is_nan() && out[3].is_nan());
        assert_close(out[4], 4.5);
        assert_close(out[5], 5.5);
    }

    #[test]
    fn test_streamed_kernels_match_window_arithmetic() {
        let close: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        let volume: Vec<f64> = (0..200).map(|i| 10.0 + (i % 7) as f64).collect();

        let mean = |w: &[f64]| w.iter().sum::<f64>() / w.len() as f64;
        let sma_50 = sma(&close, 50);
        let max_60 = rolling_max(&close, 60);
        let min_60 = rolling_min(&close, 60);
        let width = bbands_width(&close, 20, 2.0);

        for i in 0..close.len() {
            if i < 49 {
                assert!(sma_50[i].is_nan());
            } else {
                assert_close(sma_50[i], mean(&close[i - 49..=i]));
            }
            if i >= 59 {
                let w = &close[i - 59..=i];
                assert_close(max_60[i], w.iter().copied().fold(f64::MIN, f64::max));
                assert_close(min_60[i], w.iter().copied().fold(f64::MAX, f64::min));
            }
            if i >= 19 {
                let w = &close[i - 19..=i];
                let m = mean(w);
                let population_std =
                    (w.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 20.0).sqrt();
                assert_close(width[i], 4.0 * population_std / m);
            }
        }

        let balance = obv(&close, &volume);
        let mut expected = volume[0];
        for i in 1..close.len() {
            let change = close[i] - close[i - 1];
            if change > 0.0 {
                expected += volume[i];
            } else if change < 0.0 {
                expected -= volume[i];
            }
            assert_close(balance[i], expected);
        }
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(rolling_std(&values, 8)[6].is_nan());
        assert_close(rolling_std(&values, 8)[7], (32.0f64 / 7.0).sqrt());
    }

    #[test]
    fn test_rma_matches_adjusted_ewm() {
        // alpha = 1/2: weights 1, 0.5, 0.25 for the latest three values
        let out = rma(&[1.0, 2.0, 3.0], 2);
        assert!(out[0].is_nan());
        assert_close(out[1], (2.0 + 0.5 * 1.0) / 1.5);
        assert_close(out[2], (3.0 + 0.5 * 2.0 + 0.25 * 1.0) / 1.75);
    }

    #[test]
    fn test_rma_skips_leading_gap() {
        let out = rma(&[f64::NAN, 4.0, 4.0], 2);
        assert!(out[1].is_nan());
        assert_close(out[2], 4.0);
    }

    #[test]
    fn test_ema_is_sma_seeded() {
        let out = ema(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[1].is_nan());
        assert_close(out[2], 2.0);
        assert_close(out[3], 0.5 * 4.0 + 0.5 * 2.0);
    }

    #[test]
    fn test_ema_starts_after_leading_gap() {
        let out = ema(&[f64::NAN, f64::NAN, 3.0, 5.0], 2);
        assert!(out[2].is_nan());
        assert_close(out[3], 4.0);
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (1..=30).map(f64::from).collect();
        assert_close(*rsi(&rising, 14).last().unwrap(), 100.0);

        let flat = vec![10.0; 30];
        let out = rsi(&flat, 14);
        assert!(out[13].is_nan());
        assert_close(out[14], 50.0);
    }

    #[test]
    fn test_true_range_nudges_zero_ranges() {
        let flat = vec![5.0; 4];
        let out = true_range(&flat, &flat, &flat);
        assert!(out[0].is_nan());
        assert_eq!(out[1], f64::EPSILON);
    }

    #[test]
    fn test_stoch_on_flat_range_is_zero() {
        let flat = vec![5.0; 20];
        let (k, d) = stoch(&flat, &flat, &flat, 14, 3, 3);
        assert!(k[14].is_nan());
        assert_close(k[15], 0.0);
        assert!(d[16].is_nan());
        assert_close(d[17], 0.0);
    }

    #[test]
    fn test_adx_flat_is_zero() {
        let flat = vec![5.0; 40];
        let out = adx(&flat, &flat, &flat, 14);
        assert_close(*out.adx.last().unwrap(), 0.0);
        assert_close(*out.plus_di.last().unwrap(), 0.0);
        assert!(out.adx[26].is_nan());
        assert!(!out.adx[27].is_nan());
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let high: Vec<f64> = (0..60).map(|i| 101.0 + i as f64).collect();
        let low: Vec<f64> = (0..60).map(|i| 99.0 + i as f64).collect();
        let close: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = adx(&high, &low, &close, 14);

        assert!(out.plus_di[59] > 0.0);
        assert_close(out.minus_di[59], 0.0);
        assert_close(out.adx[59], 100.0);
    }

    #[test]
    fn test_obv_first_bar_counts_up() {
        let out = obv(&[10.0, 11.0, 11.0, 9.0], &[5.0, 2.0, 7.0, 3.0]);
        assert_eq!(out, vec![5.0, 7.0, 7.0, 4.0]);
    }

    #[test]
    fn test_pct_change_and_log_returns() {
        let pct = pct_change(&[100.0, 110.0, 121.0], 1);
        assert!(pct[0].is_nan());
        assert_close(pct[2], 0.1);

        let logs = log_returns(&[1.0, std::f64::consts::E]);
        assert_close(logs[1], 1.0);
    }

    #[test]
    fn test_bbands_width_uses_population_std() {
        let close = [1.0, 3.0];
        // mean 2, population std 1: width = 4 * 1 / 2
        assert_close(bbands_width(&close, 2, 2.0)[1], 2.0);
    }

    #[test]
    fn test_macd_histogram_warmup() {
        let close: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin()).collect();
        let hist = macd_histogram(&close, 12, 26, 9);
        assert!(hist[32].is_nan());
        assert!(hist[33].is_finite());
    }

    #[test]
    fn test_donchian_width() {
        let high = [10.0, 12.0, 11.0];
        let low = [8.0, 9.0, 10.0];
        let close = [9.0, 10.0, 10.0];
        let out = donchian_width(&high, &low, &close, 2);
        assert!(out[0].is_nan());
        assert_close(out[1], (12.0 - 8.0) / 10.0);
        assert_close(out[2], (12.0 - 9.0) / 10.0);
    }
}
