//! General utility functions.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use super::object::Candle;

/// Highest number of decimals inferred for an instrument
pub const MAX_PRECISION: u32 = 8;

/// Smallest span used in place of a zero-width numeric range
pub const MIN_SPAN: f64 = 1e-9;

/// Get chart directory
fn get_chart_dir(temp_name: &str) -> (PathBuf, PathBuf) {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let temp_path = cwd.join(temp_name);

    // A folder in the working directory wins over the one in the config dir
    if temp_path.exists() {
        return (cwd, temp_path);
    }

    let config_path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let temp_path = config_path.join(temp_name);

    if !temp_path.exists() {
        let _ = fs::create_dir_all(&temp_path);
    }

    (config_path, temp_path)
}

/// Temp directory holding settings, logs and saved drawings
pub static TEMP_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let (_, temp_dir) = get_chart_dir(".livechart");
    temp_dir
});

/// Get path for temp file with filename
pub fn get_file_path(filename: &str) -> PathBuf {
    TEMP_DIR.join(filename)
}

/// Get path for temp folder with folder name
pub fn get_folder_path(folder_name: &str) -> PathBuf {
    let folder_path = TEMP_DIR.join(folder_name);
    if !folder_path.exists() {
        let _ = fs::create_dir_all(&folder_path);
    }
    folder_path
}

/// Round price to price tick value
pub fn round_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target).round() * decimal_target;
    result.to_f64().unwrap_or(value)
}

/// Get number of digits after decimal point
pub fn get_digits(value: f64) -> usize {
    if !value.is_finite() {
        return 0;
    }
    let value_str = format!("{}", value);

    if let Some((_, exponent)) = value_str.split_once("e-") {
        return exponent.parse().unwrap_or(0);
    }
    if let Some((_, fraction)) = value_str.split_once('.') {
        return fraction.len();
    }

    0
}

/// Decimal precision of a candle sequence: the largest number of decimals
/// seen in any OHLC value, capped at [`MAX_PRECISION`].
pub fn infer_precision(candles: &[Candle]) -> u32 {
    let mut precision = 0;
    for candle in candles {
        for value in [candle.open, candle.high, candle.low, candle.close] {
            precision = precision.max(get_digits(value) as u32);
            if precision >= MAX_PRECISION {
                return MAX_PRECISION;
            }
        }
    }
    precision
}

/// Minimum price increment for a precision: `10^-precision`
pub fn min_movement(precision: u32) -> f64 {
    10f64.powi(-(precision.min(MAX_PRECISION) as i32))
}

/// Replace a degenerate span with [`MIN_SPAN`]
#[inline]
pub fn safe_span(span: f64) -> f64 {
    if span.is_finite() && span.abs() >= MIN_SPAN {
        span
    } else {
        MIN_SPAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234, 0.01), 1.23);
        assert_eq!(round_to(1.237, 0.01), 1.24);
    }

    #[test]
    fn test_get_digits() {
        assert_eq!(get_digits(1.234), 3);
        assert_eq!(get_digits(0.01), 2);
        assert_eq!(get_digits(0.001), 3);
        assert_eq!(get_digits(100.0), 0);
        assert_eq!(get_digits(f64::NAN), 0);
    }

    #[test]
    fn test_infer_precision_takes_maximum() {
        let candles = vec![
            Candle::new(0, 100.0, 101.5, 99.0, 100.25, 1.0),
            Candle::new(60_000, 100.125, 101.0, 99.0, 100.0, 1.0),
        ];
        assert_eq!(infer_precision(&candles), 3);
    }

    #[test]
    fn test_infer_precision_is_capped() {
        let candles = vec![Candle::new(0, 0.1 + 0.2, 1.0, 0.1, 0.5, 1.0)];
        assert_eq!(infer_precision(&candles), MAX_PRECISION);
    }

    #[test]
    fn test_min_movement() {
        assert_eq!(min_movement(0), 1.0);
        assert!((min_movement(2) - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_safe_span() {
        assert_eq!(safe_span(0.0), MIN_SPAN);
        assert_eq!(safe_span(f64::NAN), MIN_SPAN);
        assert_eq!(safe_span(2.0), 2.0);
    }
}
