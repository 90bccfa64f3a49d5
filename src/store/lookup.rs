//! Time lookup and range queries over an ordered candle slice.

use crate::trader::Candle;

/// Index of the candle at `time`, or of the nearest one when there is no
/// exact match. Ties go to the lower index. `None` only for an empty slice.
pub fn find_index_for_time(time: i64, series: &[Candle]) -> Option<usize> {
    if series.is_empty() {
        return None;
    }

    match series.binary_search_by_key(&time, |c| c.time) {
        Ok(ix) => Some(ix),
        Err(0) => Some(0),
        Err(ix) if ix >= series.len() => Some(series.len() - 1),
        Err(ix) => {
            let before = time - series[ix - 1].time;
            let after = series[ix].time - time;
            if after < before {
                Some(ix)
            } else {
                Some(ix - 1)
            }
        }
    }
}

/// Clamp an inclusive index window to the slice, `None` if nothing is left
fn clamp_window(len: usize, min_ix: usize, max_ix: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let max_ix = max_ix.min(len - 1);
    (min_ix <= max_ix).then_some((min_ix, max_ix))
}

/// Lowest low and highest high within `[min_ix, max_ix]`
pub fn price_range(series: &[Candle], min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
    let (min_ix, max_ix) = clamp_window(series.len(), min_ix, max_ix)?;
    let bars = &series[min_ix..=max_ix];

    let mut min_price = bars[0].low;
    let mut max_price = bars[0].high;
    for bar in bars.iter().skip(1) {
        min_price = min_price.min(bar.low);
        max_price = max_price.max(bar.high);
    }
    Some((min_price, max_price))
}

/// Lowest and highest close within `[min_ix, max_ix]`, for line/area mode
pub fn close_range(series: &[Candle], min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
    let (min_ix, max_ix) = clamp_window(series.len(), min_ix, max_ix)?;
    series[min_ix..=max_ix]
        .iter()
        .map(|c| c.close)
        .fold(None, |range, close| match range {
            Some((lo, hi)) => Some((f64::min(lo, close), f64::max(hi, close))),
            None => Some((close, close)),
        })
}

/// Volume range within `[min_ix, max_ix]`; the lower bound is always zero
pub fn volume_range(series: &[Candle], min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
    let (min_ix, max_ix) = clamp_window(series.len(), min_ix, max_ix)?;
    let max_volume = series[min_ix..=max_ix]
        .iter()
        .map(|c| c.volume)
        .fold(0.0, f64::max);
    Some((0.0, max_volume))
}
