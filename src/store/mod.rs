//! Candle storage: base series, derived timeframes and lookups.

mod lookup;
mod manager;
mod series;

pub use lookup::{close_range, find_index_for_time, price_range, volume_range};
pub use manager::{StoreFrame, TimeSeriesStore};
pub use series::{aggregate, bucket_start, AppendOutcome, DerivedSeries};
