//! Market data lookup port trait.
//!
//! Empty results are a valid, non-error outcome everywhere; an `Err` means
//! the store itself failed and the whole resolve call should abort.

use crate::domain::error::StockchatError;
use crate::domain::quote::{RealtimeQuote, StockInfo};
use crate::domain::series::{IndicatorRow, KlineBar, SeriesKind};

pub trait MarketDataPort {
    /// Trailing `window` bars for one code, oldest first.
    fn fetch_kline(
        &self,
        ts_code: &str,
        kind: SeriesKind,
        window: usize,
    ) -> Result<Vec<KlineBar>, StockchatError>;

    /// Trailing `window` daily indicator rows, oldest first. Indicator data
    /// exists for the daily series only.
    fn fetch_indicators(
        &self,
        ts_code: &str,
        window: usize,
    ) -> Result<Vec<IndicatorRow>, StockchatError>;

    /// Resolve a free-text code or name to a canonical identity.
    fn lookup_stock(&self, query: &str) -> Result<Option<StockInfo>, StockchatError>;

    /// Latest stored real-time quote, if the refresh job has produced one.
    fn fetch_quote(&self, ts_code: &str) -> Result<Option<RealtimeQuote>, StockchatError>;
}
