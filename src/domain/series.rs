//! Series kinds and row types for kline and indicator data.

use chrono::{NaiveDate, NaiveDateTime};

/// Granularity of a requested time series. The variants map 1:1 onto the
/// token prefix keywords recognized in chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Minute,
    Daily,
    Weekly,
}

impl SeriesKind {
    /// Token prefix keyword for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            SeriesKind::Minute => "1分钟K",
            SeriesKind::Daily => "日K",
            SeriesKind::Weekly => "周K",
        }
    }

    /// All kinds, longest keyword first so the scanner never matches a
    /// shorter keyword inside a longer one.
    pub const ALL: [SeriesKind; 3] = [SeriesKind::Minute, SeriesKind::Daily, SeriesKind::Weekly];
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Default row counts applied when a token carries no window segment.
///
/// Windows count rows, not calendar days: the minute default of 1440 covers
/// roughly two trading days of one-minute bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDefaults {
    pub daily: usize,
    pub weekly: usize,
    pub minute: usize,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        WindowDefaults {
            daily: 60,
            weekly: 360,
            minute: 1440,
        }
    }
}

impl WindowDefaults {
    pub fn for_kind(&self, kind: SeriesKind) -> usize {
        match kind {
            SeriesKind::Minute => self.minute,
            SeriesKind::Daily => self.daily,
            SeriesKind::Weekly => self.weekly,
        }
    }
}

/// One kline bar. Daily and weekly bars carry a midnight timestamp; minute
/// bars carry the intraday bar time.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineBar {
    pub ts_code: String,
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// One row of the daily technical-indicator table. The values are supplied
/// by an external pipeline; missing columns are stored as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub trade_date: NaiveDate,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub ema_12: f64,
    pub ema_26: f64,
    pub rsi_6: f64,
    pub rsi_12: f64,
    pub rsi_24: f64,
}

/// Keep at most the trailing `window` rows of an oldest-first series.
pub fn truncate_to_window<T>(rows: Vec<T>, window: usize) -> Vec<T> {
    if rows.len() > window {
        let skip = rows.len() - window;
        rows.into_iter().skip(skip).collect()
    } else {
        rows
    }
}
