//! Placeholder token structure and the known-indicator vocabulary.

use crate::domain::series::SeriesKind;

/// Indicator names accepted in the trailing token segment. Matching is
/// case-sensitive against this closed set; anything else is entity text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Macd,
    Ema,
    Rsi,
    Kdj,
    Boll,
    Ma,
    Vol,
}

impl Indicator {
    pub fn from_name(name: &str) -> Option<Indicator> {
        match name {
            "MACD" => Some(Indicator::Macd),
            "EMA" => Some(Indicator::Ema),
            "RSI" => Some(Indicator::Rsi),
            "KDJ" => Some(Indicator::Kdj),
            "BOLL" => Some(Indicator::Boll),
            "MA" => Some(Indicator::Ma),
            "VOL" => Some(Indicator::Vol),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Indicator::Macd => "MACD",
            Indicator::Ema => "EMA",
            Indicator::Rsi => "RSI",
            Indicator::Kdj => "KDJ",
            Indicator::Boll => "BOLL",
            Indicator::Ma => "MA",
            Indicator::Vol => "VOL",
        }
    }
}

/// One recognized placeholder, parsed from its raw matched text.
///
/// `start` is the byte offset of `raw` in the scanned message; `raw` occurs
/// exactly there and matches are non-overlapping, so `(start, start+raw.len())`
/// is a valid replacement span.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderToken {
    pub raw: String,
    pub start: usize,
    pub kind: SeriesKind,
    /// Free-text stock code or name; `None` means "the conversation subject".
    pub entity: Option<String>,
    /// Row count; `None` means "apply the per-kind default".
    pub window: Option<usize>,
    /// Requested indicators, in the order written.
    pub indicators: Vec<Indicator>,
}

impl PlaceholderToken {
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }

    pub fn wants(&self, indicator: Indicator) -> bool {
        self.indicators.contains(&indicator)
    }
}
