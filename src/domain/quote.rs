//! Real-time quote snapshot as stored by the market-data refresh job.

/// All fields except the code are optional: the provider omits valuation
/// columns for some markets and the refresh job stores whatever it got.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealtimeQuote {
    pub ts_code: String,
    pub stock_name: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub open: Option<f64>,
    pub pre_close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub amplitude: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
    pub turnover_ratio: Option<f64>,
    pub total_mv: Option<f64>,
    pub circ_mv: Option<f64>,
    pub pe: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub dv_ratio: Option<f64>,
    pub trade_date: Option<String>,
    pub updated_at: Option<String>,
}

impl RealtimeQuote {
    pub fn has_valuation(&self) -> bool {
        self.total_mv.is_some()
            || self.circ_mv.is_some()
            || self.pe.is_some()
            || self.pe_ttm.is_some()
            || self.pb.is_some()
            || self.dv_ratio.is_some()
    }
}

/// Canonical identity returned by stock lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockInfo {
    pub ts_code: String,
    pub name: String,
}
