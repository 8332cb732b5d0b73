//! Resolve-and-substitute orchestration.
//!
//! One resolve call scans the raw message for placeholder tokens and
//! special-variable keywords, resolves each against the lookup ports, and
//! rewrites the message in a single pass over recorded spans. Inserted
//! replacement text is never re-scanned, and a span consumed by a token is
//! never touched again by a later keyword match.
//!
//! Lookups run sequentially in discovery order; each is a single blocking
//! call with no timeout or retry of its own. The resolver holds no shared
//! mutable state, so independent messages may be resolved concurrently as
//! long as the ports are safe for concurrent use.

use std::collections::HashMap;

use crate::domain::error::StockchatError;
use crate::domain::format;
use crate::domain::series::{truncate_to_window, SeriesKind, WindowDefaults};
use crate::domain::token::{Indicator, PlaceholderToken};
use crate::domain::token_parser;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;

/// Keywords resolved by substring containment rather than the token grammar.
/// Every occurrence of one keyword receives the same computed block.
pub const SPECIAL_VARIABLES: [&str; 4] = ["持仓", "可用资金", "当前价格", "实时行情"];

/// Conversation state the caller must supply: whose portfolio, and which
/// stock an entity-less token refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    pub user_id: i64,
    pub stock_code: String,
}

/// Result of one resolve call: the rewritten message plus an audit map from
/// each recognized raw token/keyword to the text it was replaced with.
/// Diagnostics (`[...不存在]`, `[...：暂无数据]`) substitute inline but are
/// not recorded in the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub text: String,
    pub variables: HashMap<String, String>,
}

impl WindowDefaults {
    /// Read `[windows] daily/weekly/minute` with the documented defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let base = WindowDefaults::default();
        WindowDefaults {
            daily: config.get_int("windows", "daily", base.daily as i64).max(1) as usize,
            weekly: config.get_int("windows", "weekly", base.weekly as i64).max(1) as usize,
            minute: config.get_int("windows", "minute", base.minute as i64).max(1) as usize,
        }
    }
}

struct Span {
    start: usize,
    end: usize,
    replacement: String,
}

fn overlaps(spans: &[Span], start: usize, end: usize) -> bool {
    spans.iter().any(|span| start < span.end && span.start < end)
}

/// Apply non-overlapping spans (any order) in one rewrite.
fn apply_spans(message: &str, mut spans: Vec<Span>) -> String {
    spans.sort_by_key(|span| span.start);
    let mut text = String::with_capacity(message.len());
    let mut pos = 0;
    for span in &spans {
        text.push_str(&message[pos..span.start]);
        text.push_str(&span.replacement);
        pos = span.end;
    }
    text.push_str(&message[pos..]);
    text
}

fn wrap_block(block: &str) -> String {
    format!("\n\"\"\"\n{block}\n\"\"\"")
}

enum TokenText {
    /// Resolved data block, recorded in the audit map.
    Data(String),
    /// Inline diagnostic, substituted but not recorded.
    Diagnostic(String),
}

pub struct Resolver<'a> {
    market: &'a dyn MarketDataPort,
    portfolio: &'a dyn PortfolioPort,
    defaults: WindowDefaults,
}

impl<'a> Resolver<'a> {
    pub fn new(
        market: &'a dyn MarketDataPort,
        portfolio: &'a dyn PortfolioPort,
        defaults: WindowDefaults,
    ) -> Self {
        Self {
            market,
            portfolio,
            defaults,
        }
    }

    /// Replace every placeholder token and special variable in `message`.
    ///
    /// Upstream store failures propagate as `Err`; unresolvable entities and
    /// empty series degrade to bracketed inline diagnostics and processing
    /// continues with the remaining placeholders.
    pub fn resolve_and_substitute(
        &self,
        ctx: &ResolveContext,
        message: &str,
    ) -> Result<ResolveOutcome, StockchatError> {
        let mut spans: Vec<Span> = Vec::new();
        let mut variables = HashMap::new();

        for token in token_parser::scan(message) {
            let (start, end) = (token.start, token.end());
            match self.resolve_token(ctx, &token)? {
                TokenText::Data(block) => {
                    variables.insert(token.raw.clone(), block.clone());
                    spans.push(Span {
                        start,
                        end,
                        replacement: block,
                    });
                }
                TokenText::Diagnostic(diag) => spans.push(Span {
                    start,
                    end,
                    replacement: diag,
                }),
            }
        }

        for keyword in SPECIAL_VARIABLES {
            let positions: Vec<usize> = message
                .match_indices(keyword)
                .map(|(idx, _)| idx)
                .filter(|&idx| !overlaps(&spans, idx, idx + keyword.len()))
                .collect();
            if positions.is_empty() {
                continue;
            }

            let block = self.resolve_special(ctx, keyword)?;
            let wrapped = wrap_block(&block);
            for start in positions {
                spans.push(Span {
                    start,
                    end: start + keyword.len(),
                    replacement: wrapped.clone(),
                });
            }
            variables.insert(keyword.to_string(), block);
        }

        Ok(ResolveOutcome {
            text: apply_spans(message, spans),
            variables,
        })
    }

    fn resolve_token(
        &self,
        ctx: &ResolveContext,
        token: &PlaceholderToken,
    ) -> Result<TokenText, StockchatError> {
        let ts_code = match &token.entity {
            Some(text) => match self.market.lookup_stock(text)? {
                Some(info) => info.ts_code,
                None => {
                    return Ok(TokenText::Diagnostic(format!("[股票\"{text}\"不存在]")));
                }
            },
            None => ctx.stock_code.clone(),
        };

        let window = token
            .window
            .unwrap_or_else(|| self.defaults.for_kind(token.kind));

        let bars = self.market.fetch_kline(&ts_code, token.kind, window)?;
        if bars.is_empty() {
            return Ok(TokenText::Diagnostic(format!("[{}：暂无数据]", token.raw)));
        }
        // Adapters already bound their queries; this keeps the contract even
        // if one returns more rows than asked for.
        let bars = truncate_to_window(bars, window);

        let mut block = format::kline_table(token.kind, &bars);
        block.push_str(&self.indicator_sections(token, &ts_code, window)?);

        Ok(TokenText::Data(wrap_block(&block)))
    }

    /// Indicator tables appended after the price table, in fixed MACD → EMA
    /// → RSI order regardless of request order. Indicator data exists for
    /// the daily series only; requests on other kinds are silently omitted.
    fn indicator_sections(
        &self,
        token: &PlaceholderToken,
        ts_code: &str,
        window: usize,
    ) -> Result<String, StockchatError> {
        if token.indicators.is_empty() || token.kind != SeriesKind::Daily {
            return Ok(String::new());
        }

        let rows = self.market.fetch_indicators(ts_code, window)?;
        let rows = truncate_to_window(rows, window);
        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut sections = String::new();
        if token.wants(Indicator::Macd) {
            sections.push_str("\n\nMACD指标:\n");
            sections.push_str(&format::macd_table(&rows));
        }
        if token.wants(Indicator::Ema) {
            sections.push_str("\n\nEMA指标:\n");
            sections.push_str(&format::ema_table(&rows));
        }
        if token.wants(Indicator::Rsi) {
            sections.push_str("\n\nRSI指标:\n");
            sections.push_str(&format::rsi_table(&rows));
        }
        Ok(sections)
    }

    fn resolve_special(
        &self,
        ctx: &ResolveContext,
        keyword: &str,
    ) -> Result<String, StockchatError> {
        match keyword {
            "持仓" => {
                let summary = self.portfolio.portfolio_summary(ctx.user_id)?;
                Ok(format::positions_block(&summary))
            }
            "可用资金" => {
                let balance = self.portfolio.cash_balance(ctx.user_id)?;
                Ok(format::cash_line(balance))
            }
            "当前价格" => {
                let quote = self.market.fetch_quote(&ctx.stock_code)?;
                Ok(format::price_line(&ctx.stock_code, quote.as_ref()))
            }
            "实时行情" => {
                let quote = self.market.fetch_quote(&ctx.stock_code)?;
                Ok(format::quote_block(&ctx.stock_code, quote.as_ref()))
            }
            other => unreachable!("unknown special variable {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::PortfolioSummary;
    use crate::domain::quote::{RealtimeQuote, StockInfo};
    use crate::domain::series::{IndicatorRow, KlineBar};
    use chrono::NaiveDate;
    use std::collections::HashMap as Map;

    #[derive(Default)]
    struct MockMarket {
        daily: Map<String, Vec<KlineBar>>,
        indicators: Map<String, Vec<IndicatorRow>>,
        stocks: Map<String, StockInfo>,
        quotes: Map<String, RealtimeQuote>,
        fail: bool,
    }

    impl MarketDataPort for MockMarket {
        fn fetch_kline(
            &self,
            ts_code: &str,
            _kind: SeriesKind,
            window: usize,
        ) -> Result<Vec<KlineBar>, StockchatError> {
            if self.fail {
                return Err(StockchatError::Database {
                    reason: "connection lost".into(),
                });
            }
            let bars = self.daily.get(ts_code).cloned().unwrap_or_default();
            Ok(truncate_to_window(bars, window))
        }

        fn fetch_indicators(
            &self,
            ts_code: &str,
            window: usize,
        ) -> Result<Vec<IndicatorRow>, StockchatError> {
            let rows = self.indicators.get(ts_code).cloned().unwrap_or_default();
            Ok(truncate_to_window(rows, window))
        }

        fn lookup_stock(&self, query: &str) -> Result<Option<StockInfo>, StockchatError> {
            Ok(self.stocks.get(query).cloned())
        }

        fn fetch_quote(&self, ts_code: &str) -> Result<Option<RealtimeQuote>, StockchatError> {
            Ok(self.quotes.get(ts_code).cloned())
        }
    }

    #[derive(Default)]
    struct MockPortfolio {
        summary: Option<PortfolioSummary>,
        cash: f64,
    }

    impl PortfolioPort for MockPortfolio {
        fn portfolio_summary(&self, _user_id: i64) -> Result<PortfolioSummary, StockchatError> {
            Ok(self
                .summary
                .clone()
                .unwrap_or_else(|| PortfolioSummary::new(vec![], self.cash)))
        }

        fn cash_balance(&self, _user_id: i64) -> Result<f64, StockchatError> {
            Ok(self.cash)
        }
    }

    fn bars(code: &str, count: usize) -> Vec<KlineBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count)
            .map(|i| KlineBar {
                ts_code: code.to_string(),
                time: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: 10.0 + i as f64,
                high: 11.0 + i as f64,
                low: 9.0 + i as f64,
                close: 10.5 + i as f64,
                volume: 1000,
            })
            .collect()
    }

    fn ctx() -> ResolveContext {
        ResolveContext {
            user_id: 1,
            stock_code: "688313.SH".to_string(),
        }
    }

    #[test]
    fn no_placeholders_round_trips_byte_identical() {
        let market = MockMarket::default();
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let message = "今天大盘怎么样？";
        let outcome = resolver.resolve_and_substitute(&ctx(), message).unwrap();
        assert_eq!(outcome.text, message);
        assert!(outcome.variables.is_empty());
    }

    #[test]
    fn window_bounds_rows() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 15));
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver.resolve_and_substitute(&ctx(), "日K_10天").unwrap();
        let block = &outcome.variables["日K_10天"];
        let data_rows = block.lines().filter(|l| l.starts_with("2024-")).count();
        assert_eq!(data_rows, 10);
        // Newest row last.
        assert!(block.contains("2024-01-15\t"));
        assert!(!block.contains("2024-01-05\t"));
    }

    #[test]
    fn default_window_when_segment_absent() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 80));
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver.resolve_and_substitute(&ctx(), "日K").unwrap();
        let block = &outcome.variables["日K"];
        let data_rows = block.lines().filter(|l| l.starts_with("2024-")).count();
        assert_eq!(data_rows, 60);
    }

    #[test]
    fn unknown_entity_becomes_diagnostic() {
        let market = MockMarket::default();
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "看看日K_不存在的股票_10天")
            .unwrap();
        assert_eq!(outcome.text, "看看[股票\"不存在的股票\"不存在]");
        assert!(outcome.variables.is_empty());
    }

    #[test]
    fn empty_series_becomes_no_data_diagnostic() {
        let market = MockMarket::default();
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver.resolve_and_substitute(&ctx(), "日K_10天").unwrap();
        assert_eq!(outcome.text, "[日K_10天：暂无数据]");
        assert!(outcome.variables.is_empty());
    }

    #[test]
    fn diagnostic_and_data_mix() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 5));
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "日K_BOGUS_5天 和 日K_5天")
            .unwrap();
        assert!(outcome.text.contains("[股票\"BOGUS\"不存在]"));
        assert!(outcome.text.contains("2024-01-05\t"));
        assert_eq!(outcome.variables.len(), 1);
        assert!(outcome.variables.contains_key("日K_5天"));
    }

    #[test]
    fn entity_lookup_substitutes_canonical_code() {
        let mut market = MockMarket::default();
        market.stocks.insert(
            "复旦微电".to_string(),
            StockInfo {
                ts_code: "688385.SH".to_string(),
                name: "复旦微电".to_string(),
            },
        );
        market.daily.insert("688385.SH".to_string(), bars("688385.SH", 3));
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "日K_复旦微电_3天")
            .unwrap();
        assert!(outcome.variables.contains_key("日K_复旦微电_3天"));
    }

    #[test]
    fn indicator_sections_in_fixed_order() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 5));
        let rows: Vec<IndicatorRow> = (1..=5)
            .map(|d| IndicatorRow {
                trade_date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                macd: 0.1,
                macd_signal: 0.05,
                macd_hist: 0.05,
                ema_12: 10.0,
                ema_26: 9.5,
                rsi_6: 60.0,
                rsi_12: 55.0,
                rsi_24: 50.0,
            })
            .collect();
        market.indicators.insert("688313.SH".to_string(), rows);
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        // Requested RSI&MACD; rendered MACD first.
        let outcome = resolver
            .resolve_and_substitute(&ctx(), "日K_5天_RSI&MACD")
            .unwrap();
        let block = &outcome.variables["日K_5天_RSI&MACD"];
        let macd_at = block.find("MACD指标:").expect("MACD section");
        let rsi_at = block.find("RSI指标:").expect("RSI section");
        assert!(macd_at < rsi_at);
        assert!(!block.contains("EMA指标:"));
    }

    #[test]
    fn weekly_indicator_request_silently_omitted() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 5));
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "周K_5天_MACD")
            .unwrap();
        let block = &outcome.variables["周K_5天_MACD"];
        assert!(!block.contains("MACD指标"));
        assert!(block.contains("日期\t开盘"));
    }

    #[test]
    fn special_variable_repeats_collapse_to_same_block() {
        let market = MockMarket::default();
        let portfolio = MockPortfolio {
            summary: None,
            cash: 1234.5,
        };
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "可用资金够吗？再说一遍可用资金")
            .unwrap();
        assert_eq!(outcome.text.matches("可用资金: 1,234.50 元").count(), 2);
        assert_eq!(
            outcome.variables["可用资金"],
            "可用资金: 1,234.50 元"
        );
    }

    #[test]
    fn empty_portfolio_renders_sentinel() {
        let market = MockMarket::default();
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver.resolve_and_substitute(&ctx(), "持仓").unwrap();
        assert_eq!(outcome.text, "\n\"\"\"\n暂无持仓\n\"\"\"");
        assert_eq!(outcome.variables["持仓"], "暂无持仓");
    }

    #[test]
    fn keyword_inside_token_span_not_double_substituted() {
        // "持仓" as an entity segment is consumed by the token span; the
        // special-variable pass must not rewrite inside it.
        let market = MockMarket::default();
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver.resolve_and_substitute(&ctx(), "日K_持仓").unwrap();
        assert_eq!(outcome.text, "[股票\"持仓\"不存在]");
        assert!(!outcome.variables.contains_key("持仓"));
    }

    #[test]
    fn upstream_failure_propagates() {
        let market = MockMarket {
            fail: true,
            ..Default::default()
        };
        let portfolio = MockPortfolio::default();
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let err = resolver
            .resolve_and_substitute(&ctx(), "日K_10天")
            .unwrap_err();
        assert!(matches!(err, StockchatError::Database { .. }));
    }

    #[test]
    fn substituted_output_never_rematches() {
        let mut market = MockMarket::default();
        market.daily.insert("688313.SH".to_string(), bars("688313.SH", 10));
        let portfolio = MockPortfolio {
            summary: None,
            cash: 99.0,
        };
        let resolver = Resolver::new(&market, &portfolio, WindowDefaults::default());

        let outcome = resolver
            .resolve_and_substitute(&ctx(), "日K_10天 另外我的可用资金呢")
            .unwrap();
        assert!(token_parser::scan(&outcome.text).is_empty());
    }
}
