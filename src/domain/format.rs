//! Table and summary rendering for substituted data blocks.
//!
//! Output is compact tab-separated text with one fixed header row per data
//! kind. Prices render at two decimals, oscillator values at four, volumes
//! as thousands-grouped integers. Empty input always renders a sentinel
//! string, never an empty table.

use crate::domain::portfolio::PortfolioSummary;
use crate::domain::quote::RealtimeQuote;
use crate::domain::series::{IndicatorRow, KlineBar, SeriesKind};
use chrono::NaiveDateTime;

pub const NO_DATA: &str = "暂无数据";
pub const NO_POSITIONS: &str = "暂无持仓";

/// Thousands-group an integer: 1234567 → "1,234,567".
pub fn fmt_grouped_int(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Thousands-group a monetary value at two decimals: 1234567.891 → "1,234,567.89".
pub fn fmt_grouped_amount(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));
    let int_value: i64 = int_part.parse().unwrap_or(0);
    // -0.xx loses its sign through the integer parse
    let sign = if value < 0.0 && int_value == 0 { "-" } else { "" };
    format!("{sign}{}.{frac_part}", fmt_grouped_int(int_value))
}

fn time_label(kind: SeriesKind, time: NaiveDateTime) -> String {
    match kind {
        SeriesKind::Minute => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        SeriesKind::Daily | SeriesKind::Weekly => time.format("%Y-%m-%d").to_string(),
    }
}

/// Price table for one series. Column order follows the product's saved
/// prompt templates: open, close, high, low. Minute series keep their raw
/// `trade_time` column name in the header.
pub fn kline_table(kind: SeriesKind, bars: &[KlineBar]) -> String {
    if bars.is_empty() {
        return NO_DATA.to_string();
    }

    let time_header = match kind {
        SeriesKind::Minute => "trade_time",
        SeriesKind::Daily | SeriesKind::Weekly => "日期",
    };
    let mut lines = vec![format!("{time_header}\t开盘\t收盘\t最高\t最低\t成交量")];
    for bar in bars {
        lines.push(format!(
            "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
            time_label(kind, bar.time),
            bar.open,
            bar.close,
            bar.high,
            bar.low,
            fmt_grouped_int(bar.volume),
        ));
    }
    lines.join("\n")
}

pub fn macd_table(rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return NO_DATA.to_string();
    }
    let mut lines = vec!["日期\tMACD\tMACD信号线\tMACD柱".to_string()];
    for row in rows {
        lines.push(format!(
            "{}\t{:.4}\t{:.4}\t{:.4}",
            row.trade_date, row.macd, row.macd_signal, row.macd_hist
        ));
    }
    lines.join("\n")
}

pub fn ema_table(rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return NO_DATA.to_string();
    }
    let mut lines = vec!["日期\tEMA(12)\tEMA(26)".to_string()];
    for row in rows {
        lines.push(format!(
            "{}\t{:.2}\t{:.2}",
            row.trade_date, row.ema_12, row.ema_26
        ));
    }
    lines.join("\n")
}

pub fn rsi_table(rows: &[IndicatorRow]) -> String {
    if rows.is_empty() {
        return NO_DATA.to_string();
    }
    let mut lines = vec!["日期\tRSI(6)\tRSI(12)\tRSI(24)".to_string()];
    for row in rows {
        lines.push(format!(
            "{}\t{:.2}\t{:.2}\t{:.2}",
            row.trade_date, row.rsi_6, row.rsi_12, row.rsi_24
        ));
    }
    lines.join("\n")
}

/// Positions table plus a totals footer.
pub fn positions_block(summary: &PortfolioSummary) -> String {
    if summary.positions.is_empty() {
        return NO_POSITIONS.to_string();
    }

    let mut block =
        String::from("股票代码\t股票名称\t持仓数量\t成本价\t当前价\t市值\t盈亏金额\t盈亏比例\n");
    for pos in &summary.positions {
        block.push_str(&format!(
            "{}\t{}\t{}\t{:.2}\t{:.2}\t{}\t{}\t{:.2}%\n",
            pos.stock_code,
            pos.stock_name,
            fmt_grouped_int(pos.quantity),
            pos.cost_price,
            pos.valuation_price(),
            fmt_grouped_amount(pos.market_value()),
            fmt_grouped_amount(pos.profit_loss.unwrap_or(0.0)),
            pos.profit_loss_pct.unwrap_or(0.0),
        ));
    }

    block.push_str("\n--- 汇总 ---\n");
    block.push_str(&format!("持仓数量: {} 只\n", summary.positions_count()));
    block.push_str(&format!(
        "总市值: {}\n",
        fmt_grouped_amount(summary.total_market_value)
    ));
    block.push_str(&format!("总成本: {}\n", fmt_grouped_amount(summary.total_cost)));
    block.push_str(&format!(
        "总盈亏: {}",
        fmt_grouped_amount(summary.total_profit_loss)
    ));
    block
}

pub fn cash_line(balance: f64) -> String {
    format!("可用资金: {} 元", fmt_grouped_amount(balance))
}

/// `updated_at` is stored as `%Y-%m-%d %H:%M:%S`; render in the Chinese
/// date form, or pass the raw string through if it does not parse.
fn update_time_label(updated_at: &str) -> String {
    match NaiveDateTime::parse_from_str(updated_at, "%Y-%m-%d %H:%M:%S") {
        Ok(time) => time.format("%Y年%m月%d日 %H:%M:%S").to_string(),
        Err(_) => updated_at.to_string(),
    }
}

/// Short price line for the `当前价格` variable.
pub fn price_line(stock_code: &str, quote: Option<&RealtimeQuote>) -> String {
    let Some(quote) = quote else {
        return format!("股票 {stock_code} 暂无当前价格数据");
    };
    let Some(price) = quote.price else {
        return format!("股票 {stock_code} 暂无当前价格数据");
    };

    let mut line = format!("当前价格: {price:.2} 元");
    if let Some(trade_date) = &quote.trade_date {
        line.push_str(&format!(" (交易日: {trade_date})"));
    }
    if let Some(updated_at) = &quote.updated_at {
        line.push_str(&format!("\n更新时间: {}", update_time_label(updated_at)));
    }
    line
}

/// Full real-time quote block for the `实时行情` variable: price, trading
/// and valuation sections, each field omitted when absent.
pub fn quote_block(stock_code: &str, quote: Option<&RealtimeQuote>) -> String {
    let Some(quote) = quote else {
        return format!("股票 {stock_code} 暂无实时行情数据");
    };

    let mut block = String::from("=== 实时行情数据 ===\n\n");
    block.push_str(&format!("股票代码: {}\n", quote.ts_code));
    if let Some(name) = &quote.stock_name {
        block.push_str(&format!("股票名称: {name}\n"));
    }

    block.push_str("\n--- 价格信息 ---\n");
    if let Some(price) = quote.price {
        block.push_str(&format!("当前价: {price:.2} 元\n"));
    }
    if let Some(change) = quote.change {
        block.push_str(&format!("涨跌额: {change:+.2} 元\n"));
    }
    if let Some(change_pct) = quote.change_percent {
        block.push_str(&format!("涨跌幅: {change_pct:+.2}%\n"));
    }
    if let Some(open) = quote.open {
        block.push_str(&format!("开盘价: {open:.2} 元\n"));
    }
    if let Some(pre_close) = quote.pre_close {
        block.push_str(&format!("昨收价: {pre_close:.2} 元\n"));
    }
    if let Some(high) = quote.high {
        block.push_str(&format!("最高价: {high:.2} 元\n"));
    }
    if let Some(low) = quote.low {
        block.push_str(&format!("最低价: {low:.2} 元\n"));
    }
    if let Some(amplitude) = quote.amplitude {
        block.push_str(&format!("振幅: {amplitude:.2}%\n"));
    }

    block.push_str("\n--- 成交信息 ---\n");
    if let Some(volume) = quote.volume {
        block.push_str(&format!("成交量: {:.2} 亿手\n", volume / 1e8));
    }
    if let Some(amount) = quote.amount {
        block.push_str(&format!("成交额: {:.2} 亿元\n", amount / 1e8));
    }
    if let Some(turnover) = quote.turnover_ratio {
        block.push_str(&format!("换手率: {turnover:.2}%\n"));
    }

    if quote.has_valuation() {
        block.push_str("\n--- 估值信息 ---\n");
        if let Some(total_mv) = quote.total_mv {
            block.push_str(&format!("总市值: {:.2} 亿元\n", total_mv / 10_000.0));
        }
        if let Some(circ_mv) = quote.circ_mv {
            block.push_str(&format!("流通市值: {:.2} 亿元\n", circ_mv / 10_000.0));
        }
        if let Some(pe) = quote.pe {
            block.push_str(&format!("市盈率(动): {pe:.2}\n"));
        }
        if let Some(pe_ttm) = quote.pe_ttm {
            block.push_str(&format!("市盈率(TTM): {pe_ttm:.2}\n"));
        }
        if let Some(pb) = quote.pb {
            block.push_str(&format!("市净率: {pb:.2}\n"));
        }
        if let Some(dv_ratio) = quote.dv_ratio {
            block.push_str(&format!("股息率: {dv_ratio:.2}%\n"));
        }
    }

    block.push_str("\n--- 数据时间 ---\n");
    if let Some(trade_date) = &quote.trade_date {
        block.push_str(&format!("交易日期: {trade_date}\n"));
    }
    if let Some(updated_at) = &quote.updated_at {
        block.push_str(&format!("更新时间: {}\n", update_time_label(updated_at)));
    }

    block.truncate(block.trim_end_matches('\n').len());
    block
}
