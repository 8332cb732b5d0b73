//! User positions and portfolio summary.

/// One open position. `current_price` and the derived P&L fields are filled
/// in by the scheduled price refresh and may lag or be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: i64,
    pub cost_price: f64,
    pub current_price: Option<f64>,
    pub profit_loss: Option<f64>,
    pub profit_loss_pct: Option<f64>,
}

impl Position {
    /// Price used for valuation: last refreshed price, falling back to cost.
    pub fn valuation_price(&self) -> f64 {
        self.current_price.unwrap_or(self.cost_price)
    }

    pub fn market_value(&self) -> f64 {
        self.valuation_price() * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub positions: Vec<Position>,
    pub cash: f64,
    pub total_market_value: f64,
    pub total_cost: f64,
    pub total_profit_loss: f64,
    pub total_assets: f64,
}

impl PortfolioSummary {
    pub fn new(positions: Vec<Position>, cash: f64) -> Self {
        let total_market_value: f64 = positions.iter().map(Position::market_value).sum();
        let total_cost: f64 = positions
            .iter()
            .map(|pos| pos.cost_price * pos.quantity as f64)
            .sum();
        let total_profit_loss: f64 = positions
            .iter()
            .map(|pos| pos.profit_loss.unwrap_or(0.0))
            .sum();
        PortfolioSummary {
            positions,
            cash,
            total_market_value,
            total_cost,
            total_profit_loss,
            total_assets: cash + total_market_value,
        }
    }

    pub fn positions_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(code: &str, quantity: i64, cost: f64, current: Option<f64>) -> Position {
        Position {
            stock_code: code.to_string(),
            stock_name: format!("{code}名称"),
            quantity,
            cost_price: cost,
            current_price: current,
            profit_loss: current.map(|c| (c - cost) * quantity as f64),
            profit_loss_pct: current.map(|c| (c - cost) / cost * 100.0),
        }
    }

    #[test]
    fn empty_summary() {
        let summary = PortfolioSummary::new(vec![], 5000.0);
        assert_eq!(summary.positions_count(), 0);
        assert!((summary.total_market_value).abs() < f64::EPSILON);
        assert!((summary.total_assets - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn totals_from_positions() {
        let positions = vec![
            sample_position("600000.SH", 100, 10.0, Some(12.0)),
            sample_position("000001.SZ", 200, 5.0, Some(4.0)),
        ];
        let summary = PortfolioSummary::new(positions, 1000.0);

        // 100*12 + 200*4 = 2000
        assert!((summary.total_market_value - 2000.0).abs() < f64::EPSILON);
        // 100*10 + 200*5 = 2000
        assert!((summary.total_cost - 2000.0).abs() < f64::EPSILON);
        // 100*2 + 200*(-1) = 0
        assert!((summary.total_profit_loss).abs() < f64::EPSILON);
        assert!((summary.total_assets - 3000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn valuation_falls_back_to_cost() {
        let pos = sample_position("600000.SH", 100, 10.0, None);
        assert!((pos.valuation_price() - 10.0).abs() < f64::EPSILON);
        assert!((pos.market_value() - 1000.0).abs() < f64::EPSILON);

        let summary = PortfolioSummary::new(vec![pos], 0.0);
        assert!((summary.total_market_value - 1000.0).abs() < f64::EPSILON);
        assert!((summary.total_profit_loss).abs() < f64::EPSILON);
    }
}
