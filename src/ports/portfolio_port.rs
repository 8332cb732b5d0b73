//! Portfolio lookup port trait.

use crate::domain::error::StockchatError;
use crate::domain::portfolio::PortfolioSummary;

pub trait PortfolioPort {
    fn portfolio_summary(&self, user_id: i64) -> Result<PortfolioSummary, StockchatError>;

    fn cash_balance(&self, user_id: i64) -> Result<f64, StockchatError>;
}
