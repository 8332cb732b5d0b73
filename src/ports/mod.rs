//! Port traits required from collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod portfolio_port;
