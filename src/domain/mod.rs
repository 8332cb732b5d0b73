//! Core domain types and logic.

pub mod series;
pub mod token;
pub mod token_parser;
pub mod format;
pub mod portfolio;
pub mod quote;
pub mod resolver;
pub mod error;
