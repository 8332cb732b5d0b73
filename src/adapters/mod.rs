//! Concrete adapter implementations for ports.

pub mod csv_import_adapter;
pub mod ini_config_adapter;
pub mod sqlite_adapter;
