pub mod cli;
pub mod config;
pub mod db;
pub mod devices;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod server;
pub mod sql_constants;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod test_utils;
