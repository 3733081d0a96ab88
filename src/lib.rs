pub mod analyzers;
pub mod config;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod layout;
pub mod migrate;
pub mod output;
pub mod parser;
pub mod reading;
pub mod services;
pub mod store;
