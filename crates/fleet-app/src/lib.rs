//! Application service layer - config, recorder, aggregator, pipeline, reports

pub mod app;
pub mod config;
pub mod repository;

pub use config::Config;
