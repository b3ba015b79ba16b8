//! Metrics collection and exposure

pub mod collector;

pub use collector::MetricsCollector;
