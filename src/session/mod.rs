//! Live connection tracking and outbound event delivery

pub mod tracker;

pub use tracker::SessionTracker;
