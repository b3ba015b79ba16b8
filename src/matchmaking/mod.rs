//! Matchmaking core: pairing requesters with waiting users

pub mod matchmaker;

pub use matchmaker::{Matchmaker, MatchmakerStats};
