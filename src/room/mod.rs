//! Room state and lifecycle

pub mod registry;

pub use registry::RoomRegistry;
