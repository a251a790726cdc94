//! Position tracking

pub mod manager;

pub use manager::{CloseEvent, ExitReason, Phase, Position, PositionStore, StrategyStats};
