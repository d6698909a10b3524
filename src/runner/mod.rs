//! Background maintenance for the buffer.

mod sweeper;

pub use sweeper::{InflightSweeper, SweeperHandle, MIN_SWEEP_INTERVAL};
