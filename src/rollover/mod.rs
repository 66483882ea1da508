//! Period rollover and recurring template materialization.

mod coordinator;
mod materialize;

pub use coordinator::{RolloverCoordinator, RolloverOutcome, RolloverStats};
pub use materialize::MaterializeStats;
