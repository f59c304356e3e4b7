use std::time::Duration;

/// Maximum number of propagation passes a single `simulate` call performs.
pub const ITERATION_CAP: u64 = 10;

pub const NODE_WIDTH: f64 = 80.0;
pub const NODE_HEIGHT: f64 = 50.0;
pub const MOMENTARY_WIDTH: f64 = 100.0;
pub const DIGIT_HEIGHT: f64 = NODE_HEIGHT + 20.0;

/// Horizontal distance between a node's left edge and its input pins.
pub const PIN_OFFSET: f64 = 10.0;
/// Per-pin footprint used when sizing synthesized gates.
pub const PIN_SPACING: f64 = 25.0;

/// Where `combine` and `encapsulate` drop the gate they create.
pub const SYNTHESIZED_X: f64 = 100.0;
pub const SYNTHESIZED_Y: f64 = 100.0;

pub const DEFAULT_CLOCK_PERIOD: Duration = Duration::from_millis(100);
