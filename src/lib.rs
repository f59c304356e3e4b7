pub mod bits;
pub mod circuit_sim;
pub mod codec;
pub mod config;
pub mod geometry;
pub mod modules;
pub mod pieces;
pub mod signal;
pub mod truth_table;

mod circuit;
mod combine;
mod error;

pub use circuit::{Circuit, Connection, PieceId, Pin};
pub use combine::{DEFAULT_COMPOSITE_LABEL, DEFAULT_MODULE_LABEL};
pub use error::{Error, PinDirection, Result};
