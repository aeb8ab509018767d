//! Compute module - Dead-end memo, decoders and evolutionary search.

pub mod decoder;
pub mod evolution;
mod registry;

pub use decoder::{Decoded, Decoder, build_decoder, optimal_route};
pub use registry::*;
