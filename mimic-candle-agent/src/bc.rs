//! Behavior cloning (BC) agent implemented with candle.
mod base;
mod config;

pub use base::Bc;
pub use config::BcConfig;
