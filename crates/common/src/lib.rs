//! Error helpers shared by the nextcal crates.

pub mod error;

pub use error::FromMessage;
