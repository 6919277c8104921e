//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive runtime
//! behavior and helpers to load configuration from disk.

mod load;
mod schema;

pub(crate) use load::{MAX_FFT_SIZE, MIN_FFT_SIZE, is_valid_fft_size};
pub use schema::*;
