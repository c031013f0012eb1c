// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Wavenet Labs Inc.

//! Wavenet Mesh SDK Common Library
//!
//! This crate provides the types, error definitions, timing utilities and
//! logging infrastructure shared across the Wavenet mesh SDK crates.
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging support for embedded debugging
//!
//! # Security
//!
//! All sensitive data types implement `Zeroize` for secure memory cleanup.
//! No heap allocations are performed - all buffers use fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod errors;
pub mod log;
pub mod time;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, Result};
pub use time::{TickSource, Ticks};
pub use types::*;
