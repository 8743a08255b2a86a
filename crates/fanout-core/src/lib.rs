/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! # fanout-core
//!
//! Core types, configuration, and error handling for the fanout engine.
//!
//! This crate provides the foundational components shared across all fanout crates:
//!
//! - [`EngineDefaults`] - Environment-driven operational defaults
//! - [`EngineError`] and [`EngineResult`] - Unified error handling
//!
//! ## Example
//!
//! ```
//! use fanout_core::EngineDefaults;
//!
//! let defaults = EngineDefaults::default();
//! assert_eq!(defaults.batch_size, fanout_core::DEFAULT_BATCH_SIZE);
//! ```

pub mod config;
pub mod error;
pub use config::EngineDefaults;
pub use error::{EngineError, EngineResult};

/// Items handed to a worker per batch unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Items streamed to one worker process before it is recycled, unless overridden.
pub const DEFAULT_SEGMENT_SIZE: usize = 50;

/// Character a worker writes to stdout for every processed item.
pub const DEFAULT_PROGRESS_SYMBOL: char = '.';

/// Upper bound on process exit codes; contributions are summed and capped here.
pub const MAX_EXIT_CODE: u64 = 255;
