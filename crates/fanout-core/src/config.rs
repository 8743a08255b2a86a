/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-dot-]browne[-at-]dwightjbrowne[-dot-]com
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

use crate::error::{EngineError, EngineResult};
use dotenvy::dotenv;
use std::env;

/// Operational defaults an executor starts from before per-invocation overrides
#[derive(Debug, Clone)]
pub struct EngineDefaults {
  /// Worker process count; `None` defers to the host's available parallelism
  pub processes: Option<usize>,

  /// Items handed to the per-item action between batch hooks
  pub batch_size: usize,

  /// Items streamed to one worker process before it is recycled
  pub segment_size: usize,

  /// Progress token a worker writes to stdout per processed item
  pub progress_symbol: String,
}

impl Default for EngineDefaults {
  fn default() -> Self {
    Self {
      processes: None,
      batch_size: crate::DEFAULT_BATCH_SIZE,
      segment_size: crate::DEFAULT_SEGMENT_SIZE,
      progress_symbol: crate::DEFAULT_PROGRESS_SYMBOL.to_string(),
    }
  }
}

impl EngineDefaults {
  /// Load defaults from environment variables
  pub fn from_env() -> EngineResult<Self> {
    dotenv().ok();

    let processes = match env::var("FANOUT_PROCESSES") {
      Ok(value) => Some(
        value
          .parse()
          .map_err(|_| EngineError::InvalidConfiguration("Invalid FANOUT_PROCESSES".to_string()))?,
      ),
      Err(_) => None,
    };

    let batch_size = env::var("FANOUT_BATCH_SIZE")
      .unwrap_or_else(|_| crate::DEFAULT_BATCH_SIZE.to_string())
      .parse()
      .map_err(|_| EngineError::InvalidConfiguration("Invalid FANOUT_BATCH_SIZE".to_string()))?;

    let segment_size = env::var("FANOUT_SEGMENT_SIZE")
      .unwrap_or_else(|_| crate::DEFAULT_SEGMENT_SIZE.to_string())
      .parse()
      .map_err(|_| EngineError::InvalidConfiguration("Invalid FANOUT_SEGMENT_SIZE".to_string()))?;

    let progress_symbol = env::var("FANOUT_PROGRESS_SYMBOL")
      .unwrap_or_else(|_| crate::DEFAULT_PROGRESS_SYMBOL.to_string());

    Ok(EngineDefaults { processes, batch_size, segment_size, progress_symbol })
  }
}
