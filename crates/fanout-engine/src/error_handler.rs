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

//! Per-item failure policy
//!
//! A failed item never aborts the worker loop; the handler decides what the
//! failure contributes to the worker exit code. Contributions are summed and
//! capped at 255 by the worker.

use crate::logger::ProgressLogger;
use fanout_core::EngineError;
use std::sync::Arc;

pub trait ErrorHandler: Send + Sync {
  /// Decide what a failed item contributes to the worker exit code.
  fn handle_error(&self, item: &str, error: &EngineError, logger: &dyn ProgressLogger) -> u32;
}

/// Counts every failure as one exit-code unit.
#[derive(Debug, Default)]
pub struct CountingErrorHandler;

impl ErrorHandler for CountingErrorHandler {
  fn handle_error(&self, _item: &str, _error: &EngineError, _logger: &dyn ProgressLogger) -> u32 {
    1
  }
}

/// Reports the failure to the logger before delegating to another handler.
pub struct LoggingErrorHandler {
  decorated: Arc<dyn ErrorHandler>,
}

impl LoggingErrorHandler {
  pub fn new(decorated: Arc<dyn ErrorHandler>) -> Self {
    Self { decorated }
  }

  /// The usual stack: log the failure, count it as one unit.
  pub fn counting() -> Self {
    Self::new(Arc::new(CountingErrorHandler))
  }
}

impl ErrorHandler for LoggingErrorHandler {
  fn handle_error(&self, item: &str, error: &EngineError, logger: &dyn ProgressLogger) -> u32 {
    logger.log_item_processing_failed(item, error);
    self.decorated.handle_error(item, error, logger)
  }
}
