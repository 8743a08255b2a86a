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

//! Sequential batch consumption with hooks and tolerant item execution
//!
//! This is the single loop behind both roles: a worker process runs it with
//! progress going to stdout, the in-process degenerate mode runs it with
//! progress going straight to the logger. Items are processed strictly in
//! order; a failed item is delegated to the error handler and processing
//! continues.

use crate::chunked_items::ChunkedItems;
use crate::error_handler::ErrorHandler;
use crate::logger::ProgressLogger;
use crate::task::{TaskContext, TaskSet};
use fanout_core::{EngineResult, MAX_EXIT_CODE};
use std::io::Write;
use std::sync::Arc;

/// Where per-item progress goes.
pub enum ProgressEmitter {
  /// One progress symbol per item onto a byte sink (the worker role).
  Stream { writer: Box<dyn Write + Send>, symbol: char },
  /// One `log_advance` per item (the in-process role).
  Logger(Arc<dyn ProgressLogger>),
}

impl ProgressEmitter {
  pub fn stream(writer: Box<dyn Write + Send>, symbol: char) -> Self {
    Self::Stream { writer, symbol }
  }

  pub fn logger(logger: Arc<dyn ProgressLogger>) -> Self {
    Self::Logger(logger)
  }

  fn advance(&mut self) -> EngineResult<()> {
    match self {
      Self::Stream { writer, symbol } => {
        let mut encoded = [0u8; 4];
        writer.write_all(symbol.encode_utf8(&mut encoded).as_bytes())?;
        writer.flush()?;
        Ok(())
      }
      Self::Logger(logger) => {
        logger.log_advance(1);
        Ok(())
      }
    }
  }
}

/// Run every batch through its hooks and the per-item action.
///
/// Each attempted item emits exactly one progress tick, whether it succeeded
/// or its failure was absorbed by the error handler. Hook failures are not
/// absorbed; they propagate to the caller.
pub async fn process_batches(
  task: &dyn TaskSet,
  context: &TaskContext,
  error_handler: &dyn ErrorHandler,
  items: &ChunkedItems,
  progress: &mut ProgressEmitter,
) -> EngineResult<u8> {
  let mut exit_code: u64 = 0;

  for batch in items.batches() {
    let batch_context = task.run_before_batch(context, batch).await?;
    for item in batch {
      match task.run_single(context, item).await {
        Ok(()) => {}
        Err(error) => {
          exit_code +=
            u64::from(error_handler.handle_error(item, &error, context.logger.as_ref()));
        }
      }
      progress.advance()?;
    }
    task.run_after_batch(context, batch, batch_context).await?;
  }

  Ok(exit_code.min(MAX_EXIT_CODE) as u8)
}
