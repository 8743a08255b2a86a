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

//! Splitting worker output into progress ticks and unexpected noise
//!
//! Progress ticks and incidental writes share one byte stream; the symbol is
//! a single distinctive code point so the two can be separated without any
//! framing protocol. Counting is done on code points, which keeps multi-byte
//! symbols correct.

use crate::launcher::StreamKind;
use crate::logger::ProgressLogger;
use std::sync::Arc;

pub struct OutputDemultiplexer {
  progress_symbol: char,
  logger: Arc<dyn ProgressLogger>,
}

impl OutputDemultiplexer {
  pub fn new(progress_symbol: char, logger: Arc<dyn ProgressLogger>) -> Self {
    Self { progress_symbol, logger }
  }

  /// Classify one chunk of worker output and forward it to the logger.
  ///
  /// Stderr is always unexpected and never advances progress. On stdout,
  /// every progress symbol advances the counter; any other code point flags
  /// the whole chunk as unexpected.
  pub fn dispatch(&self, index: usize, pid: Option<u32>, kind: StreamKind, chunk: &[u8]) {
    let text = String::from_utf8_lossy(chunk);

    if kind == StreamKind::Err {
      self.logger.log_unexpected_child_output(index, pid, kind, &text, self.progress_symbol);
      return;
    }

    let ticks = text.chars().filter(|c| *c == self.progress_symbol).count();
    let length = text.chars().count();
    if ticks != length {
      self.logger.log_unexpected_child_output(index, pid, kind, &text, self.progress_symbol);
    }
    if ticks > 0 {
      self.logger.log_advance(ticks);
    }
  }
}
