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

//! Fixed-size batching over a materialized list of work items
//!
//! Items are opaque strings. A newline byte delimits items on the wire to
//! worker processes, so items are validated newline-free (and non-empty) when
//! this container is built. The item count is known up front; batch iteration
//! stays lazy.

use fanout_core::{EngineError, EngineResult};
use std::io::BufRead;

pub struct ChunkedItems {
  items: Vec<String>,
  batch_size: usize,
}

impl ChunkedItems {
  /// A single-item run: one batch of one item.
  pub fn from_item(item: String, batch_size: usize) -> EngineResult<Self> {
    Self::from_items(vec![item], batch_size)
  }

  /// Wrap an already-fetched item list.
  pub fn from_items(items: Vec<String>, batch_size: usize) -> EngineResult<Self> {
    validate_batch_size(batch_size)?;
    for item in &items {
      validate_item(item)?;
    }
    Ok(Self { items, batch_size })
  }

  /// Read newline-delimited items to EOF.
  ///
  /// The final record need not be newline-terminated. Empty lines are
  /// skipped, so a trailing newline does not produce a phantom item.
  pub fn from_reader<R: BufRead>(reader: R, batch_size: usize) -> EngineResult<Self> {
    validate_batch_size(batch_size)?;
    let mut items = Vec::new();
    for line in reader.lines() {
      let line = line?;
      if !line.is_empty() {
        items.push(line);
      }
    }
    Ok(Self { items, batch_size })
  }

  pub fn total_items(&self) -> usize {
    self.items.len()
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  /// Ordered batches of at most `batch_size` items; the tail may be partial.
  pub fn batches(&self) -> impl Iterator<Item = &[String]> {
    self.items.chunks(self.batch_size)
  }

  /// Flat view over the items, in order.
  pub fn items(&self) -> impl Iterator<Item = &str> {
    self.items.iter().map(String::as_str)
  }

  /// Consume the container into a flat item iterator.
  pub fn into_items(self) -> impl Iterator<Item = String> + Send {
    self.items.into_iter()
  }
}

fn validate_batch_size(batch_size: usize) -> EngineResult<()> {
  if batch_size == 0 {
    return Err(EngineError::InvalidConfiguration("batch size must be at least 1".to_string()));
  }
  Ok(())
}

pub(crate) fn validate_item(item: &str) -> EngineResult<()> {
  if item.is_empty() {
    return Err(EngineError::InvalidItem("items must not be empty".to_string()));
  }
  if item.contains('\n') {
    return Err(EngineError::InvalidItem(format!(
      "item {item:?} contains a newline; newlines delimit items on the worker wire"
    )));
  }
  Ok(())
}
