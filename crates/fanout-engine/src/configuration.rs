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

//! Planning of the realized segment size and worker process count
//!
//! The segment size is the caller's throughput/latency dial and is never
//! silently reduced. The process count is clamped to the segment count so no
//! worker sits idle with nothing to consume.

use std::num::NonZeroUsize;

/// Operational plan for one execution: how many workers, fed how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
  should_spawn_children: bool,
  number_of_processes: usize,
  segment_size: usize,
  number_of_segments: usize,
  total_items: usize,
}

impl Configuration {
  /// Derive the plan from the problem size and the caller's requests.
  ///
  /// With `should_spawn_children` false this degenerates to a single
  /// in-process segment covering every item.
  pub fn plan(
    should_spawn_children: bool,
    total_items: usize,
    requested_processes: Option<usize>,
    desired_segment_size: usize,
  ) -> Self {
    if !should_spawn_children {
      return Self {
        should_spawn_children: false,
        number_of_processes: 1,
        segment_size: total_items.max(1),
        number_of_segments: 1,
        total_items,
      };
    }

    let number_of_segments = total_items.div_ceil(desired_segment_size).max(1);
    let requested = requested_processes.unwrap_or_else(default_process_count);
    let number_of_processes = requested.clamp(1, number_of_segments);

    Self {
      should_spawn_children: true,
      number_of_processes,
      segment_size: desired_segment_size,
      number_of_segments,
      total_items,
    }
  }

  pub fn should_spawn_children(&self) -> bool {
    self.should_spawn_children
  }

  pub fn number_of_processes(&self) -> usize {
    self.number_of_processes
  }

  pub fn segment_size(&self) -> usize {
    self.segment_size
  }

  pub fn number_of_segments(&self) -> usize {
    self.number_of_segments
  }

  pub fn total_items(&self) -> usize {
    self.total_items
  }
}

/// Process count used when the caller requests nothing explicit.
pub fn default_process_count() -> usize {
  std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}
