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

//! Progress reporting seam between the engine and its host
//!
//! The coordinator drives a [`ProgressLogger`] from a single control flow;
//! implementations only need interior mutability, not cross-thread
//! coordination. Provided implementations:
//!
//! - [`StandardLogger`] - structured `tracing` lines
//! - [`ProgressBarLogger`] - an `indicatif` bar fed by progress ticks
//! - [`MemoryLogger`] - in-memory event recording for tests and tooling
//! - [`NullLogger`] - discards everything

use crate::configuration::Configuration;
use crate::launcher::StreamKind;
use fanout_core::EngineError;
use indicatif::ProgressBar;
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub trait ProgressLogger: Send + Sync {
  /// Announce the realized plan before any work starts.
  fn log_configuration(&self, configuration: &Configuration, batch_size: usize);

  /// Work is about to start on `total_items` items.
  fn log_start(&self, total_items: usize);

  /// `delta` further items finished processing.
  fn log_advance(&self, delta: usize);

  /// All work finished; `item_name` is the noun for the processed unit.
  fn log_finish(&self, item_name: &str);

  /// A per-item action failed and the error handler decided to continue.
  fn log_item_processing_failed(&self, item: &str, error: &EngineError);

  /// A worker process was started with the given command line.
  fn log_command_started(&self, command: &[String]);

  /// A worker process terminated; `exit_code` is `None` on signal death.
  fn log_command_finished(&self, exit_code: Option<i32>);

  /// A worker wrote bytes that are not progress symbols.
  fn log_unexpected_child_output(
    &self,
    index: usize,
    pid: Option<u32>,
    kind: StreamKind,
    chunk: &str,
    progress_symbol: char,
  );
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullLogger;

impl ProgressLogger for NullLogger {
  fn log_configuration(&self, _configuration: &Configuration, _batch_size: usize) {}
  fn log_start(&self, _total_items: usize) {}
  fn log_advance(&self, _delta: usize) {}
  fn log_finish(&self, _item_name: &str) {}
  fn log_item_processing_failed(&self, _item: &str, _error: &EngineError) {}
  fn log_command_started(&self, _command: &[String]) {}
  fn log_command_finished(&self, _exit_code: Option<i32>) {}
  fn log_unexpected_child_output(
    &self,
    _index: usize,
    _pid: Option<u32>,
    _kind: StreamKind,
    _chunk: &str,
    _progress_symbol: char,
  ) {
  }
}

/// Emits structured `tracing` events.
#[derive(Debug, Default)]
pub struct StandardLogger;

impl ProgressLogger for StandardLogger {
  fn log_configuration(&self, configuration: &Configuration, batch_size: usize) {
    info!(
      processes = configuration.number_of_processes(),
      segments = configuration.number_of_segments(),
      segment_size = configuration.segment_size(),
      batch_size,
      total_items = configuration.total_items(),
      "planned parallel execution"
    );
  }

  fn log_start(&self, total_items: usize) {
    info!(total_items, "started processing");
  }

  fn log_advance(&self, delta: usize) {
    debug!(delta, "progress");
  }

  fn log_finish(&self, item_name: &str) {
    info!(item_name, "finished processing");
  }

  fn log_item_processing_failed(&self, item: &str, error: &EngineError) {
    warn!(item, %error, "item processing failed");
  }

  fn log_command_started(&self, command: &[String]) {
    debug!(?command, "worker process started");
  }

  fn log_command_finished(&self, exit_code: Option<i32>) {
    debug!(?exit_code, "worker process finished");
  }

  fn log_unexpected_child_output(
    &self,
    index: usize,
    pid: Option<u32>,
    kind: StreamKind,
    chunk: &str,
    progress_symbol: char,
  ) {
    warn!(index, ?pid, %kind, chunk, %progress_symbol, "unexpected worker output");
  }
}

/// Renders progress as an `indicatif` bar.
///
/// The bar is created on `log_start` so its length matches the item count,
/// and torn down on `log_finish`.
pub struct ProgressBarLogger {
  bar: Mutex<Option<ProgressBar>>,
}

impl Default for ProgressBarLogger {
  fn default() -> Self {
    Self::new()
  }
}

impl ProgressBarLogger {
  pub fn new() -> Self {
    Self { bar: Mutex::new(None) }
  }

  fn bar(&self) -> Option<ProgressBar> {
    // Clones of a ProgressBar share the same underlying bar.
    self.bar.lock().ok().and_then(|guard| guard.clone())
  }
}

impl ProgressLogger for ProgressBarLogger {
  fn log_configuration(&self, configuration: &Configuration, batch_size: usize) {
    StandardLogger.log_configuration(configuration, batch_size);
  }

  fn log_start(&self, total_items: usize) {
    if let Ok(mut guard) = self.bar.lock() {
      *guard = Some(ProgressBar::new(total_items as u64));
    }
  }

  fn log_advance(&self, delta: usize) {
    if let Some(bar) = self.bar() {
      bar.inc(delta as u64);
    }
  }

  fn log_finish(&self, item_name: &str) {
    if let Ok(mut guard) = self.bar.lock() {
      if let Some(bar) = guard.take() {
        bar.finish_with_message(format!("processed all {item_name}"));
      }
    }
  }

  fn log_item_processing_failed(&self, item: &str, error: &EngineError) {
    match self.bar() {
      Some(bar) => bar.println(format!("failed to process {item}: {error}")),
      None => warn!(item, %error, "item processing failed"),
    }
  }

  fn log_command_started(&self, command: &[String]) {
    debug!(?command, "worker process started");
  }

  fn log_command_finished(&self, exit_code: Option<i32>) {
    debug!(?exit_code, "worker process finished");
  }

  fn log_unexpected_child_output(
    &self,
    index: usize,
    pid: Option<u32>,
    kind: StreamKind,
    chunk: &str,
    progress_symbol: char,
  ) {
    let line = format!(
      "worker {index} (pid {pid:?}) wrote unexpected bytes on {kind} \
       (progress symbol is {progress_symbol:?}): {chunk:?}"
    );
    match self.bar() {
      Some(bar) => bar.println(line),
      None => warn!("{line}"),
    }
  }
}

/// Every event a [`MemoryLogger`] records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggedEvent {
  Configuration {
    processes: usize,
    segments: usize,
    segment_size: usize,
    batch_size: usize,
    total_items: usize,
  },
  Start {
    total_items: usize,
  },
  Advance {
    delta: usize,
  },
  Finish {
    item_name: String,
  },
  ItemFailed {
    item: String,
    message: String,
  },
  CommandStarted {
    command: Vec<String>,
  },
  CommandFinished {
    exit_code: Option<i32>,
  },
  UnexpectedOutput {
    index: usize,
    pid: Option<u32>,
    kind: StreamKind,
    chunk: String,
  },
}

/// In-memory event recorder, in the spirit of an ETL process tracker.
#[derive(Debug, Default)]
pub struct MemoryLogger {
  events: Mutex<Vec<LoggedEvent>>,
}

impl MemoryLogger {
  pub fn new() -> Self {
    Self::default()
  }

  fn push(&self, event: LoggedEvent) {
    if let Ok(mut events) = self.events.lock() {
      events.push(event);
    }
  }

  /// Snapshot of everything recorded so far, in order.
  pub fn events(&self) -> Vec<LoggedEvent> {
    self.events.lock().map(|events| events.clone()).unwrap_or_default()
  }

  /// Sum of all `Advance` deltas.
  pub fn advance_total(&self) -> usize {
    self
      .events()
      .iter()
      .map(|event| match event {
        LoggedEvent::Advance { delta } => *delta,
        _ => 0,
      })
      .sum()
  }

  pub fn count_command_started(&self) -> usize {
    self.events().iter().filter(|e| matches!(e, LoggedEvent::CommandStarted { .. })).count()
  }

  pub fn count_command_finished(&self) -> usize {
    self.events().iter().filter(|e| matches!(e, LoggedEvent::CommandFinished { .. })).count()
  }
}

impl ProgressLogger for MemoryLogger {
  fn log_configuration(&self, configuration: &Configuration, batch_size: usize) {
    self.push(LoggedEvent::Configuration {
      processes: configuration.number_of_processes(),
      segments: configuration.number_of_segments(),
      segment_size: configuration.segment_size(),
      batch_size,
      total_items: configuration.total_items(),
    });
  }

  fn log_start(&self, total_items: usize) {
    self.push(LoggedEvent::Start { total_items });
  }

  fn log_advance(&self, delta: usize) {
    self.push(LoggedEvent::Advance { delta });
  }

  fn log_finish(&self, item_name: &str) {
    self.push(LoggedEvent::Finish { item_name: item_name.to_string() });
  }

  fn log_item_processing_failed(&self, item: &str, error: &EngineError) {
    self.push(LoggedEvent::ItemFailed { item: item.to_string(), message: error.to_string() });
  }

  fn log_command_started(&self, command: &[String]) {
    self.push(LoggedEvent::CommandStarted { command: command.to_vec() });
  }

  fn log_command_finished(&self, exit_code: Option<i32>) {
    self.push(LoggedEvent::CommandFinished { exit_code });
  }

  fn log_unexpected_child_output(
    &self,
    index: usize,
    pid: Option<u32>,
    kind: StreamKind,
    chunk: &str,
    _progress_symbol: char,
  ) {
    self.push(LoggedEvent::UnexpectedOutput { index, pid, kind, chunk: chunk.to_string() });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_logger_records_in_order() {
    let logger = MemoryLogger::new();
    logger.log_start(3);
    logger.log_advance(1);
    logger.log_advance(2);
    logger.log_finish("items");
    assert_eq!(
      logger.events(),
      vec![
        LoggedEvent::Start { total_items: 3 },
        LoggedEvent::Advance { delta: 1 },
        LoggedEvent::Advance { delta: 2 },
        LoggedEvent::Finish { item_name: "items".to_string() },
      ]
    );
    assert_eq!(logger.advance_total(), 3);
  }

  #[test]
  fn test_memory_logger_counts_worker_lifecycle() {
    let logger = MemoryLogger::new();
    logger.log_command_started(&["worker".to_string()]);
    logger.log_command_started(&["worker".to_string()]);
    logger.log_command_finished(Some(0));
    assert_eq!(logger.count_command_started(), 2);
    assert_eq!(logger.count_command_finished(), 1);
  }

  #[test]
  fn test_null_logger_is_silent() {
    // Just exercise every method; NullLogger must not panic on any of them.
    let logger = NullLogger;
    logger.log_start(1);
    logger.log_advance(1);
    logger.log_finish("items");
    logger.log_command_started(&[]);
    logger.log_command_finished(None);
    logger.log_unexpected_child_output(0, None, StreamKind::Err, "noise", '.');
  }

  #[test]
  fn test_progress_bar_logger_survives_advance_without_start() {
    let logger = ProgressBarLogger::new();
    logger.log_advance(1);
    logger.log_finish("items");
  }
}
