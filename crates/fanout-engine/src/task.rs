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

//! User surface of the engine
//!
//! A [`TaskSet`] describes what to run: where the items come from, what to do
//! with each one, and the lifecycle hooks around batches and the whole run.
//! Hook defaults are no-ops, so a minimal task only implements
//! [`TaskSet::fetch_items`] and [`TaskSet::run_single`].

use crate::input::ParallelizationArgs;
use crate::logger::ProgressLogger;
use async_trait::async_trait;
use fanout_core::EngineResult;
use std::any::Any;
use std::sync::Arc;

/// Shared context handed to every task callback.
pub struct TaskContext {
  pub args: ParallelizationArgs,
  pub logger: Arc<dyn ProgressLogger>,
}

/// State produced by [`TaskSet::run_before_batch`] and handed back to
/// [`TaskSet::run_after_batch`], instead of stashing it on the task itself.
pub type BatchContext = Box<dyn Any + Send>;

#[async_trait]
pub trait TaskSet: Send + Sync {
  /// Produce the full item list. Invoked once per execution, coordinator only.
  async fn fetch_items(&self, context: &TaskContext) -> EngineResult<Vec<String>>;

  /// Execute the action for a single item.
  async fn run_single(&self, context: &TaskContext, item: &str) -> EngineResult<()>;

  /// Noun used when reporting completion, e.g. "file" / "files".
  fn item_name(&self, count: usize) -> String {
    if count == 1 { "item".to_string() } else { "items".to_string() }
  }

  /// Coordinator-only hook, before any item is dispatched.
  async fn run_before_first_command(&self, _context: &TaskContext) -> EngineResult<()> {
    Ok(())
  }

  /// Coordinator-only hook, after every worker has finished.
  async fn run_after_last_command(&self, _context: &TaskContext) -> EngineResult<()> {
    Ok(())
  }

  async fn run_before_batch(
    &self,
    _context: &TaskContext,
    _batch: &[String],
  ) -> EngineResult<Option<BatchContext>> {
    Ok(None)
  }

  async fn run_after_batch(
    &self,
    _context: &TaskContext,
    _batch: &[String],
    _batch_context: Option<BatchContext>,
  ) -> EngineResult<()> {
    Ok(())
  }
}
