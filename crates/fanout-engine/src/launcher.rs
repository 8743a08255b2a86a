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

//! Seams around concrete process spawning
//!
//! The executor never talks to the OS directly; it asks a
//! [`ChildCommandFactory`] for the worker command line and a
//! [`ProcessLauncherFactory`] for something that can run it. The standard
//! implementations live in [`crate::supervisor`].

use crate::input::ParallelizationArgs;
use crate::logger::ProgressLogger;
use async_trait::async_trait;
use fanout_core::{EngineError, EngineResult};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Which child stream a chunk of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
  Out,
  Err,
}

impl fmt::Display for StreamKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StreamKind::Out => write!(f, "stdout"),
      StreamKind::Err => write!(f, "stderr"),
    }
  }
}

/// Raw child output: (child index, pid, stream, bytes as they arrived).
pub type OutputCallback = Arc<dyn Fn(usize, Option<u32>, StreamKind, &[u8]) + Send + Sync>;

/// Periodic bookkeeping hook, invoked on every reap pass of the supervisor.
pub type ProcessTick = Arc<dyn Fn() + Send + Sync>;

/// Everything a launcher needs to know about the workers it runs.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
  /// Program and arguments of one worker invocation.
  pub command: Vec<String>,

  /// Working directory for every worker; `None` inherits the coordinator's.
  pub working_directory: Option<PathBuf>,

  /// Environment overlaid on the inherited one; `None` means inherit only.
  pub extra_environment: Option<HashMap<String, String>>,

  /// Upper bound on concurrently live workers.
  pub process_limit: usize,

  /// Items streamed to one worker before its stdin is closed.
  pub segment_size: usize,
}

#[async_trait]
pub trait ProcessLauncher: Send {
  /// Stream every item to exactly one worker.
  ///
  /// Returns only after all spawned workers have terminated.
  async fn run(&mut self, items: Box<dyn Iterator<Item = String> + Send>) -> EngineResult<()>;
}

pub trait ProcessLauncherFactory: Send + Sync {
  fn create(
    &self,
    command: WorkerCommand,
    logger: Arc<dyn ProgressLogger>,
    on_output: OutputCallback,
    tick: ProcessTick,
  ) -> Box<dyn ProcessLauncher>;
}

pub trait ChildCommandFactory: Send + Sync {
  /// Materialize the worker command line for this coordinator invocation,
  /// including whatever flag switches the child into worker mode.
  fn create_child_command(&self, args: &ParallelizationArgs) -> EngineResult<Vec<String>>;
}

/// Re-invokes the current executable with caller-supplied arguments plus
/// `--child`, forwarding the per-invocation batch size.
pub struct CurrentExeCommandFactory {
  base_args: Vec<String>,
}

impl CurrentExeCommandFactory {
  /// `base_args` is everything between the executable and the engine flags,
  /// typically a subcommand name.
  pub fn new(base_args: Vec<String>) -> Self {
    Self { base_args }
  }
}

impl ChildCommandFactory for CurrentExeCommandFactory {
  fn create_child_command(&self, args: &ParallelizationArgs) -> EngineResult<Vec<String>> {
    let executable = std::env::current_exe()
      .map_err(|e| EngineError::Spawn(format!("cannot locate current executable: {e}")))?;

    let mut command = vec![executable.display().to_string()];
    command.extend(self.base_args.iter().cloned());
    command.push("--child".to_string());
    if let Some(batch_size) = args.batch_size {
      command.push("--batch-size".to_string());
      command.push(batch_size.to_string());
    }
    Ok(command)
  }
}
