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

//! Executor façade: role dispatch and wiring
//!
//! One [`ParallelExecutor`] serves both roles. A coordinator invocation
//! fetches items, plans the configuration, and either runs everything
//! in-process or hands the item stream to a worker pool. A `--child`
//! invocation reads its segment from stdin and runs the worker loop.
//!
//! Executors are assembled by [`ExecutorBuilder`], which owns the invariant
//! checks: sizes at least one, progress symbol exactly one code point.

use crate::chunked_items::ChunkedItems;
use crate::configuration::Configuration;
use crate::demux::OutputDemultiplexer;
use crate::error_handler::{ErrorHandler, LoggingErrorHandler};
use crate::input::ParallelizationArgs;
use crate::launcher::{
  ChildCommandFactory, CurrentExeCommandFactory, OutputCallback, ProcessLauncherFactory,
  ProcessTick, WorkerCommand,
};
use crate::logger::{ProgressLogger, StandardLogger};
use crate::supervisor::WorkerPoolFactory;
use crate::task::{TaskContext, TaskSet};
use crate::worker::{ProgressEmitter, process_batches};
use fanout_core::{EngineDefaults, EngineError, EngineResult};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

type ChildSource = Box<dyn BufRead + Send>;

/// Two-role executor for one parallelized command.
///
/// Built once, used for one [`execute`](Self::execute) invocation.
pub struct ParallelExecutor {
  task: Arc<dyn TaskSet>,
  error_handler: Arc<dyn ErrorHandler>,
  logger: Arc<dyn ProgressLogger>,
  processes: Option<usize>,
  batch_size: usize,
  segment_size: usize,
  progress_symbol: char,
  working_directory: Option<PathBuf>,
  extra_environment: Option<HashMap<String, String>>,
  launcher_factory: Arc<dyn ProcessLauncherFactory>,
  child_command_factory: Arc<dyn ChildCommandFactory>,
  process_tick: ProcessTick,
  child_source: Mutex<Option<ChildSource>>,
}

impl ParallelExecutor {
  pub fn builder(task: Arc<dyn TaskSet>) -> ExecutorBuilder {
    ExecutorBuilder::new(task)
  }

  /// Run the command described by `args` and return its exit code.
  pub async fn execute(&self, args: &ParallelizationArgs) -> EngineResult<u8> {
    let context = TaskContext { args: args.clone(), logger: Arc::clone(&self.logger) };

    if args.is_child() {
      return self.run_as_worker(&context, args).await;
    }

    self.task.run_before_first_command(&context).await?;

    let batch_size = self.effective_batch_size(args)?;
    let segment_size = self.effective_segment_size(args)?;

    let items = match &args.item {
      Some(item) => ChunkedItems::from_item(item.clone(), batch_size)?,
      None => ChunkedItems::from_items(self.task.fetch_items(&context).await?, batch_size)?,
    };
    let total_items = items.total_items();

    let configuration = Configuration::plan(
      !args.should_be_processed_in_main_process(),
      total_items,
      args.processes.or(self.processes),
      segment_size,
    );
    self.logger.log_configuration(&configuration, batch_size);
    self.logger.log_start(total_items);

    let exit_code = if total_items == 0 {
      0
    } else if configuration.should_spawn_children() {
      self.run_with_workers(args, &configuration, items).await?;
      // Per-worker exit codes surface through the logger, not the
      // coordinator's own code.
      0
    } else {
      let mut progress = ProgressEmitter::logger(Arc::clone(&self.logger));
      process_batches(
        self.task.as_ref(),
        &context,
        self.error_handler.as_ref(),
        &items,
        &mut progress,
      )
      .await?
    };

    self.logger.log_finish(&self.task.item_name(total_items));
    self.task.run_after_last_command(&context).await?;

    Ok(exit_code)
  }

  async fn run_with_workers(
    &self,
    args: &ParallelizationArgs,
    configuration: &Configuration,
    items: ChunkedItems,
  ) -> EngineResult<()> {
    let command = self.child_command_factory.create_child_command(args)?;
    let demux =
      Arc::new(OutputDemultiplexer::new(self.progress_symbol, Arc::clone(&self.logger)));
    let on_output: OutputCallback =
      Arc::new(move |index, pid, kind, chunk| demux.dispatch(index, pid, kind, chunk));

    let mut launcher = self.launcher_factory.create(
      WorkerCommand {
        command,
        working_directory: self.working_directory.clone(),
        extra_environment: self.extra_environment.clone(),
        process_limit: configuration.number_of_processes(),
        segment_size: configuration.segment_size(),
      },
      Arc::clone(&self.logger),
      on_output,
      Arc::clone(&self.process_tick),
    );
    launcher.run(Box::new(items.into_items())).await
  }

  /// The worker role: consume one segment from the source stream.
  ///
  /// Coordinator-only hooks and logging do not run here; the parent observes
  /// this process only through its progress symbols and exit code.
  async fn run_as_worker(
    &self,
    context: &TaskContext,
    args: &ParallelizationArgs,
  ) -> EngineResult<u8> {
    let batch_size = self.effective_batch_size(args)?;

    let source = self.child_source.lock().await.take();
    let items = match source {
      Some(reader) => ChunkedItems::from_reader(reader, batch_size)?,
      None => ChunkedItems::from_reader(BufReader::new(io::stdin()), batch_size)?,
    };

    let mut progress = ProgressEmitter::stream(Box::new(io::stdout()), self.progress_symbol);
    process_batches(
      self.task.as_ref(),
      context,
      self.error_handler.as_ref(),
      &items,
      &mut progress,
    )
    .await
  }

  fn effective_batch_size(&self, args: &ParallelizationArgs) -> EngineResult<usize> {
    let batch_size = args.batch_size.unwrap_or(self.batch_size);
    if batch_size == 0 {
      return Err(EngineError::InvalidConfiguration("batch size must be at least 1".to_string()));
    }
    Ok(batch_size)
  }

  fn effective_segment_size(&self, args: &ParallelizationArgs) -> EngineResult<usize> {
    let segment_size = args.segment_size.unwrap_or(self.segment_size);
    if segment_size == 0 {
      return Err(EngineError::InvalidConfiguration(
        "segment size must be at least 1".to_string(),
      ));
    }
    Ok(segment_size)
  }
}

/// Assembles a [`ParallelExecutor`], validating the invariants the engine
/// relies on later.
pub struct ExecutorBuilder {
  task: Arc<dyn TaskSet>,
  error_handler: Arc<dyn ErrorHandler>,
  logger: Arc<dyn ProgressLogger>,
  processes: Option<usize>,
  batch_size: usize,
  segment_size: usize,
  progress_symbol: String,
  working_directory: Option<PathBuf>,
  extra_environment: Option<HashMap<String, String>>,
  launcher_factory: Arc<dyn ProcessLauncherFactory>,
  child_command_factory: Arc<dyn ChildCommandFactory>,
  process_tick: ProcessTick,
  child_source: Option<ChildSource>,
}

impl ExecutorBuilder {
  pub fn new(task: Arc<dyn TaskSet>) -> Self {
    Self::with_defaults(task, EngineDefaults::default())
  }

  /// Like [`new`](Self::new), seeded from `FANOUT_*` environment variables.
  pub fn from_env(task: Arc<dyn TaskSet>) -> EngineResult<Self> {
    Ok(Self::with_defaults(task, EngineDefaults::from_env()?))
  }

  fn with_defaults(task: Arc<dyn TaskSet>, defaults: EngineDefaults) -> Self {
    Self {
      task,
      error_handler: Arc::new(LoggingErrorHandler::counting()),
      logger: Arc::new(StandardLogger),
      processes: defaults.processes,
      batch_size: defaults.batch_size,
      segment_size: defaults.segment_size,
      progress_symbol: defaults.progress_symbol,
      working_directory: None,
      extra_environment: None,
      launcher_factory: Arc::new(WorkerPoolFactory),
      child_command_factory: Arc::new(CurrentExeCommandFactory::new(Vec::new())),
      process_tick: Arc::new(|| {}),
      child_source: None,
    }
  }

  pub fn with_error_handler(mut self, error_handler: Arc<dyn ErrorHandler>) -> Self {
    self.error_handler = error_handler;
    self
  }

  pub fn with_logger(mut self, logger: Arc<dyn ProgressLogger>) -> Self {
    self.logger = logger;
    self
  }

  /// Worker process count used when the invocation does not pass one.
  pub fn with_processes(mut self, processes: usize) -> Self {
    self.processes = Some(processes);
    self
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size;
    self
  }

  pub fn with_segment_size(mut self, segment_size: usize) -> Self {
    self.segment_size = segment_size;
    self
  }

  pub fn with_progress_symbol(mut self, progress_symbol: impl Into<String>) -> Self {
    self.progress_symbol = progress_symbol.into();
    self
  }

  pub fn with_working_directory(mut self, working_directory: PathBuf) -> Self {
    self.working_directory = Some(working_directory);
    self
  }

  pub fn with_extra_environment(mut self, extra_environment: HashMap<String, String>) -> Self {
    self.extra_environment = Some(extra_environment);
    self
  }

  pub fn with_launcher_factory(mut self, launcher_factory: Arc<dyn ProcessLauncherFactory>) -> Self {
    self.launcher_factory = launcher_factory;
    self
  }

  pub fn with_child_command_factory(
    mut self,
    child_command_factory: Arc<dyn ChildCommandFactory>,
  ) -> Self {
    self.child_command_factory = child_command_factory;
    self
  }

  pub fn with_process_tick(mut self, process_tick: ProcessTick) -> Self {
    self.process_tick = process_tick;
    self
  }

  /// Byte source a worker reads its segment from; defaults to stdin.
  pub fn with_child_source(mut self, child_source: ChildSource) -> Self {
    self.child_source = Some(child_source);
    self
  }

  pub fn build(self) -> EngineResult<ParallelExecutor> {
    if self.batch_size == 0 {
      return Err(EngineError::InvalidConfiguration("batch size must be at least 1".to_string()));
    }
    if self.segment_size == 0 {
      return Err(EngineError::InvalidConfiguration(
        "segment size must be at least 1".to_string(),
      ));
    }

    let mut symbols = self.progress_symbol.chars();
    let progress_symbol = match (symbols.next(), symbols.next()) {
      (Some(symbol), None) => symbol,
      _ => {
        return Err(EngineError::InvalidConfiguration(format!(
          "progress symbol must be exactly one character, got {:?}",
          self.progress_symbol
        )));
      }
    };

    Ok(ParallelExecutor {
      task: self.task,
      error_handler: self.error_handler,
      logger: self.logger,
      processes: self.processes,
      batch_size: self.batch_size,
      segment_size: self.segment_size,
      progress_symbol,
      working_directory: self.working_directory,
      extra_environment: self.extra_environment,
      launcher_factory: self.launcher_factory,
      child_command_factory: self.child_command_factory,
      process_tick: self.process_tick,
      child_source: Mutex::new(self.child_source),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::logger::{LoggedEvent, MemoryLogger};
  use crate::task::BatchContext;
  use async_trait::async_trait;
  use std::io::Cursor;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Default)]
  struct CountingTask {
    items: Vec<String>,
    failing: Vec<String>,
    before_first: AtomicUsize,
    after_last: AtomicUsize,
    before_batch: AtomicUsize,
    after_batch: AtomicUsize,
  }

  impl CountingTask {
    fn with_items(names: &[&str]) -> Self {
      Self { items: names.iter().map(|s| s.to_string()).collect(), ..Self::default() }
    }
  }

  #[async_trait]
  impl TaskSet for CountingTask {
    async fn fetch_items(&self, _context: &TaskContext) -> EngineResult<Vec<String>> {
      Ok(self.items.clone())
    }

    async fn run_single(&self, _context: &TaskContext, item: &str) -> EngineResult<()> {
      if self.failing.iter().any(|f| f == item) {
        return Err(EngineError::ItemFailed(format!("cannot process {item}")));
      }
      Ok(())
    }

    async fn run_before_first_command(&self, _context: &TaskContext) -> EngineResult<()> {
      self.before_first.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    async fn run_after_last_command(&self, _context: &TaskContext) -> EngineResult<()> {
      self.after_last.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    async fn run_before_batch(
      &self,
      _context: &TaskContext,
      _batch: &[String],
    ) -> EngineResult<Option<BatchContext>> {
      self.before_batch.fetch_add(1, Ordering::SeqCst);
      Ok(None)
    }

    async fn run_after_batch(
      &self,
      _context: &TaskContext,
      _batch: &[String],
      _batch_context: Option<BatchContext>,
    ) -> EngineResult<()> {
      self.after_batch.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  fn main_process_args() -> ParallelizationArgs {
    ParallelizationArgs { main_process: true, ..ParallelizationArgs::default() }
  }

  #[tokio::test]
  async fn test_in_process_run_five_items() {
    let task = Arc::new(CountingTask::with_items(&["a", "b", "c", "d", "e"]));
    let logger = Arc::new(MemoryLogger::new());
    let executor = ExecutorBuilder::new(task.clone())
      .with_logger(logger.clone())
      .with_batch_size(2)
      .with_segment_size(2)
      .build()
      .unwrap();

    let code = executor.execute(&main_process_args()).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(task.before_first.load(Ordering::SeqCst), 1);
    assert_eq!(task.after_last.load(Ordering::SeqCst), 1);
    assert_eq!(task.before_batch.load(Ordering::SeqCst), 3);
    assert_eq!(task.after_batch.load(Ordering::SeqCst), 3);
    assert_eq!(logger.advance_total(), 5);

    let events = logger.events();
    assert!(matches!(
      events.first(),
      Some(LoggedEvent::Configuration { processes: 1, segments: 1, total_items: 5, .. })
    ));
    assert!(events.contains(&LoggedEvent::Start { total_items: 5 }));
    assert!(events.contains(&LoggedEvent::Finish { item_name: "items".to_string() }));
  }

  #[tokio::test]
  async fn test_in_process_failing_item_sets_exit_code() {
    let mut task = CountingTask::with_items(&["a", "b", "c"]);
    task.failing = vec!["b".to_string()];
    let logger = Arc::new(MemoryLogger::new());
    let executor = ExecutorBuilder::new(Arc::new(task))
      .with_logger(logger.clone())
      .with_batch_size(2)
      .build()
      .unwrap();

    let code = executor.execute(&main_process_args()).await.unwrap();

    assert_eq!(code, 1);
    assert_eq!(logger.advance_total(), 3);
    assert!(logger.events().iter().any(|e| matches!(e, LoggedEvent::ItemFailed { .. })));
  }

  #[tokio::test]
  async fn test_single_item_argument_short_circuits_fetch() {
    struct NoFetchTask;

    #[async_trait]
    impl TaskSet for NoFetchTask {
      async fn fetch_items(&self, _context: &TaskContext) -> EngineResult<Vec<String>> {
        panic!("fetch_items must not be called when an item is given");
      }

      async fn run_single(&self, _context: &TaskContext, _item: &str) -> EngineResult<()> {
        Ok(())
      }
    }

    let logger = Arc::new(MemoryLogger::new());
    let executor =
      ExecutorBuilder::new(Arc::new(NoFetchTask)).with_logger(logger.clone()).build().unwrap();

    let args =
      ParallelizationArgs { item: Some("one".to_string()), ..ParallelizationArgs::default() };
    let code = executor.execute(&args).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(logger.advance_total(), 1);
    assert!(logger.events().contains(&LoggedEvent::Finish { item_name: "item".to_string() }));
  }

  #[tokio::test]
  async fn test_zero_items_runs_hooks_and_exits_zero() {
    struct PanickingLauncherFactory;

    impl ProcessLauncherFactory for PanickingLauncherFactory {
      fn create(
        &self,
        _command: WorkerCommand,
        _logger: Arc<dyn ProgressLogger>,
        _on_output: OutputCallback,
        _tick: ProcessTick,
      ) -> Box<dyn crate::launcher::ProcessLauncher> {
        panic!("no launcher may be built for an empty item list");
      }
    }

    let task = Arc::new(CountingTask::with_items(&[]));
    let logger = Arc::new(MemoryLogger::new());
    let executor = ExecutorBuilder::new(task.clone())
      .with_logger(logger.clone())
      .with_launcher_factory(Arc::new(PanickingLauncherFactory))
      .build()
      .unwrap();

    // Spawn mode requested, but there is nothing to spawn for.
    let code = executor.execute(&ParallelizationArgs::default()).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(task.before_first.load(Ordering::SeqCst), 1);
    assert_eq!(task.after_last.load(Ordering::SeqCst), 1);
    assert!(logger.events().contains(&LoggedEvent::Start { total_items: 0 }));
  }

  #[tokio::test]
  async fn test_builder_processes_default_feeds_the_plan() {
    struct NoopLauncher;

    #[async_trait]
    impl crate::launcher::ProcessLauncher for NoopLauncher {
      async fn run(&mut self, items: Box<dyn Iterator<Item = String> + Send>) -> EngineResult<()> {
        let _ = items.count();
        Ok(())
      }
    }

    struct NoopLauncherFactory;

    impl ProcessLauncherFactory for NoopLauncherFactory {
      fn create(
        &self,
        _command: WorkerCommand,
        _logger: Arc<dyn ProgressLogger>,
        _on_output: OutputCallback,
        _tick: ProcessTick,
      ) -> Box<dyn crate::launcher::ProcessLauncher> {
        Box::new(NoopLauncher)
      }
    }

    let names: Vec<String> = (0..10).map(|i| format!("item-{i}")).collect();
    let slices: Vec<&str> = names.iter().map(String::as_str).collect();
    let task = Arc::new(CountingTask::with_items(&slices));
    let logger = Arc::new(MemoryLogger::new());
    let executor = ExecutorBuilder::new(task)
      .with_logger(logger.clone())
      .with_processes(3)
      .with_segment_size(2)
      .with_launcher_factory(Arc::new(NoopLauncherFactory))
      .build()
      .unwrap();

    let code = executor.execute(&ParallelizationArgs::default()).await.unwrap();

    assert_eq!(code, 0);
    assert!(matches!(
      logger.events().first(),
      Some(LoggedEvent::Configuration { processes: 3, segments: 5, .. })
    ));
  }

  #[tokio::test]
  async fn test_item_with_newline_fails_before_any_work() {
    let task = Arc::new(CountingTask::with_items(&["good", "bad\nitem"]));
    let executor = ExecutorBuilder::new(task.clone()).build().unwrap();

    let result = executor.execute(&main_process_args()).await;

    assert!(matches!(result, Err(EngineError::InvalidItem(_))));
    // The failure happened between the first and last hook.
    assert_eq!(task.before_first.load(Ordering::SeqCst), 1);
    assert_eq!(task.after_last.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_child_role_reads_segment_from_source() {
    let task = Arc::new(CountingTask::default());
    let executor = ExecutorBuilder::new(task.clone())
      .with_batch_size(2)
      .with_child_source(Box::new(Cursor::new(b"a\nb\nc\n".to_vec())))
      .build()
      .unwrap();

    let args = ParallelizationArgs { child: true, ..ParallelizationArgs::default() };
    let code = executor.execute(&args).await.unwrap();

    assert_eq!(code, 0);
    // Worker role: batch hooks run, run-level hooks stay silent.
    assert_eq!(task.before_batch.load(Ordering::SeqCst), 2);
    assert_eq!(task.after_batch.load(Ordering::SeqCst), 2);
    assert_eq!(task.before_first.load(Ordering::SeqCst), 0);
    assert_eq!(task.after_last.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_child_role_empty_stdin_exits_zero() {
    let task = Arc::new(CountingTask::default());
    let executor = ExecutorBuilder::new(task.clone())
      .with_child_source(Box::new(Cursor::new(Vec::new())))
      .build()
      .unwrap();

    let args = ParallelizationArgs { child: true, ..ParallelizationArgs::default() };
    let code = executor.execute(&args).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(task.before_batch.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_builder_rejects_zero_batch_size() {
    let result = ExecutorBuilder::new(Arc::new(CountingTask::default())).with_batch_size(0).build();
    assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
  }

  #[test]
  fn test_builder_rejects_zero_segment_size() {
    let result =
      ExecutorBuilder::new(Arc::new(CountingTask::default())).with_segment_size(0).build();
    assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
  }

  #[test]
  fn test_builder_rejects_multi_character_progress_symbol() {
    let result =
      ExecutorBuilder::new(Arc::new(CountingTask::default())).with_progress_symbol("..").build();
    assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
  }

  #[test]
  fn test_builder_rejects_empty_progress_symbol() {
    let result =
      ExecutorBuilder::new(Arc::new(CountingTask::default())).with_progress_symbol("").build();
    assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
  }

  #[test]
  fn test_builder_accepts_multi_byte_symbol() {
    let executor =
      ExecutorBuilder::new(Arc::new(CountingTask::default())).with_progress_symbol("•").build();
    assert!(executor.is_ok());
  }

  #[tokio::test]
  async fn test_invocation_override_beats_executor_default() {
    let task = Arc::new(CountingTask::with_items(&["a", "b", "c"]));
    let logger = Arc::new(MemoryLogger::new());
    let executor = ExecutorBuilder::new(task.clone())
      .with_logger(logger.clone())
      .with_batch_size(10)
      .build()
      .unwrap();

    let args = ParallelizationArgs {
      main_process: true,
      batch_size: Some(1),
      ..ParallelizationArgs::default()
    };
    executor.execute(&args).await.unwrap();

    // Batch size 1 means one before/after pair per item.
    assert_eq!(task.before_batch.load(Ordering::SeqCst), 3);
  }
}
