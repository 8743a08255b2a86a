//! End-to-end coordinator runs against real worker processes.
//!
//! Workers are small `/bin/sh` scripts speaking the engine's wire protocol:
//! newline-delimited items on stdin, one progress dot per item on stdout.

#![cfg(unix)]

use anyhow::Result;
use async_trait::async_trait;
use fanout_engine::prelude::*;
use fanout_engine::{ChildCommandFactory, LoggedEvent, ProcessTick, StreamKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct ListedItems(Vec<String>);

#[async_trait]
impl TaskSet for ListedItems {
  async fn fetch_items(&self, _context: &TaskContext) -> EngineResult<Vec<String>> {
    Ok(self.0.clone())
  }

  async fn run_single(&self, _context: &TaskContext, _item: &str) -> EngineResult<()> {
    Ok(())
  }
}

struct ShellWorkerFactory(&'static str);

impl ChildCommandFactory for ShellWorkerFactory {
  fn create_child_command(&self, _args: &ParallelizationArgs) -> EngineResult<Vec<String>> {
    Ok(vec!["/bin/sh".to_string(), "-c".to_string(), self.0.to_string()])
  }
}

const TICKING_WORKER: &str = "while IFS= read -r _; do printf '.'; done";

fn init_tracing() {
  // Tests share one process; only the first initialization sticks.
  let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
}

fn listed(names: &[&str]) -> Arc<ListedItems> {
  Arc::new(ListedItems(names.iter().map(|s| s.to_string()).collect()))
}

#[tokio::test]
async fn five_items_two_workers_three_segments() -> Result<()> {
  init_tracing();
  let logger = Arc::new(MemoryLogger::new());
  let executor = ExecutorBuilder::new(listed(&["a", "b", "c", "d", "e"]))
    .with_logger(logger.clone())
    .with_segment_size(2)
    .with_child_command_factory(Arc::new(ShellWorkerFactory(TICKING_WORKER)))
    .build()?;

  let args = ParallelizationArgs { processes: Some(2), ..ParallelizationArgs::default() };
  let code = executor.execute(&args).await?;

  assert_eq!(code, 0);
  assert_eq!(logger.advance_total(), 5);
  assert_eq!(logger.count_command_started(), 3);
  assert_eq!(logger.count_command_finished(), 3);

  let events = logger.events();
  assert!(events.contains(&LoggedEvent::Start { total_items: 5 }));
  assert!(matches!(
    events.first(),
    Some(LoggedEvent::Configuration { processes: 2, segments: 3, segment_size: 2, .. })
  ));
  Ok(())
}

#[tokio::test]
async fn process_tick_fires_during_supervision() -> Result<()> {
  init_tracing();
  let ticks = Arc::new(AtomicUsize::new(0));
  let tick_counter = ticks.clone();
  let tick: ProcessTick = Arc::new(move || {
    tick_counter.fetch_add(1, Ordering::SeqCst);
  });

  let executor = ExecutorBuilder::new(listed(&["a", "b", "c"]))
    .with_logger(Arc::new(MemoryLogger::new()))
    .with_segment_size(1)
    .with_process_tick(tick)
    .with_child_command_factory(Arc::new(ShellWorkerFactory(TICKING_WORKER)))
    .build()?;

  executor.execute(&ParallelizationArgs::default()).await?;

  assert!(ticks.load(Ordering::SeqCst) >= 1);
  Ok(())
}

#[tokio::test]
async fn workers_run_in_the_configured_directory() -> Result<()> {
  init_tracing();
  let directory = tempfile::tempdir()?;
  // Drain stdin, then report the working directory as (unexpected) output.
  let script = "while IFS= read -r _; do :; done; printf '%s' \"$PWD\"";

  let logger = Arc::new(MemoryLogger::new());
  let executor = ExecutorBuilder::new(listed(&["a"]))
    .with_logger(logger.clone())
    .with_working_directory(directory.path().to_path_buf())
    .with_child_command_factory(Arc::new(ShellWorkerFactory(script)))
    .build()?;

  executor.execute(&ParallelizationArgs::default()).await?;

  let directory_name = directory
    .path()
    .file_name()
    .and_then(|name| name.to_str())
    .map(|name| name.to_string())
    .unwrap_or_default();
  let reported = logger.events().into_iter().find_map(|event| match event {
    LoggedEvent::UnexpectedOutput { kind: StreamKind::Out, chunk, .. } => Some(chunk),
    _ => None,
  });
  let reported = reported.expect("worker should have reported its working directory");
  assert!(
    reported.contains(&directory_name),
    "worker reported {reported:?}, expected it to contain {directory_name:?}"
  );
  Ok(())
}

#[tokio::test]
async fn crashing_workers_do_not_abort_the_coordinator() -> Result<()> {
  init_tracing();
  let logger = Arc::new(MemoryLogger::new());
  let executor = ExecutorBuilder::new(listed(&["a", "b", "c", "d"]))
    .with_logger(logger.clone())
    .with_segment_size(2)
    .with_child_command_factory(Arc::new(ShellWorkerFactory("exit 9")))
    .build()?;

  let args = ParallelizationArgs { processes: Some(1), ..ParallelizationArgs::default() };
  let code = executor.execute(&args).await?;

  // Spawn mode reports success through the coordinator; the failures are
  // visible as worker terminations.
  assert_eq!(code, 0);
  assert_eq!(logger.count_command_started(), 2);
  assert_eq!(logger.count_command_finished(), 2);
  assert!(logger
    .events()
    .iter()
    .any(|e| matches!(e, LoggedEvent::CommandFinished { exit_code: Some(9) })));
  Ok(())
}

#[tokio::test]
async fn requested_processes_beyond_segments_are_clamped() -> Result<()> {
  init_tracing();
  let logger = Arc::new(MemoryLogger::new());
  let executor = ExecutorBuilder::new(listed(&["a", "b", "c"]))
    .with_logger(logger.clone())
    .with_segment_size(10)
    .with_child_command_factory(Arc::new(ShellWorkerFactory(TICKING_WORKER)))
    .build()?;

  let args = ParallelizationArgs { processes: Some(8), ..ParallelizationArgs::default() };
  executor.execute(&args).await?;

  assert!(matches!(
    logger.events().first(),
    Some(LoggedEvent::Configuration { processes: 1, segments: 1, segment_size: 10, .. })
  ));
  assert_eq!(logger.count_command_started(), 1);
  assert_eq!(logger.advance_total(), 3);
  Ok(())
}
