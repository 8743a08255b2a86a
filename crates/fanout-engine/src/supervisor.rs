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

//! Bounded pool of worker processes fed over stdin
//!
//! One worker consumes exactly one segment: the supervisor streams up to
//! `segment_size` items into its stdin, then closes the pipe, which is the
//! worker's end-of-work signal. Terminated workers are reaped eagerly so a
//! fresh worker can take the next segment. Worker output is pumped by
//! per-stream tasks into a channel the supervisor drains on every reap pass,
//! keeping all logger calls on the coordinator's single control flow.

use crate::launcher::{
  OutputCallback, ProcessLauncher, ProcessLauncherFactory, ProcessTick, StreamKind, WorkerCommand,
};
use crate::logger::ProgressLogger;
use async_trait::async_trait;
use fanout_core::{EngineError, EngineResult};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pause between reap passes while waiting for a pool slot or final drain.
const REAP_INTERVAL: Duration = Duration::from_millis(1);

const OUTPUT_BUFFER_SIZE: usize = 4096;

struct OutputChunk {
  index: usize,
  pid: Option<u32>,
  kind: StreamKind,
  bytes: Vec<u8>,
}

/// One live worker and the tasks pumping its output.
struct RunningChild {
  index: usize,
  pid: Option<u32>,
  child: Child,
  readers: Vec<JoinHandle<()>>,
}

/// The standard [`ProcessLauncher`]: a fixed-concurrency pool of OS worker
/// processes.
pub struct WorkerPool {
  command: WorkerCommand,
  logger: Arc<dyn ProgressLogger>,
  on_output: OutputCallback,
  tick: ProcessTick,
}

impl WorkerPool {
  pub fn new(
    command: WorkerCommand,
    logger: Arc<dyn ProgressLogger>,
    on_output: OutputCallback,
    tick: ProcessTick,
  ) -> Self {
    Self { command, logger, on_output, tick }
  }

  fn spawn_child(
    &self,
    index: usize,
    outputs: &UnboundedSender<OutputChunk>,
  ) -> EngineResult<(RunningChild, ChildStdin)> {
    let program = self
      .command
      .command
      .first()
      .ok_or_else(|| EngineError::InvalidConfiguration("worker command is empty".to_string()))?;

    let mut command = Command::new(program);
    command
      .args(&self.command.command[1..])
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(directory) = &self.command.working_directory {
      command.current_dir(directory);
    }
    if let Some(extra) = &self.command.extra_environment {
      command.envs(extra);
    }

    let mut child =
      command.spawn().map_err(|e| EngineError::Spawn(format!("{program}: {e}")))?;
    let pid = child.id();
    self.logger.log_command_started(&self.command.command);
    debug!(index, ?pid, "spawned worker process");

    let stdin = child
      .stdin
      .take()
      .ok_or_else(|| EngineError::Spawn("worker stdin was not piped".to_string()))?;

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
      readers.push(tokio::spawn(pump_stream(index, pid, StreamKind::Out, stdout, outputs.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
      readers.push(tokio::spawn(pump_stream(index, pid, StreamKind::Err, stderr, outputs.clone())));
    }

    Ok((RunningChild { index, pid, child, readers }, stdin))
  }

  /// Remove every terminated worker from the pool.
  ///
  /// The reader tasks of a reaped worker are awaited first so all of its
  /// output reaches the channel before "finished" is reported.
  async fn reap(&self, running: &mut Vec<RunningChild>) -> EngineResult<()> {
    let mut position = 0;
    while position < running.len() {
      match running[position].child.try_wait() {
        Ok(Some(status)) => {
          let mut finished = running.swap_remove(position);
          for reader in finished.readers.drain(..) {
            let _ = reader.await;
          }
          debug!(
            index = finished.index,
            pid = ?finished.pid,
            exit_code = ?status.code(),
            "worker process exited"
          );
          self.logger.log_command_finished(status.code());
        }
        Ok(None) => position += 1,
        Err(err) => return Err(EngineError::Io(format!("failed to poll worker: {err}"))),
      }
    }
    Ok(())
  }

  fn forward_output(&self, outputs: &mut UnboundedReceiver<OutputChunk>) {
    while let Ok(chunk) = outputs.try_recv() {
      (self.on_output)(chunk.index, chunk.pid, chunk.kind, &chunk.bytes);
    }
  }

  /// Reap until a pool slot frees up, then spawn the worker for the next
  /// segment and hand back its stdin.
  async fn acquire_sink(
    &self,
    running: &mut Vec<RunningChild>,
    index: usize,
    outputs_tx: &UnboundedSender<OutputChunk>,
    outputs_rx: &mut UnboundedReceiver<OutputChunk>,
  ) -> EngineResult<ChildStdin> {
    loop {
      self.forward_output(outputs_rx);
      self.reap(running).await?;
      (self.tick)();
      if running.len() < self.command.process_limit {
        let (child, stdin) = self.spawn_child(index, outputs_tx)?;
        running.push(child);
        return Ok(stdin);
      }
      tokio::time::sleep(REAP_INTERVAL).await;
    }
  }
}

#[async_trait]
impl ProcessLauncher for WorkerPool {
  async fn run(&mut self, items: Box<dyn Iterator<Item = String> + Send>) -> EngineResult<()> {
    let (outputs_tx, mut outputs_rx) = unbounded_channel();
    let mut running: Vec<RunningChild> = Vec::new();
    let mut sink: Option<ChildStdin> = None;
    // Items fed to the current worker, whether its pipe is still usable or not.
    let mut written = 0usize;
    // A dead segment swallows its remaining items instead of aborting the run.
    let mut discarding = false;
    let mut spawned = 0usize;

    for item in items {
      if item.contains('\n') {
        return Err(EngineError::InvalidItem(format!("item {item:?} contains a newline")));
      }

      if written == self.command.segment_size {
        // Closing stdin is the end-of-segment signal; the worker drains and exits.
        sink = None;
        discarding = false;
        written = 0;
      }

      if sink.is_none() && !discarding {
        let fresh =
          self.acquire_sink(&mut running, spawned, &outputs_tx, &mut outputs_rx).await?;
        spawned += 1;
        sink = Some(fresh);
      }

      if let Some(stdin) = sink.as_mut() {
        if let Err(err) = write_item(stdin, &item).await {
          warn!(%item, %err, "worker stdin closed early; dropping the rest of its segment");
          sink = None;
          discarding = true;
        }
      }
      written += 1;
    }

    drop(sink);

    loop {
      self.forward_output(&mut outputs_rx);
      self.reap(&mut running).await?;
      (self.tick)();
      if running.is_empty() {
        break;
      }
      tokio::time::sleep(REAP_INTERVAL).await;
    }
    self.forward_output(&mut outputs_rx);

    Ok(())
  }
}

async fn write_item(stdin: &mut ChildStdin, item: &str) -> std::io::Result<()> {
  stdin.write_all(item.as_bytes()).await?;
  stdin.write_all(b"\n").await?;
  Ok(())
}

async fn pump_stream<R>(
  index: usize,
  pid: Option<u32>,
  kind: StreamKind,
  mut stream: R,
  outputs: UnboundedSender<OutputChunk>,
) where
  R: AsyncRead + Unpin,
{
  let mut buffer = [0u8; OUTPUT_BUFFER_SIZE];
  loop {
    match stream.read(&mut buffer).await {
      Ok(0) => break,
      Ok(read) => {
        let chunk = OutputChunk { index, pid, kind, bytes: buffer[..read].to_vec() };
        if outputs.send(chunk).is_err() {
          break;
        }
      }
      Err(err) => {
        warn!(index, ?pid, %kind, %err, "failed to read worker output");
        break;
      }
    }
  }
}

/// Builds [`WorkerPool`] launchers.
#[derive(Debug, Default)]
pub struct WorkerPoolFactory;

impl ProcessLauncherFactory for WorkerPoolFactory {
  fn create(
    &self,
    command: WorkerCommand,
    logger: Arc<dyn ProgressLogger>,
    on_output: OutputCallback,
    tick: ProcessTick,
  ) -> Box<dyn ProcessLauncher> {
    Box::new(WorkerPool::new(command, logger, on_output, tick))
  }
}
