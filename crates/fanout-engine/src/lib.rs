/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-dot-]browne[-at-]dwightjbrowne[-dot-]com
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

//! # fanout-engine
//!
//! Parallelization engine for batch command execution.
//!
//! A command's work items are distributed across a bounded pool of worker
//! processes. The coordinator role chunks the item stream into segments,
//! streams each segment into one worker's stdin, and reads progress symbols
//! back from worker stdout. The worker role consumes its segment in batches,
//! running the per-item action with pre/post hooks.
//!
//! The engine is assembled from injected capabilities:
//! - A [`TaskSet`] supplies the items, the per-item action, and the hooks
//! - A [`ProgressLogger`] receives configuration, progress, and worker events
//! - An [`ErrorHandler`] turns per-item failures into exit-code contributions
//! - A [`ChildCommandFactory`] and [`ProcessLauncherFactory`] own the process
//!   mechanics
//!
//! Frontends embed [`ParallelizationArgs`] in their own clap command and hand
//! the parsed value to [`ParallelExecutor::execute`].

pub mod chunked_items;
pub mod configuration;
pub mod demux;
pub mod error_handler;
pub mod executor;
pub mod input;
pub mod launcher;
pub mod logger;
pub mod supervisor;
pub mod task;
pub mod worker;

pub use chunked_items::ChunkedItems;
pub use configuration::{Configuration, default_process_count};
pub use demux::OutputDemultiplexer;
pub use error_handler::{CountingErrorHandler, ErrorHandler, LoggingErrorHandler};
pub use executor::{ExecutorBuilder, ParallelExecutor};
pub use input::ParallelizationArgs;
pub use launcher::{
  ChildCommandFactory, CurrentExeCommandFactory, OutputCallback, ProcessLauncher,
  ProcessLauncherFactory, ProcessTick, StreamKind, WorkerCommand,
};
pub use logger::{
  LoggedEvent, MemoryLogger, NullLogger, ProgressBarLogger, ProgressLogger, StandardLogger,
};
pub use supervisor::{WorkerPool, WorkerPoolFactory};
pub use task::{BatchContext, TaskContext, TaskSet};
pub use worker::{ProgressEmitter, process_batches};

// Re-export commonly used core types
pub use fanout_core::{EngineDefaults, EngineError, EngineResult};

pub mod prelude {
  pub use crate::{
    ChunkedItems,
    Configuration,
    CountingErrorHandler,
    EngineError,
    EngineResult,
    ErrorHandler,
    ExecutorBuilder,
    LoggingErrorHandler,
    MemoryLogger,
    NullLogger,
    ParallelExecutor,
    ParallelizationArgs,
    ProgressBarLogger,
    ProgressLogger,
    StandardLogger,
    TaskContext,
    TaskSet,
  };
}
