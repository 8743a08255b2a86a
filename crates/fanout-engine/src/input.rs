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

//! Per-invocation input shared by every parallelized command
//!
//! Frontends flatten [`ParallelizationArgs`] into their own clap command so
//! coordinator and worker invocations of the same binary parse identically.
//! The engine only ever reads this struct; it never parses arguments itself.

use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct ParallelizationArgs {
  /// Process a single item instead of fetching the whole list
  #[arg(value_name = "ITEM")]
  pub item: Option<String>,

  /// Maximum number of worker processes run concurrently
  #[arg(long, short = 'p')]
  pub processes: Option<usize>,

  /// Process all items in the current process, without spawning workers
  #[arg(long)]
  pub main_process: bool,

  /// Run as a worker consuming its items from stdin
  #[arg(long, hide = true)]
  pub child: bool,

  /// Number of items processed per batch inside a worker
  #[arg(long)]
  pub batch_size: Option<usize>,

  /// Number of items streamed to one worker process over its lifetime
  #[arg(long)]
  pub segment_size: Option<usize>,
}

impl ParallelizationArgs {
  pub fn is_child(&self) -> bool {
    self.child
  }

  /// A single explicit item, or an explicit `--main-process`, keeps the run
  /// in the current process.
  pub fn should_be_processed_in_main_process(&self) -> bool {
    self.main_process || self.item.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestCli {
    #[command(flatten)]
    args: ParallelizationArgs,
  }

  fn parse(argv: &[&str]) -> ParallelizationArgs {
    TestCli::try_parse_from(argv).unwrap().args
  }

  #[test]
  fn test_defaults_describe_a_plain_coordinator_run() {
    let args = parse(&["prog"]);
    assert!(!args.is_child());
    assert!(!args.should_be_processed_in_main_process());
    assert_eq!(args.item, None);
    assert_eq!(args.processes, None);
    assert_eq!(args.batch_size, None);
    assert_eq!(args.segment_size, None);
  }

  #[test]
  fn test_child_flag() {
    let args = parse(&["prog", "--child"]);
    assert!(args.is_child());
  }

  #[test]
  fn test_single_item_runs_in_main_process() {
    let args = parse(&["prog", "item42"]);
    assert_eq!(args.item.as_deref(), Some("item42"));
    assert!(args.should_be_processed_in_main_process());
  }

  #[test]
  fn test_main_process_flag() {
    let args = parse(&["prog", "--main-process"]);
    assert!(args.should_be_processed_in_main_process());
  }

  #[test]
  fn test_size_overrides() {
    let args =
      parse(&["prog", "-p", "4", "--batch-size", "10", "--segment-size", "25"]);
    assert_eq!(args.processes, Some(4));
    assert_eq!(args.batch_size, Some(10));
    assert_eq!(args.segment_size, Some(25));
  }
}
