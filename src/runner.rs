// Copyright 2024 Crrow <hahadaxigua@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright Crrow <hahadaxigua@gmail.com> and the FsBench contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark orchestration: partitions the workload across worker
//! processes, runs the write phase, forces durability, optionally drops the
//! page cache, runs the read phase and cleans up. Phases are strictly
//! sequential; workers within a phase run concurrently on disjoint files
//! and report back through their exit status alone.

use std::{path::{Path, PathBuf}, process::{Child, Command}, time::{Duration, Instant}};

use snafu::{ResultExt, Snafu};
use tracing::{debug, error, warn};

use crate::{BenchConfig, ConfigError, WorkerTask, system};

pub const WORKER_BIN: &str = "fsbench-worker";

#[derive(Debug, Snafu)]
pub enum RunError {
	#[snafu(context(false), display("{source}"))]
	Config { source: ConfigError },
	#[snafu(display("can't create folder {}", path.display()))]
	CreateFolder { path: PathBuf, source: std::io::Error },
	#[snafu(display("can't locate the worker binary"))]
	WorkerBinary { source: std::io::Error },
}

#[derive(Debug, Clone, Copy)]
pub struct BenchReport {
	/// Write phase wall clock, durability sync included.
	pub write:            Duration,
	pub read:             Duration,
	pub cleanup_failures: u32,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
	Write,
	Read,
}

pub fn run(cfg: &BenchConfig) -> Result<BenchReport, RunError> {
	cfg.validate()?;
	debug!(
		total = %cfg.total_size,
		block_size = cfg.block_size,
		workers = cfg.workers,
		pattern = cfg.pattern.as_ref(),
		"starting benchmark run"
	);
	if cfg.blocks_per_worker() == 0 {
		warn!(
			total = %cfg.total_size,
			block_size = cfg.block_size,
			workers = cfg.workers,
			"per-worker share is smaller than one block, workers will write nothing"
		);
	}
	std::fs::create_dir_all(&cfg.folder)
		.context(CreateFolderSnafu { path: cfg.folder.clone() })?;
	let worker_bin = match &cfg.worker_bin {
		Some(path) => path.clone(),
		None => locate_worker()?,
	};

	let mut write = run_phase(cfg, &worker_bin, Phase::Write);
	let synced = system::flush_to_stable_storage();
	debug!(sync_secs = synced.as_secs_f64(), "durability sync complete");
	write += synced;
	log_throughput("write", cfg, write);

	system::drop_page_cache();

	let read = run_phase(cfg, &worker_bin, Phase::Read);
	log_throughput("read", cfg, read);

	let cleanup_failures = if cfg.keep_files { 0 } else { cleanup(cfg) };
	Ok(BenchReport { write, read, cleanup_failures })
}

/// Launches one worker per id, then reaps them in launch order. The timer
/// brackets the whole launch+wait sequence and nothing else. A worker that
/// fails to launch is logged and skipped; its siblings keep running.
fn run_phase(cfg: &BenchConfig, worker_bin: &Path, phase: Phase) -> Duration {
	let start = Instant::now();
	let mut children: Vec<(u32, Option<Child>)> = Vec::with_capacity(cfg.workers as usize);
	for id in 0..cfg.workers {
		let task = cfg.task(id);
		match spawn_worker(worker_bin, &task, phase, &cfg.source) {
			Ok(child) => children.push((id, Some(child))),
			Err(e) => {
				error!(worker = id, error = %e, "launch of worker failed");
				children.push((id, None));
			}
		}
	}
	for (id, child) in &mut children {
		let Some(child) = child else { continue };
		match child.wait() {
			Ok(status) if status.success() => debug!(worker = *id, "worker finished"),
			Ok(status) => error!(
				worker = *id,
				code = status.code().unwrap_or(-1),
				class = describe_exit(status.code()),
				"worker failed"
			),
			Err(e) => error!(worker = *id, error = %e, "waiting for worker failed"),
		}
	}
	start.elapsed()
}

/// Arguments go across as a discrete vector, never one string that gets
/// re-split, so paths with spaces survive the process boundary.
fn spawn_worker(
	worker_bin: &Path,
	task: &WorkerTask,
	phase: Phase,
	source: &Path,
) -> std::io::Result<Child> {
	let mut cmd = Command::new(worker_bin);
	match phase {
		Phase::Write => {
			cmd.arg("write")
				.arg("--file")
				.arg(&task.file)
				.arg("--block-size")
				.arg(task.block_size.to_string())
				.arg("--count")
				.arg(task.blocks.to_string())
				.arg("--source")
				.arg(source);
		}
		Phase::Read => {
			cmd.arg("read")
				.arg("--file")
				.arg(&task.file)
				.arg("--block-size")
				.arg(task.block_size.to_string());
		}
	}
	if task.pattern.is_random() {
		cmd.arg("--randomly");
	}
	cmd.spawn()
}

fn cleanup(cfg: &BenchConfig) -> u32 {
	let mut failures = 0;
	for id in 0..cfg.workers {
		let path = cfg.worker_file(id);
		if let Err(e) = std::fs::remove_file(&path) {
			error!(file = %path.display(), error = %e, "can't remove benchmark file");
			failures += 1;
		}
	}
	failures
}

fn locate_worker() -> Result<PathBuf, RunError> {
	let exe = std::env::current_exe().context(WorkerBinarySnafu)?;
	Ok(exe.with_file_name(WORKER_BIN))
}

/// The exit status is the worker's whole report; decode it for the log
/// instead of parsing worker stderr.
fn describe_exit(code: Option<i32>) -> &'static str {
	match code {
		Some(2) => "missing argument",
		Some(3) => "invalid block size or count",
		Some(4) => "target open failure",
		Some(5) => "target stat failure",
		Some(6) => "target IO error",
		Some(10) => "source open failure",
		Some(11) => "source read failure",
		None => "killed by signal",
		Some(_) => "unknown failure",
	}
}

fn log_throughput(phase: &str, cfg: &BenchConfig, elapsed: Duration) {
	let bytes = u64::from(cfg.workers) * cfg.blocks_per_worker() * cfg.block_size;
	let secs = elapsed.as_secs_f64();
	if secs > 0.0 {
		debug!(phase, "throughput: {:.1} MiB/s", bytes as f64 / (1024.0 * 1024.0) / secs);
	}
}
