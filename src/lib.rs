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

use std::path::PathBuf;

use snafu::Snafu;
use strum_macros::{AsRefStr, EnumString};

use crate::readable_size::ReadableSize;

pub mod filebomb;
pub mod readable_size;
pub mod runner;
pub mod source;
pub mod system;
pub mod transfer;

/// Prefix of the per-worker files created inside the target folder. The
/// orchestrator regenerates the same paths for the write phase, the read
/// phase and cleanup, so no manifest is persisted.
pub const FILE_PREFIX: &str = "fsbench-";

pub const DEFAULT_BLOCK_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
pub enum AccessPattern {
	#[default]
	Sequential,
	Random,
}

impl AccessPattern {
	pub fn from_flag(randomly: bool) -> Self {
		if randomly { Self::Random } else { Self::Sequential }
	}

	pub fn is_random(self) -> bool { matches!(self, Self::Random) }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
	#[snafu(display("total size must be positive"))]
	ZeroSize,
	#[snafu(display("block size must be positive"))]
	ZeroBlockSize,
	#[snafu(display("processes count must be positive"))]
	ZeroWorkers,
}

/// One run of the benchmark, constructed once from the CLI and passed
/// explicitly to the orchestrator; nothing here mutates after parsing.
#[derive(Debug, Clone)]
pub struct BenchConfig {
	pub folder:     PathBuf,
	pub total_size: ReadableSize,
	pub block_size: u64,
	pub workers:    u32,
	pub pattern:    AccessPattern,
	pub keep_files: bool,
	pub source:     PathBuf,
	/// Overrides discovery of the worker binary next to the current
	/// executable; tests point this at the freshly built worker.
	pub worker_bin: Option<PathBuf>,
}

impl Default for BenchConfig {
	fn default() -> Self {
		Self {
			folder:     std::env::temp_dir().join("fsbench"),
			total_size: ReadableSize::mb(64),
			block_size: DEFAULT_BLOCK_SIZE,
			workers:    1,
			pattern:    AccessPattern::Sequential,
			keep_files: false,
			source:     PathBuf::from(source::DEFAULT_SOURCE),
			worker_bin: None,
		}
	}
}

impl BenchConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.total_size.as_bytes() == 0 {
			return Err(ConfigError::ZeroSize);
		}
		if self.block_size == 0 {
			return Err(ConfigError::ZeroBlockSize);
		}
		if self.workers == 0 {
			return Err(ConfigError::ZeroWorkers);
		}
		Ok(())
	}

	/// Blocks each worker transfers. Integer division twice: remainder bytes
	/// are not written at all, which keeps every worker's share identical.
	pub fn blocks_per_worker(&self) -> u64 {
		self.total_size.as_bytes() / u64::from(self.workers) / self.block_size
	}

	pub fn worker_file(&self, id: u32) -> PathBuf {
		self.folder.join(format!("{FILE_PREFIX}{id}.bin"))
	}

	pub fn task(&self, id: u32) -> WorkerTask {
		WorkerTask {
			file:       self.worker_file(id),
			block_size: self.block_size,
			blocks:     self.blocks_per_worker(),
			pattern:    self.pattern,
		}
	}
}

/// Per-phase, per-worker unit of work derived from the configuration.
#[derive(Debug, Clone)]
pub struct WorkerTask {
	pub file:       PathBuf,
	pub block_size: u64,
	pub blocks:     u64,
	pub pattern:    AccessPattern,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(total: u64, block: u64, workers: u32) -> BenchConfig {
		BenchConfig {
			total_size: ReadableSize(total),
			block_size: block,
			workers,
			..BenchConfig::default()
		}
	}

	#[test]
	fn partition_never_exceeds_total() {
		for (total, block, workers) in
			[(4096, 512, 2), (4097, 512, 2), (1 << 30, 4096, 7), (1000, 512, 3), (511, 512, 1)]
		{
			let cfg = config(total, block, workers);
			let written = u64::from(workers) * cfg.blocks_per_worker() * block;
			assert!(written <= total, "{total}/{block}/{workers} wrote {written}");
		}
	}

	#[test]
	fn partition_is_exact_division() {
		let cfg = config(4096, 512, 2);
		assert_eq!(cfg.blocks_per_worker(), 4);
	}

	#[test]
	fn worker_files_are_deterministic() {
		let cfg = config(4096, 512, 2);
		assert_eq!(cfg.worker_file(0), cfg.folder.join("fsbench-0.bin"));
		assert_eq!(cfg.worker_file(1), cfg.folder.join("fsbench-1.bin"));
	}

	#[test]
	fn validate_rejects_zero_inputs() {
		assert!(matches!(config(0, 512, 1).validate(), Err(ConfigError::ZeroSize)));
		assert!(matches!(config(4096, 0, 1).validate(), Err(ConfigError::ZeroBlockSize)));
		assert!(matches!(config(4096, 512, 0).validate(), Err(ConfigError::ZeroWorkers)));
		assert!(config(4096, 512, 1).validate().is_ok());
	}

	#[test]
	fn pattern_from_flag() {
		assert_eq!(AccessPattern::from_flag(false), AccessPattern::Sequential);
		assert_eq!(AccessPattern::from_flag(true), AccessPattern::Random);
		assert!(AccessPattern::Random.is_random());
	}
}
