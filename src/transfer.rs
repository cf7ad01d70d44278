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

use std::{fs::{File, OpenOptions}, io::{Read, Seek, SeekFrom, Write}, path::{Path, PathBuf}, time::{SystemTime, UNIX_EPOCH}};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rustix::fs::Advice;
use snafu::{ResultExt, Snafu};

use crate::{AccessPattern, source::{ByteSource, SourceError}};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransferError {
	#[snafu(display("can't open file {}", path.display()))]
	OpenTarget { path: PathBuf, source: std::io::Error },
	#[snafu(display("can't get size of file {}", path.display()))]
	StatTarget { path: PathBuf, source: std::io::Error },
	#[snafu(display("error while writing file {}", path.display()))]
	WriteTarget { path: PathBuf, source: std::io::Error },
	#[snafu(display("short write to file {}", path.display()))]
	ShortWrite { path: PathBuf },
	#[snafu(display("error while reading file {}", path.display()))]
	ReadTarget { path: PathBuf, source: std::io::Error },
	#[snafu(display("error while seeking in file {}", path.display()))]
	SeekTarget { path: PathBuf, source: std::io::Error },
	#[snafu(context(false), display("{source}"))]
	Source { source: SourceError },
}

impl TransferError {
	/// Process exit code for this failure class; the exit status is the
	/// worker's only channel back to the orchestrator.
	pub fn exit_code(&self) -> u8 {
		match self {
			Self::OpenTarget { .. } => 4,
			Self::StatTarget { .. } => 5,
			Self::WriteTarget { .. }
			| Self::ShortWrite { .. }
			| Self::ReadTarget { .. }
			| Self::SeekTarget { .. } => 6,
			Self::Source { source } => source.exit_code(),
		}
	}
}

/// Largest block extent a single generator draw can cover.
pub const GENERATOR_MAX: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAddress {
	/// Seek to `index * block_size` from the start of the file.
	Absolute(u64),
	/// Seek forward by `index * block_size` from the current position.
	Relative(u64),
}

/// Picks the block an operation lands on. Extents within the generator's
/// range get a modulo-selected absolute index; beyond it a single draw
/// cannot address every block, so the seek degrades to cursor-relative.
/// Known accuracy limitation on very large files: the relative branch no
/// longer samples offsets uniformly.
pub fn choose_block<R: Rng>(extent: u64, rng: &mut R) -> BlockAddress {
	debug_assert!(extent > 0);
	let index = u64::from(rng.random::<u32>()) % extent;
	if extent > GENERATOR_MAX {
		BlockAddress::Relative(index)
	} else {
		BlockAddress::Absolute(index)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
	/// Whole blocks transferred (for random reads: operations performed).
	pub blocks: u64,
	pub bytes:  u64,
}

/// Per-worker transfer state: the open target, one reusable block buffer
/// and a generator seeded from the wall clock once per process.
#[derive(Debug)]
pub struct TransferSession {
	target:     File,
	path:       PathBuf,
	block_size: usize,
	pattern:    AccessPattern,
	buf:        Vec<u8>,
	rng:        StdRng,
}

impl TransferSession {
	pub fn open_write(
		path: impl Into<PathBuf>,
		block_size: u64,
		pattern: AccessPattern,
	) -> Result<Self, TransferError> {
		let path = path.into();
		let target = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&path)
			.context(OpenTargetSnafu { path: path.clone() })?;
		Ok(Self::new(target, path, block_size, pattern))
	}

	pub fn open_read(
		path: impl Into<PathBuf>,
		block_size: u64,
		pattern: AccessPattern,
	) -> Result<Self, TransferError> {
		let path = path.into();
		let target = File::open(&path).context(OpenTargetSnafu { path: path.clone() })?;
		let advice =
			if pattern.is_random() { Advice::Random } else { Advice::Sequential };
		// Advisory only; a refused fadvise must not fail the session.
		let _ = rustix::fs::fadvise(&target, 0, 0, advice);
		Ok(Self::new(target, path, block_size, pattern))
	}

	fn new(target: File, path: PathBuf, block_size: u64, pattern: AccessPattern) -> Self {
		Self {
			target,
			path,
			block_size: block_size as usize,
			pattern,
			buf: vec![0u8; block_size as usize],
			rng: StdRng::seed_from_u64(clock_seed()),
		}
	}

	pub fn path(&self) -> &Path { &self.path }

	/// Writes `count` blocks pulled from `source`. Sequential sessions rely
	/// on the advancing cursor; random sessions seek before every block,
	/// with `count` as the extent. A short source read or short write aborts
	/// the session immediately.
	pub fn write_from(
		&mut self,
		source: &mut ByteSource,
		count: u64,
	) -> Result<TransferReport, TransferError> {
		let mut bytes = 0u64;
		for _ in 0..count {
			if self.pattern.is_random() {
				let addr = choose_block(count, &mut self.rng);
				self.seek_to(addr)?;
			}
			source.fill(&mut self.buf)?;
			let put = self
				.target
				.write(&self.buf)
				.context(WriteTargetSnafu { path: self.path.clone() })?;
			if put != self.block_size {
				return ShortWriteSnafu { path: self.path.clone() }.fail();
			}
			bytes += put as u64;
		}
		Ok(TransferReport { blocks: count, bytes })
	}

	pub fn read_all(&mut self) -> Result<TransferReport, TransferError> {
		match self.pattern {
			AccessPattern::Sequential => self.read_sequential(),
			AccessPattern::Random => self.read_random(),
		}
	}

	/// The first short read (including zero) is the normal end of stream;
	/// only an OS-level read failure is an error.
	fn read_sequential(&mut self) -> Result<TransferReport, TransferError> {
		let mut blocks = 0u64;
		let mut bytes = 0u64;
		loop {
			let got = self
				.target
				.read(&mut self.buf)
				.context(ReadTargetSnafu { path: self.path.clone() })?;
			bytes += got as u64;
			if got < self.block_size {
				break;
			}
			blocks += 1;
		}
		Ok(TransferReport { blocks, bytes })
	}

	/// Runs for exactly `file_size / block_size` operations no matter where
	/// each read lands; hitting end of file rewinds to the start instead of
	/// terminating the session.
	fn read_random(&mut self) -> Result<TransferReport, TransferError> {
		let len = self
			.target
			.metadata()
			.context(StatTargetSnafu { path: self.path.clone() })?
			.len();
		let extent = len / self.block_size as u64;
		let mut bytes = 0u64;
		for _ in 0..extent {
			let addr = choose_block(extent, &mut self.rng);
			self.seek_to(addr)?;
			let got = self
				.target
				.read(&mut self.buf)
				.context(ReadTargetSnafu { path: self.path.clone() })?;
			if got == 0 {
				self.target
					.seek(SeekFrom::Start(0))
					.context(SeekTargetSnafu { path: self.path.clone() })?;
			}
			bytes += got as u64;
		}
		Ok(TransferReport { blocks: extent, bytes })
	}

	fn seek_to(&mut self, addr: BlockAddress) -> Result<(), TransferError> {
		let pos = match addr {
			BlockAddress::Absolute(index) => SeekFrom::Start(index * self.block_size as u64),
			BlockAddress::Relative(index) => {
				SeekFrom::Current((index * self.block_size as u64) as i64)
			}
		};
		self.target.seek(pos).context(SeekTargetSnafu { path: self.path.clone() })?;
		Ok(())
	}
}

fn clock_seed() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn payload(dir: &Path, len: usize) -> PathBuf {
		let path = dir.join("payload");
		std::fs::write(&path, vec![0xA5u8; len]).unwrap();
		path
	}

	#[test]
	fn choose_block_stays_in_extent() {
		let mut rng = StdRng::seed_from_u64(1);
		for _ in 0..1000 {
			match choose_block(16, &mut rng) {
				BlockAddress::Absolute(i) => assert!(i < 16),
				BlockAddress::Relative(_) => panic!("small extent must seek absolutely"),
			}
		}
	}

	#[test]
	fn choose_block_falls_back_past_generator_range() {
		let mut rng = StdRng::seed_from_u64(1);
		for _ in 0..1000 {
			match choose_block(GENERATOR_MAX + 2, &mut rng) {
				BlockAddress::Relative(i) => assert!(i <= GENERATOR_MAX),
				BlockAddress::Absolute(_) => panic!("huge extent must seek relatively"),
			}
		}
	}

	#[test]
	fn sequential_write_then_read_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let src_path = payload(dir.path(), 4096);
		let target = dir.path().join("target.bin");

		let mut session =
			TransferSession::open_write(&target, 512, AccessPattern::Sequential).unwrap();
		let mut source = ByteSource::open(&src_path).unwrap();
		let wrote = session.write_from(&mut source, 8).unwrap();
		assert_eq!(wrote, TransferReport { blocks: 8, bytes: 4096 });
		drop(session);
		assert_eq!(std::fs::metadata(&target).unwrap().len(), 4096);

		let mut session =
			TransferSession::open_read(&target, 512, AccessPattern::Sequential).unwrap();
		let read = session.read_all().unwrap();
		assert_eq!(read.blocks, 8);
		assert_eq!(read.bytes, 4096);
	}

	#[test]
	fn sequential_read_stops_at_first_short_read() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("ragged.bin");
		std::fs::write(&target, vec![1u8; 1000]).unwrap();

		let mut session =
			TransferSession::open_read(&target, 512, AccessPattern::Sequential).unwrap();
		let read = session.read_all().unwrap();
		assert_eq!(read.blocks, 1);
		assert_eq!(read.bytes, 1000);
	}

	#[test]
	fn random_read_runs_for_the_whole_extent() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("extent.bin");
		std::fs::write(&target, vec![2u8; 8192]).unwrap();

		let mut session =
			TransferSession::open_read(&target, 512, AccessPattern::Random).unwrap();
		let read = session.read_all().unwrap();
		assert_eq!(read.blocks, 16);
		assert_eq!(read.bytes, 8192);
	}

	#[test]
	fn random_read_of_sub_block_file_does_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("tiny.bin");
		std::fs::write(&target, vec![3u8; 100]).unwrap();

		let mut session =
			TransferSession::open_read(&target, 512, AccessPattern::Random).unwrap();
		let read = session.read_all().unwrap();
		assert_eq!(read, TransferReport { blocks: 0, bytes: 0 });
	}

	#[test]
	fn random_write_never_exceeds_its_extent() {
		let dir = tempfile::tempdir().unwrap();
		let src_path = payload(dir.path(), 16 * 512);
		let target = dir.path().join("random.bin");

		let mut session =
			TransferSession::open_write(&target, 512, AccessPattern::Random).unwrap();
		let mut source = ByteSource::open(&src_path).unwrap();
		let wrote = session.write_from(&mut source, 8).unwrap();
		assert_eq!(wrote.blocks, 8);
		drop(session);

		let len = std::fs::metadata(&target).unwrap().len();
		assert_eq!(len % 512, 0);
		assert!(len > 0 && len <= 8 * 512);
	}

	#[test]
	fn exhausted_source_fails_with_source_code() {
		let dir = tempfile::tempdir().unwrap();
		let src_path = payload(dir.path(), 1024);
		let target = dir.path().join("truncated.bin");

		let mut session =
			TransferSession::open_write(&target, 512, AccessPattern::Sequential).unwrap();
		let mut source = ByteSource::open(&src_path).unwrap();
		let err = session.write_from(&mut source, 4).unwrap_err();
		// source exhaustion, not a write failure
		assert_eq!(err.exit_code(), 11);
	}

	#[test]
	fn missing_target_fails_open() {
		let err = TransferSession::open_read("/no/such/target", 512, AccessPattern::Sequential)
			.unwrap_err();
		assert_eq!(err.exit_code(), 4);
	}
}
