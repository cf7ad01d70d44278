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

use std::{fs::File, io::Read, path::{Path, PathBuf}};

use snafu::{ResultExt, Snafu};

/// Default payload stream for the write phase; never exhausts.
pub const DEFAULT_SOURCE: &str = "/dev/urandom";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SourceError {
	#[snafu(display("can't open source {}", path.display()))]
	OpenSource { path: PathBuf, source: std::io::Error },
	#[snafu(display("error while reading source {}", path.display()))]
	ReadSource { path: PathBuf, source: std::io::Error },
	#[snafu(display("source {} returned fewer bytes than requested", path.display()))]
	SourceExhausted { path: PathBuf },
}

impl SourceError {
	pub fn exit_code(&self) -> u8 {
		match self {
			Self::OpenSource { .. } => 10,
			Self::ReadSource { .. } | Self::SourceExhausted { .. } => 11,
		}
	}
}

/// Payload byte stream for write sessions. One open descriptor, a read
/// cursor, no buffering of its own.
#[derive(Debug)]
pub struct ByteSource {
	file: File,
	path: PathBuf,
}

impl ByteSource {
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
		let path = path.into();
		let file = File::open(&path).context(OpenSourceSnafu { path: path.clone() })?;
		Ok(Self { file, path })
	}

	pub fn path(&self) -> &Path { &self.path }

	/// Fills the whole buffer from a single read. A short read is a caller
	/// visible failure, not a retry point: pointing the benchmark at a file
	/// smaller than the requested write volume must abort the worker rather
	/// than silently truncate its output.
	pub fn fill(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
		let got = self.file.read(buf).context(ReadSourceSnafu { path: self.path.clone() })?;
		if got != buf.len() {
			return SourceExhaustedSnafu { path: self.path.clone() }.fail();
		}
		Ok(())
	}
}
