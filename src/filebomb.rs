//! Filebomb variant: hammers the filesystem with many small files instead
//! of streaming blocks through a few large ones. Reuses the byte source and
//! the fatal-on-short transfer contract, but there is no seeking and no
//! multi-phase timing here.

use std::{fs::{File, OpenOptions}, io::{Read, Write}, path::{Path, PathBuf}};

use snafu::ResultExt;
use tracing::warn;

use crate::{DEFAULT_BLOCK_SIZE, source::ByteSource, transfer::{OpenTargetSnafu, ReadTargetSnafu, ShortWriteSnafu, TransferError, WriteTargetSnafu}};

pub const DEFAULT_FILE_SIZE: u64 = 512;

#[derive(Debug, Clone)]
pub struct FilebombConfig {
	pub folder:    PathBuf,
	pub source:    PathBuf,
	pub file_size: u64,
	pub count:     u64,
}

/// Writes `count` files of `file_size` bytes each, named `<i>.bin`: one
/// source read and one write per file.
pub fn write_files(cfg: &FilebombConfig) -> Result<u64, TransferError> {
	let mut source = ByteSource::open(&cfg.source)?;
	let mut buf = vec![0u8; cfg.file_size as usize];
	for i in 0..cfg.count {
		let path = cfg.folder.join(format!("{i}.bin"));
		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&path)
			.context(OpenTargetSnafu { path: path.clone() })?;
		source.fill(&mut buf)?;
		let put = file.write(&buf).context(WriteTargetSnafu { path: path.clone() })?;
		if put != buf.len() {
			return ShortWriteSnafu { path }.fail();
		}
	}
	Ok(cfg.count)
}

/// Reads every regular file in the folder in block-sized chunks until its
/// short read. A file that refuses to open is skipped with a log line; a
/// hard read error aborts the run.
pub fn read_files(folder: &Path) -> Result<u64, TransferError> {
	let entries = std::fs::read_dir(folder)
		.context(OpenTargetSnafu { path: folder.to_path_buf() })?;
	let mut buf = vec![0u8; DEFAULT_BLOCK_SIZE as usize];
	let mut files = 0u64;
	for entry in entries {
		let Ok(entry) = entry else { continue };
		let path = entry.path();
		if !path.is_file() {
			continue;
		}
		let mut file = match File::open(&path) {
			Ok(f) => f,
			Err(e) => {
				warn!(file = %path.display(), error = %e, "can't open file, skipping");
				continue;
			}
		};
		loop {
			let got =
				file.read(&mut buf).context(ReadTargetSnafu { path: path.clone() })?;
			if got < buf.len() {
				break;
			}
		}
		files += 1;
	}
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn writes_count_files_of_requested_size() {
		let dir = tempfile::tempdir().unwrap();
		let payload = dir.path().join("payload");
		std::fs::write(&payload, vec![9u8; 5 * 256]).unwrap();
		let folder = dir.path().join("bomb");
		std::fs::create_dir(&folder).unwrap();

		let cfg = FilebombConfig {
			folder:    folder.clone(),
			source:    payload,
			file_size: 256,
			count:     5,
		};
		assert_eq!(write_files(&cfg).unwrap(), 5);
		for i in 0..5 {
			let len = std::fs::metadata(folder.join(format!("{i}.bin"))).unwrap().len();
			assert_eq!(len, 256);
		}
	}

	#[test]
	fn read_pass_visits_every_file() {
		let dir = tempfile::tempdir().unwrap();
		for i in 0..3 {
			std::fs::write(dir.path().join(format!("{i}.bin")), vec![1u8; 700]).unwrap();
		}
		assert_eq!(read_files(dir.path()).unwrap(), 3);
	}

	#[test]
	fn short_source_aborts_with_source_code() {
		let dir = tempfile::tempdir().unwrap();
		let payload = dir.path().join("payload");
		std::fs::write(&payload, vec![9u8; 100]).unwrap();

		let cfg = FilebombConfig {
			folder:    dir.path().to_path_buf(),
			source:    payload,
			file_size: 256,
			count:     2,
		};
		let err = write_files(&cfg).unwrap_err();
		assert_eq!(err.exit_code(), 11);
	}
}
