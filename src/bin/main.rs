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

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use fsbench::{AccessPattern, BenchConfig, DEFAULT_BLOCK_SIZE, filebomb, readable_size::ReadableSize, runner::{self, RunError}, source::DEFAULT_SOURCE};
use tracing_subscriber::EnvFilter;

/// Non-positive size, block size or worker count.
const EXIT_INVALID_CONFIG: u8 = 3;
/// Benchmark files could not all be deleted.
const EXIT_CLEANUP: u8 = 7;

#[derive(Debug, Parser)]
#[clap(name = "fsbench", about = "Filesystem IO benchmark harness", version)]
struct Cli {
	#[command(subcommand)]
	commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	Run(RunArgs),
	Filebomb(FilebombArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Time a write phase and then a read phase over parallel worker processes,
each moving blocks against its own file.
Examples:

fsbench run -f /tmp/bench -s 1G -b 4096 -p 4
fsbench run -f /tmp/bench -s 256M --randomly
")]
struct RunArgs {
	/// Folder to create benchmark files in
	#[arg(short, long)]
	folder:     PathBuf,
	/// Total size to write and then read back; accepts K/M/G suffixes
	#[arg(short, long)]
	size:       ReadableSize,
	/// Size of one block transfer in bytes
	#[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
	block_size: u64,
	/// Count of parallel worker processes
	#[arg(short, long, default_value_t = 1)]
	processes:  u32,
	/// Seek to a random block before every transfer
	#[arg(short, long)]
	randomly:   bool,
	/// Keep the generated files instead of deleting them
	#[arg(short, long)]
	keep_files: bool,
	/// Source of payload bytes for the write phase
	#[arg(long, default_value = DEFAULT_SOURCE)]
	source:     PathBuf,
}

impl RunArgs {
	fn run(self) -> ExitCode {
		let cfg = BenchConfig {
			folder:     self.folder,
			total_size: self.size,
			block_size: self.block_size,
			workers:    self.processes,
			pattern:    AccessPattern::from_flag(self.randomly),
			keep_files: self.keep_files,
			source:     self.source,
			worker_bin: None,
		};
		match runner::run(&cfg) {
			Ok(report) => {
				println!("Written in {:.3}", report.write.as_secs_f64());
				println!("Read in {:.3}", report.read.as_secs_f64());
				if report.cleanup_failures > 0 {
					return ExitCode::from(EXIT_CLEANUP);
				}
				ExitCode::SUCCESS
			}
			Err(e @ RunError::Config { .. }) => {
				eprintln!("{e}. See help");
				ExitCode::from(EXIT_INVALID_CONFIG)
			}
			Err(e) => {
				eprintln!("{e}");
				ExitCode::FAILURE
			}
		}
	}
}

#[derive(Debug, Clone, Args)]
struct FilebombArgs {
	#[command(subcommand)]
	commands: FilebombCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum FilebombCommands {
	Write(FilebombWriteArgs),
	Read(FilebombReadArgs),
}

impl FilebombArgs {
	fn run(self) -> ExitCode {
		match self.commands {
			FilebombCommands::Write(wa) => wa.run(),
			FilebombCommands::Read(ra) => ra.run(),
		}
	}
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Write lots of small files into a folder.
Examples:

fsbench filebomb write -f /tmp/bomb -c 10000
")]
struct FilebombWriteArgs {
	/// Folder to write files into
	#[arg(short, long)]
	folder:    PathBuf,
	/// Size of each file in bytes
	#[arg(short = 'b', long, default_value_t = filebomb::DEFAULT_FILE_SIZE)]
	file_size: u64,
	/// Count of files to write
	#[arg(short, long)]
	count:     u64,
	/// Source of payload bytes
	#[arg(short, long, default_value = DEFAULT_SOURCE)]
	source:    PathBuf,
}

impl FilebombWriteArgs {
	fn run(self) -> ExitCode {
		if self.file_size == 0 {
			eprintln!("File size was not set properly. See help");
			return ExitCode::from(EXIT_INVALID_CONFIG);
		}
		if self.count == 0 {
			eprintln!("Files count was not set properly. See help");
			return ExitCode::from(EXIT_INVALID_CONFIG);
		}
		if let Err(e) = std::fs::create_dir_all(&self.folder) {
			eprintln!("Can't create folder {}: {e}", self.folder.display());
			return ExitCode::FAILURE;
		}
		let cfg = filebomb::FilebombConfig {
			folder:    self.folder,
			source:    self.source,
			file_size: self.file_size,
			count:     self.count,
		};
		match filebomb::write_files(&cfg) {
			Ok(_) => ExitCode::SUCCESS,
			Err(e) => {
				eprintln!("{e}");
				ExitCode::from(e.exit_code())
			}
		}
	}
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Read back every file in a folder.
Examples:

fsbench filebomb read -f /tmp/bomb
")]
struct FilebombReadArgs {
	/// Folder to read files from
	#[arg(short, long)]
	folder: PathBuf,
}

impl FilebombReadArgs {
	fn run(self) -> ExitCode {
		match filebomb::read_files(&self.folder) {
			Ok(_) => ExitCode::SUCCESS,
			Err(e) => {
				eprintln!("{e}");
				ExitCode::from(e.exit_code())
			}
		}
	}
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
	let cli = Cli::parse();
	match cli.commands {
		Commands::Run(ra) => ra.run(),
		Commands::Filebomb(fa) => fa.run(),
	}
}
