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

//! Single-file benchmark worker. The orchestrator spawns one of these per
//! target file; the exit status is the only result channel back to it.

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use fsbench::{AccessPattern, DEFAULT_BLOCK_SIZE, source::{ByteSource, DEFAULT_SOURCE}, transfer::TransferSession};
use tracing_subscriber::EnvFilter;

const EXIT_INVALID_SIZE: u8 = 3;

#[derive(Debug, Parser)]
#[clap(name = "fsbench-worker", about = "Single-file IO benchmark worker", version)]
struct Cli {
	#[command(subcommand)]
	commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	Write(WriteArgs),
	Read(ReadArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Write blocks pulled from a byte source into one target file.
Examples:

fsbench-worker write -f /tmp/bench/fsbench-0.bin -b 512 -c 4096
")]
struct WriteArgs {
	/// Path of the file to write
	#[arg(short, long)]
	file:       PathBuf,
	/// Source of payload bytes
	#[arg(short, long, default_value = DEFAULT_SOURCE)]
	source:     PathBuf,
	/// Size of one block transfer in bytes
	#[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
	block_size: u64,
	/// Count of blocks to write
	#[arg(short, long)]
	count:      u64,
	/// Seek to a random block before every write
	#[arg(short, long)]
	randomly:   bool,
}

impl WriteArgs {
	fn run(self) -> ExitCode {
		if self.block_size == 0 {
			eprintln!("Block size was not set properly. See help");
			return ExitCode::from(EXIT_INVALID_SIZE);
		}
		if self.count == 0 {
			eprintln!("Blocks count was not set properly. See help");
			return ExitCode::from(EXIT_INVALID_SIZE);
		}
		let pattern = AccessPattern::from_flag(self.randomly);
		let outcome = TransferSession::open_write(&self.file, self.block_size, pattern)
			.and_then(|mut session| {
				let mut source = ByteSource::open(&self.source)?;
				session.write_from(&mut source, self.count)
			});
		match outcome {
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

Read one target file in block-sized chunks until the first short read.
Examples:

fsbench-worker read -f /tmp/bench/fsbench-0.bin -b 512
")]
struct ReadArgs {
	/// Path of the file to read
	#[arg(short, long)]
	file:       PathBuf,
	/// Size of one block transfer in bytes
	#[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
	block_size: u64,
	/// Seek to a random block before every read
	#[arg(short, long)]
	randomly:   bool,
}

impl ReadArgs {
	fn run(self) -> ExitCode {
		if self.block_size == 0 {
			eprintln!("Block size was not set properly. See help");
			return ExitCode::from(EXIT_INVALID_SIZE);
		}
		let pattern = AccessPattern::from_flag(self.randomly);
		let outcome = TransferSession::open_read(&self.file, self.block_size, pattern)
			.and_then(|mut session| session.read_all());
		match outcome {
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
		Commands::Write(wa) => wa.run(),
		Commands::Read(ra) => ra.run(),
	}
}
