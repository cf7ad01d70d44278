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

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group};

criterion_group!(benches, transfer_write, transfer_read);

use fsbench::{AccessPattern, readable_size::ReadableSize, source::{ByteSource, DEFAULT_SOURCE}, transfer::TransferSession};

fn transfer_write(c: &mut Criterion) {
	let dir = tempfile::tempdir().unwrap();
	let target = dir.path().join("bench.bin");

	let mut group = c.benchmark_group("transfer::write");
	let total = ReadableSize::mb(64);
	for block in [ReadableSize::kb(4), ReadableSize::kb(64), ReadableSize::mb(1)].iter() {
		group.sample_size(10);
		group.throughput(Throughput::Bytes(total.as_bytes()));
		group.bench_with_input(BenchmarkId::from_parameter(block), block, |b, &block| {
			b.iter(|| {
				let mut session = TransferSession::open_write(
					&target,
					block.as_bytes(),
					AccessPattern::Sequential,
				)
				.unwrap();
				let mut source = ByteSource::open(DEFAULT_SOURCE).unwrap();
				session.write_from(&mut source, total / block).unwrap();
			});
		});
	}
	group.finish();
}

fn transfer_read(c: &mut Criterion) {
	let dir = tempfile::tempdir().unwrap();
	let target = dir.path().join("bench.bin");
	let total = ReadableSize::mb(64);
	std::fs::write(&target, vec![1u8; total.as_bytes_usize()]).unwrap();

	let mut group = c.benchmark_group("transfer::read");
	for block in [ReadableSize::kb(4), ReadableSize::kb(64), ReadableSize::mb(1)].iter() {
		group.sample_size(10);
		group.throughput(Throughput::Bytes(total.as_bytes()));
		group.bench_with_input(BenchmarkId::from_parameter(block), block, |b, &block| {
			b.iter(|| {
				let mut session = TransferSession::open_read(
					&target,
					block.as_bytes(),
					AccessPattern::Sequential,
				)
				.unwrap();
				session.read_all().unwrap();
			});
		});
	}
	group.finish();
}
