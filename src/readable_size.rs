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

use std::{fmt::{Display, Formatter}, ops::{Div, Mul}, str::FromStr};

pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;

/// A byte count that parses and prints with base-1024 suffixes. `4K`,
/// `16MiB` and plain `512` are all accepted; every suffix is binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadableSize(pub u64);

impl ReadableSize {
	pub const fn kb(n: u64) -> Self { Self(n * KIB) }

	pub const fn mb(n: u64) -> Self { Self(n * MIB) }

	pub const fn gb(n: u64) -> Self { Self(n * GIB) }

	pub const fn as_bytes(self) -> u64 { self.0 }

	pub const fn as_bytes_usize(self) -> usize { self.0 as usize }
}

impl Div<ReadableSize> for ReadableSize {
	type Output = u64;

	fn div(self, rhs: ReadableSize) -> u64 { self.0 / rhs.0 }
}

impl Div<u64> for ReadableSize {
	type Output = ReadableSize;

	fn div(self, rhs: u64) -> ReadableSize { ReadableSize(self.0 / rhs) }
}

impl Mul<u64> for ReadableSize {
	type Output = ReadableSize;

	fn mul(self, rhs: u64) -> ReadableSize { ReadableSize(self.0 * rhs) }
}

impl Display for ReadableSize {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if self.0 >= GIB && self.0 % GIB == 0 {
			write!(f, "{}GiB", self.0 / GIB)
		} else if self.0 >= MIB && self.0 % MIB == 0 {
			write!(f, "{}MiB", self.0 / MIB)
		} else if self.0 >= KIB && self.0 % KIB == 0 {
			write!(f, "{}KiB", self.0 / KIB)
		} else {
			write!(f, "{}B", self.0)
		}
	}
}

impl FromStr for ReadableSize {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, String> {
		let s = s.trim();
		let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
		if digits == 0 {
			return Err(format!("invalid size: {s:?}"));
		}
		let value: u64 =
			s[..digits].parse().map_err(|e| format!("invalid size {s:?}: {e}"))?;
		let unit = match s[digits..].trim().to_ascii_uppercase().as_str() {
			"" | "B" => 1,
			"K" | "KB" | "KIB" => KIB,
			"M" | "MB" | "MIB" => MIB,
			"G" | "GB" | "GIB" => GIB,
			suffix => return Err(format!("unknown size suffix {suffix:?} in {s:?}")),
		};
		value
			.checked_mul(unit)
			.map(ReadableSize)
			.ok_or_else(|| format!("size overflows u64: {s:?}"))
	}
}
