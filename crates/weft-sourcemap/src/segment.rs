// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Segment records and the delta codec that sits between raw VLQ values and
//! the mapping store.
//!
//! The wire format is a stateful delta encoding: every numeric field of a
//! segment is stored relative to the previous segment's value. [`DeltaState`]
//! holds the six running 0-based accumulators; the public [`Segment`] record
//! is fully resolved and 1-based.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceMapError};

/// A single mapping point linking a generated position to an original one.
///
/// All positional fields are 1-based. `name_index` distinguishes "no name"
/// from index 0: a segment whose name is the first `names` entry carries
/// `Some(0)`, which is semantically different from `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
	/// Line in the generated file (1-based).
	pub generated_line: u32,
	/// Column in the generated file (1-based).
	pub generated_column: u32,
	/// Line in the original source (1-based).
	pub source_line: u32,
	/// Column in the original source (1-based).
	pub source_column: u32,
	/// Index into the `sources` table.
	pub source_index: u32,
	/// Optional index into the `names` table.
	pub name_index: Option<u32>,
}

/// Running delta offsets threaded through segment decode and encode.
///
/// The accumulators are 0-based and signed so that malformed input that
/// walks a field negative is detectable instead of wrapping.
#[derive(Debug, Default, Clone)]
pub(crate) struct DeltaState {
	pub generated_line: i64,
	pub generated_column: i64,
	pub source_line: i64,
	pub source_column: i64,
	pub source_index: i64,
	pub name_index: i64,
}

impl DeltaState {
	/// Start a new generated line. `generated_column` resets at every line
	/// boundary; the source-side accumulators persist across lines.
	pub fn start_line(&mut self, line: i64) {
		self.generated_line = line;
		self.generated_column = 0;
	}

	/// Resolve a 4- or 5-value delta vector into a 1-based segment,
	/// advancing the accumulators in place.
	///
	/// The wire format also permits 1-value segments (generated column with
	/// no source mapping); those are rejected here since the store neither
	/// produces nor consumes them.
	pub fn resolve(&mut self, deltas: &[i64]) -> Result<Segment> {
		if deltas.len() != 4 && deltas.len() != 5 {
			return Err(SourceMapError::InvalidSegmentLength {
				count: deltas.len(),
			});
		}

		self.generated_column += deltas[0];
		self.source_index += deltas[1];
		self.source_line += deltas[2];
		self.source_column += deltas[3];

		let name_index = if deltas.len() == 5 {
			self.name_index += deltas[4];
			Some(checked_index("name_index", self.name_index)?)
		} else {
			None
		};

		Ok(Segment {
			generated_line: checked_position("generated_line", self.generated_line + 1)?,
			generated_column: checked_position("generated_column", self.generated_column + 1)?,
			source_line: checked_position("source_line", self.source_line + 1)?,
			source_column: checked_position("source_column", self.source_column + 1)?,
			source_index: checked_index("source_index", self.source_index)?,
			name_index,
		})
	}

	/// Produce the delta vector for a 1-based segment, advancing the
	/// accumulators to the segment's 0-based values.
	///
	/// Returns the values and their count: 5 when `name_index` is present
	/// (including `Some(0)`), 4 otherwise.
	pub fn emit(&mut self, segment: &Segment) -> ([i64; 5], usize) {
		let generated_column = i64::from(segment.generated_column) - 1;
		let source_index = i64::from(segment.source_index);
		let source_line = i64::from(segment.source_line) - 1;
		let source_column = i64::from(segment.source_column) - 1;

		let mut deltas = [
			generated_column - self.generated_column,
			source_index - self.source_index,
			source_line - self.source_line,
			source_column - self.source_column,
			0,
		];

		self.generated_column = generated_column;
		self.source_index = source_index;
		self.source_line = source_line;
		self.source_column = source_column;

		match segment.name_index {
			Some(name) => {
				let name = i64::from(name);
				deltas[4] = name - self.name_index;
				self.name_index = name;
				(deltas, 5)
			}
			None => (deltas, 4),
		}
	}
}

/// Validate a caller-supplied segment before it is accepted into a store.
///
/// Positional fields must be at least 1. Index fields are unsigned by
/// construction, so no further range check applies.
pub fn validate(segment: &Segment) -> Result<()> {
	let positions = [
		("generated_line", segment.generated_line),
		("generated_column", segment.generated_column),
		("source_line", segment.source_line),
		("source_column", segment.source_column),
	];
	for (field, value) in positions {
		if value < 1 {
			return Err(SourceMapError::InvalidSegmentField {
				field,
				value: i64::from(value),
			});
		}
	}
	Ok(())
}

fn checked_position(field: &'static str, value: i64) -> Result<u32> {
	if value < 1 || value > i64::from(u32::MAX) {
		return Err(SourceMapError::InvalidSegmentField { field, value });
	}
	Ok(value as u32)
}

fn checked_index(field: &'static str, value: i64) -> Result<u32> {
	if value < 0 || value > i64::from(u32::MAX) {
		return Err(SourceMapError::InvalidSegmentField { field, value });
	}
	Ok(value as u32)
}
