// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The mapping store: an ordered, line-indexed collection of segments with
//! decode/encode of whole mapping strings, bidirectional position search,
//! and an on-demand reverse index.
//!
//! Lines are sparse: a generated line either carries an ordered segment
//! list or is absent (an empty frame between `;` delimiters on the wire).

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Result, SourceMapError};
use crate::segment::{self, DeltaState, Segment};
use crate::vlq;

/// Policy for resolving a lookup that finds no exact-column match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bias {
	/// Only an exact column match is returned.
	#[default]
	Exact,
	/// Fall back to the greatest column strictly below the target.
	Floor,
	/// Fall back to the least column strictly above the target.
	Ceil,
}

/// Rebase amounts applied to every segment produced by a decode call.
///
/// `name` and `sources` shift the respective table indices; `line` shifts
/// `generated_line` on top of the store-length rebasing every append gets.
/// Composition passes the sizes of the tables already present so that
/// appended maps land after the existing content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebaseOffsets {
	pub line: u32,
	pub name: u32,
	pub sources: u32,
}

/// One generated line of a store: absent, or an ordered segment list.
pub type MappingLine = Option<Vec<Segment>>;

/// Ordered, line-indexed segment storage for one (possibly composed)
/// generated file.
///
/// Within a line, segments are ordered by `generated_column`; duplicate
/// columns are preserved in arrival order and never collapsed. The offsets
/// of the first decode into an empty store are retained as the lookup
/// base: a segment at line index `j` satisfies
/// `generated_line == j + 1 + base.line`.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
	lines: Vec<MappingLine>,
	base: RebaseOffsets,
}

impl MappingStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of generated lines, absent lines included.
	pub fn line_count(&self) -> usize {
		self.lines.len()
	}

	/// Total number of segments across all lines.
	pub fn segment_count(&self) -> usize {
		self.lines.iter().flatten().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Segments of the line at `index` (0-based); `None` for an absent or
	/// out-of-range line.
	pub fn line(&self, index: usize) -> Option<&[Segment]> {
		self.lines.get(index).and_then(|line| line.as_deref())
	}

	/// All lines in order; `None` entries are absent lines.
	pub fn lines(&self) -> &[MappingLine] {
		&self.lines
	}

	/// The rebase offsets of the first decode, used as the lookup base.
	pub fn offsets(&self) -> RebaseOffsets {
		self.base
	}

	/// Decode a Base64 VLQ mapping string and append its lines.
	///
	/// The whole string is validated against the mapping alphabet
	/// (`[A-Za-z0-9+/,;]+`) before any segment is produced; an empty string
	/// is an error. Frames split on `;`, segments on `,`, and frames are
	/// stamped continuing from the store's existing line count. The offsets
	/// are applied to the `name_index`, `source_index`, and `generated_line`
	/// of every decoded segment. Errors name the 1-based frame index, and
	/// the append is all-or-nothing: a failing call leaves the store
	/// untouched.
	pub fn decode_string(&mut self, mappings: &str, offsets: RebaseOffsets) -> Result<()> {
		validate_mapping_charset(mappings)?;

		let mut state = DeltaState::default();
		let mut decoded: Vec<MappingLine> = Vec::new();

		for (index, frame) in mappings.split(';').enumerate() {
			// Frames continue from the store's existing lines.
			state.start_line((self.lines.len() + index) as i64);

			if frame.is_empty() {
				decoded.push(None);
				continue;
			}

			let mut segments = Vec::new();
			for raw in frame.split(',') {
				let deltas =
					vlq::decode(raw).map_err(|err| err.in_frame(index + 1))?;
				let mut segment = state
					.resolve(&deltas)
					.map_err(|err| err.in_frame(index + 1))?;
				apply_offsets(&mut segment, offsets);
				segments.push(segment);
			}
			decoded.push(Some(segments));
		}

		trace!(
			frames = decoded.len(),
			appended_after = self.lines.len(),
			"decoded mapping string"
		);
		self.append(decoded, offsets);
		Ok(())
	}

	/// Append pre-structured lines, validating every segment first.
	///
	/// `None` entries pass through as absent lines. Each segment is
	/// validated, then copied with the offsets applied; `generated_line` is
	/// additionally rebased by the prior store length so that appended maps
	/// land after existing content. Errors name the 1-based line index, and
	/// the append is all-or-nothing.
	pub fn decode_array(&mut self, lines: &[MappingLine], offsets: RebaseOffsets) -> Result<()> {
		let prior = self.lines.len() as u32;
		let mut decoded: Vec<MappingLine> = Vec::with_capacity(lines.len());

		for (index, line) in lines.iter().enumerate() {
			let Some(segments) = line else {
				decoded.push(None);
				continue;
			};

			let mut copied = Vec::with_capacity(segments.len());
			for original in segments {
				segment::validate(original).map_err(|err| err.in_frame(index + 1))?;
				let mut segment = original.clone();
				apply_offsets(&mut segment, offsets);
				segment.generated_line += prior;
				copied.push(segment);
			}
			decoded.push(Some(copied));
		}

		self.append(decoded, offsets);
		Ok(())
	}

	/// Append another store's lines, rebasing with the same rules as
	/// [`decode_array`](Self::decode_array).
	pub fn decode_from(&mut self, other: &MappingStore, offsets: RebaseOffsets) -> Result<()> {
		self.decode_array(&other.lines, offsets)
	}

	/// Re-emit the store as a canonical Base64 VLQ mapping string.
	///
	/// Decoding the result reproduces the same segment sequence. Absent
	/// lines become empty frames (back-to-back `;`). The stored
	/// `generated_line` field is not consulted; frame boundaries alone
	/// carry that information.
	pub fn encode(&self) -> String {
		let mut state = DeltaState::default();
		let mut frames = Vec::with_capacity(self.lines.len());

		for line in &self.lines {
			let Some(segments) = line else {
				frames.push(String::new());
				continue;
			};

			state.start_line(0);
			let mut parts = Vec::with_capacity(segments.len());
			for segment in segments {
				let (deltas, count) = state.emit(segment);
				parts.push(vlq::encode_values(&deltas[..count]));
			}
			frames.push(parts.join(","));
		}

		frames.join(";")
	}

	/// Look up a segment by generated position via binary search on the
	/// line's segment list.
	///
	/// On an exact column hit the segment first visited at the moment of
	/// exact comparison is returned, which on duplicate columns is the one
	/// the binary-search midpoint lands on.
	pub fn get_by_generated(&self, line: u32, column: u32, bias: Bias) -> Option<&Segment> {
		let index = line.checked_sub(self.base.line)?.checked_sub(1)? as usize;
		let segments = self.lines.get(index)?.as_deref()?;

		let mut low = 0usize;
		let mut high = segments.len();
		while low < high {
			let mid = (low + high) / 2;
			let at = segments[mid].generated_column;
			if at == column {
				return Some(&segments[mid]);
			}
			if at < column {
				low = mid + 1;
			} else {
				high = mid;
			}
		}

		// `low` is the first index whose column exceeds the target.
		match bias {
			Bias::Exact => None,
			Bias::Floor => low.checked_sub(1).map(|i| &segments[i]),
			Bias::Ceil => segments.get(low),
		}
	}

	/// Look up a segment by original position.
	///
	/// This is a linear scan over all lines and segments. Callers issuing
	/// many reverse queries should materialize
	/// [`build_original_index`](Self::build_original_index) instead.
	pub fn get_by_original(
		&self,
		source_line: u32,
		source_column: u32,
		source_index: u32,
		bias: Bias,
	) -> Option<&Segment> {
		let mut best: Option<&Segment> = None;

		for segments in self.lines.iter().flatten() {
			for segment in segments {
				if segment.source_index != source_index || segment.source_line != source_line {
					continue;
				}
				if segment.source_column == source_column {
					return Some(segment);
				}
				match bias {
					Bias::Exact => {}
					Bias::Floor => {
						if segment.source_column < source_column
							&& best.is_none_or(|b| segment.source_column > b.source_column)
						{
							best = Some(segment);
						}
					}
					Bias::Ceil => {
						if segment.source_column > source_column
							&& best.is_none_or(|b| segment.source_column < b.source_column)
						{
							best = Some(segment);
						}
					}
				}
			}
		}

		best
	}

	/// Bucket all segments by `(source_index, source_line)` for efficient
	/// reverse queries.
	///
	/// The index is a snapshot: it is built on demand and not maintained
	/// incrementally as the store grows.
	pub fn build_original_index(&self) -> OriginalIndex {
		let mut buckets: HashMap<(u32, u32), Vec<Segment>> = HashMap::new();

		for segments in self.lines.iter().flatten() {
			for segment in segments {
				buckets
					.entry((segment.source_index, segment.source_line))
					.or_default()
					.push(segment.clone());
			}
		}
		for bucket in buckets.values_mut() {
			bucket.sort_by_key(|segment| segment.source_column);
		}

		trace!(buckets = buckets.len(), "built reverse index");
		OriginalIndex { buckets }
	}

	fn append(&mut self, decoded: Vec<MappingLine>, offsets: RebaseOffsets) {
		if self.lines.is_empty() {
			self.base = offsets;
		}
		self.lines.extend(decoded);
	}
}

/// Segments bucketed by `(source_index, source_line)`, each bucket sorted
/// by `source_column`, answering reverse queries in O(log n).
#[derive(Debug, Clone, Default)]
pub struct OriginalIndex {
	buckets: HashMap<(u32, u32), Vec<Segment>>,
}

impl OriginalIndex {
	/// Look up a segment by original position with the same bias policy as
	/// [`MappingStore::get_by_original`].
	pub fn get(
		&self,
		source_line: u32,
		source_column: u32,
		source_index: u32,
		bias: Bias,
	) -> Option<&Segment> {
		let bucket = self.buckets.get(&(source_index, source_line))?;

		let mut low = 0usize;
		let mut high = bucket.len();
		while low < high {
			let mid = (low + high) / 2;
			let at = bucket[mid].source_column;
			if at == source_column {
				return Some(&bucket[mid]);
			}
			if at < source_column {
				low = mid + 1;
			} else {
				high = mid;
			}
		}

		match bias {
			Bias::Exact => None,
			Bias::Floor => low.checked_sub(1).map(|i| &bucket[i]),
			Bias::Ceil => bucket.get(low),
		}
	}

	/// The segments mapped from one `(source_index, source_line)` pair,
	/// sorted by `source_column`.
	pub fn bucket(&self, source_index: u32, source_line: u32) -> Option<&[Segment]> {
		self.buckets
			.get(&(source_index, source_line))
			.map(Vec::as_slice)
	}

	/// Number of distinct `(source_index, source_line)` keys.
	pub fn len(&self) -> usize {
		self.buckets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}
}

fn apply_offsets(segment: &mut Segment, offsets: RebaseOffsets) {
	segment.generated_line += offsets.line;
	segment.source_index += offsets.sources;
	if let Some(name) = segment.name_index.as_mut() {
		*name += offsets.name;
	}
}

fn validate_mapping_charset(mappings: &str) -> Result<()> {
	if mappings.is_empty() {
		return Err(SourceMapError::EmptyMappings);
	}
	for (offset, byte) in mappings.bytes().enumerate() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' | b',' | b';' => {}
			other => {
				return Err(SourceMapError::InvalidMappingChar {
					character: other as char,
					offset,
				});
			}
		}
	}
	Ok(())
}
