// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The source map facade: the JSON envelope around a mapping store, with
//! position lookups, source context extraction, and map composition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::mappings::{Bias, MappingStore, OriginalIndex, RebaseOffsets};
use crate::path::normalize_path;
use crate::segment::Segment;

/// Source Map v3 JSON envelope.
///
/// `version`, `sources`, and `mappings` are required; everything else is
/// optional on the wire. `sources_content` entries may be `null` to mark a
/// source without embedded content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapEnvelope {
	pub version: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_root: Option<String>,
	pub sources: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub sources_content: Vec<Option<String>>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub names: Vec<String>,
	pub mappings: String,
}

/// Serializable summary of a parsed source map, for callers that index
/// maps without retaining the decoded mapping store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMapMetadata {
	pub version: u32,
	pub file: Option<String>,
	pub source_root: Option<String>,
	pub sources: Vec<String>,
	pub names: Vec<String>,
	pub has_sources_content: bool,
}

/// A resolved position from a lookup.
///
/// All positional fields are 1-based. `source_path` is the `sources` entry
/// the segment points at (empty when the index is out of range); `name` is
/// populated iff the segment's `name_index` refers to a valid `names`
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPosition {
	pub generated_line: u32,
	pub generated_column: u32,
	pub source_line: u32,
	pub source_column: u32,
	pub source_index: u32,
	pub source_path: String,
	pub source_content: Option<String>,
	pub name_index: Option<u32>,
	pub name: Option<String>,
}

/// A resolved position together with surrounding original source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPositionWithCode {
	pub position: MappedPosition,
	pub code_context: Vec<ContextLine>,
}

/// One line of original source context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
	/// 1-based line number in the original source.
	pub line_number: u32,
	pub content: String,
}

/// How much source context to extract around a resolved position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeContextOpts {
	pub lines_before: u32,
	pub lines_after: u32,
}

impl Default for CodeContextOpts {
	fn default() -> Self {
		Self {
			lines_before: 2,
			lines_after: 2,
		}
	}
}

/// A parsed source map ready for bidirectional position lookups and
/// composition.
///
/// The facade exclusively owns its mapping store. Mutation happens only
/// through [`concat`](Self::concat); lookups never modify the map. A value
/// is not safe for concurrent mutation, which the `&mut self` receivers
/// make a compile-time property.
#[derive(Debug, Clone)]
pub struct SourceMap {
	/// Source map version from the envelope.
	pub version: u32,
	/// Generated file name, normalized.
	pub file: Option<String>,
	/// Root path prefix for entries in `sources`, normalized.
	pub source_root: Option<String>,
	/// Original source paths, normalized.
	pub sources: Vec<String>,
	/// Embedded source content aligned with `sources`; may be shorter when
	/// the envelope carried none.
	pub sources_content: Vec<Option<String>>,
	/// Identifier names referenced by segments.
	pub names: Vec<String>,
	store: MappingStore,
	generated_line_count: u32,
}

impl SourceMap {
	/// Parse a source map from a JSON string.
	pub fn from_json(data: &str) -> Result<Self> {
		let envelope: SourceMapEnvelope = serde_json::from_str(data)?;
		Self::from_envelope(envelope)
	}

	/// Build a source map from an already-validated envelope record.
	///
	/// The mapping string is decoded immediately; paths in `sources`,
	/// `file`, and `sourceRoot` are normalized to forward-slash form.
	pub fn from_envelope(envelope: SourceMapEnvelope) -> Result<Self> {
		let SourceMapEnvelope {
			version,
			file,
			source_root,
			sources,
			sources_content,
			names,
			mappings,
		} = envelope;

		let mut store = MappingStore::new();
		store.decode_string(&mappings, RebaseOffsets::default())?;
		let generated_line_count = mappings.split(';').count() as u32;

		debug!(
			sources = sources.len(),
			names = names.len(),
			generated_lines = generated_line_count,
			"parsed source map"
		);

		Ok(Self {
			version,
			file: file.map(|f| normalize_path(&f)),
			source_root: source_root.map(|r| normalize_path(&r)),
			sources: sources.iter().map(|s| normalize_path(s)).collect(),
			sources_content,
			names,
			store,
			generated_line_count,
		})
	}

	/// The decoded mapping store backing this map.
	pub fn store(&self) -> &MappingStore {
		&self.store
	}

	/// Number of generated lines covered by the mapping string.
	pub fn generated_line_count(&self) -> u32 {
		self.generated_line_count
	}

	/// Number of source files referenced by this map.
	pub fn source_count(&self) -> usize {
		self.sources.len()
	}

	/// Number of identifier names referenced by this map.
	pub fn name_count(&self) -> usize {
		self.names.len()
	}

	/// Total number of mapping segments.
	pub fn segment_count(&self) -> usize {
		self.store.segment_count()
	}

	/// Whether any source has embedded content.
	pub fn has_sources_content(&self) -> bool {
		self.sources_content.iter().any(|c| c.is_some())
	}

	/// A source path joined with `sourceRoot`, the form display tooling
	/// wants. `None` when the index is out of range.
	pub fn resolve_source_path(&self, index: usize) -> Option<String> {
		let source = self.sources.get(index)?;
		match self.source_root.as_deref() {
			Some(root) if !root.is_empty() => {
				Some(format!("{}/{}", root.trim_end_matches('/'), source))
			}
			_ => Some(source.clone()),
		}
	}

	/// Summary record for indexing this map without keeping the store.
	pub fn metadata(&self) -> SourceMapMetadata {
		SourceMapMetadata {
			version: self.version,
			file: self.file.clone(),
			source_root: self.source_root.clone(),
			sources: self.sources.clone(),
			names: self.names.clone(),
			has_sources_content: self.has_sources_content(),
		}
	}

	/// Look up the mapping at a generated position (1-based line/column).
	pub fn get_by_generated(&self, line: u32, column: u32, bias: Bias) -> Option<MappedPosition> {
		self.store
			.get_by_generated(line, column, bias)
			.map(|segment| self.position(segment, false))
	}

	/// Look up the mapping at an original position (1-based line/column,
	/// plus the `sources` table index).
	pub fn get_by_original(
		&self,
		source_line: u32,
		source_column: u32,
		source_index: u32,
		bias: Bias,
	) -> Option<MappedPosition> {
		self.store
			.get_by_original(source_line, source_column, source_index, bias)
			.map(|segment| self.position(segment, false))
	}

	/// Look up a generated position and extract surrounding original
	/// source lines.
	///
	/// Returns `None` when no segment matches or when the hit source has
	/// no embedded content.
	pub fn get_by_generated_with_code(
		&self,
		line: u32,
		column: u32,
		bias: Bias,
		opts: CodeContextOpts,
	) -> Option<MappedPositionWithCode> {
		let segment = self.store.get_by_generated(line, column, bias)?;
		let content = self
			.sources_content
			.get(segment.source_index as usize)?
			.as_deref()?;

		let lines: Vec<&str> = content
			.split('\n')
			.map(|l| l.strip_suffix('\r').unwrap_or(l))
			.collect();
		let total = lines.len() as u32;

		let start = segment.source_line.saturating_sub(opts.lines_before).max(1);
		let end = segment.source_line.saturating_add(opts.lines_after).min(total);

		let mut code_context = Vec::new();
		let mut number = start;
		while number <= end {
			let content = lines
				.get(number as usize - 1)
				.copied()
				.unwrap_or_default()
				.to_string();
			code_context.push(ContextLine {
				line_number: number,
				content,
			});
			number += 1;
		}

		Some(MappedPositionWithCode {
			position: self.position(segment, true),
			code_context,
		})
	}

	/// Build a reverse index over the store for repeated original-position
	/// queries.
	pub fn build_original_index(&self) -> OriginalIndex {
		self.store.build_original_index()
	}

	/// Append another map as if the generated files were concatenated
	/// vertically.
	///
	/// The other map's segments are rebased: `generated_line` by this
	/// map's generated line count, `source_index` by the size of this
	/// map's `sources` table, `name_index` by the size of `names`. The
	/// `sources_content` arrays are kept aligned with absent-content
	/// padding. The other map is never mutated.
	pub fn concat(&mut self, other: &SourceMap) -> Result<()> {
		// Appended frames are stamped past the store's existing lines, so
		// the line rebase needs no explicit offset; only the name and
		// source tables do.
		let offsets = RebaseOffsets {
			line: 0,
			name: self.names.len() as u32,
			sources: self.sources.len() as u32,
		};

		// Decode first so a failure leaves this map untouched.
		let mappings = other.store.encode();
		if !mappings.is_empty() {
			self.store.decode_string(&mappings, offsets)?;
		}

		if !other.sources_content.is_empty() {
			// Align our content array with the sources appended below.
			while self.sources_content.len() < offsets.sources as usize {
				self.sources_content.push(None);
			}
			for index in 0..other.sources.len() {
				self.sources_content
					.push(other.sources_content.get(index).cloned().flatten());
			}
		} else if !self.sources_content.is_empty() {
			for _ in 0..other.sources.len() {
				self.sources_content.push(None);
			}
		}

		self.names.extend(other.names.iter().cloned());
		self.sources.extend(other.sources.iter().cloned());
		self.generated_line_count += other.generated_line_count;

		debug!(
			added_lines = other.generated_line_count,
			sources = self.sources.len(),
			names = self.names.len(),
			"concatenated source map"
		);
		Ok(())
	}

	/// A fully independent deep copy of this map.
	pub fn duplicate(&self) -> Self {
		self.clone()
	}

	/// Re-emit the canonical wire envelope, with the mapping string
	/// re-encoded from the store.
	pub fn envelope(&self) -> SourceMapEnvelope {
		SourceMapEnvelope {
			version: self.version,
			file: self.file.clone(),
			source_root: self.source_root.clone(),
			sources: self.sources.clone(),
			sources_content: self.sources_content.clone(),
			names: self.names.clone(),
			mappings: self.store.encode(),
		}
	}

	/// Serialize the map back to Source Map v3 JSON.
	pub fn to_json_string(&self) -> Result<String> {
		Ok(serde_json::to_string(&self.envelope())?)
	}

	fn position(&self, segment: &Segment, with_content: bool) -> MappedPosition {
		let source_index = segment.source_index as usize;
		let source_content = if with_content {
			self.sources_content
				.get(source_index)
				.and_then(|c| c.clone())
		} else {
			None
		};

		MappedPosition {
			generated_line: segment.generated_line,
			generated_column: segment.generated_column,
			source_line: segment.source_line,
			source_column: segment.source_column,
			source_index: segment.source_index,
			source_path: self
				.sources
				.get(source_index)
				.cloned()
				.unwrap_or_default(),
			source_content,
			name_index: segment.name_index,
			name: segment
				.name_index
				.and_then(|index| self.names.get(index as usize).cloned()),
		}
	}
}
