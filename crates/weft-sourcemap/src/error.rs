// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for source map decoding, validation, and lookup.

use thiserror::Error;

/// Errors that can occur while parsing, querying, or composing source maps.
#[derive(Debug, Error)]
pub enum SourceMapError {
	#[error("invalid source map JSON: {0}")]
	InvalidJson(#[from] serde_json::Error),

	#[error("mapping string is empty")]
	EmptyMappings,

	#[error("invalid mapping character '{character}' at byte offset {offset}")]
	InvalidMappingChar { character: char, offset: usize },

	#[error("incomplete VLQ sequence at end of input")]
	IncompleteVlq,

	#[error("VLQ value out of range at byte offset {offset}")]
	VlqOverflow { offset: usize },

	#[error("segment has {count} values, expected 4 or 5")]
	InvalidSegmentLength { count: usize },

	#[error("invalid segment field {field}: {value}")]
	InvalidSegmentField { field: &'static str, value: i64 },

	#[error("line {line}: {source}")]
	Frame {
		line: usize,
		#[source]
		source: Box<SourceMapError>,
	},
}

impl SourceMapError {
	/// Attach the 1-based generated-line (frame) index to an error raised
	/// while decoding that frame.
	pub(crate) fn in_frame(self, line: usize) -> Self {
		Self::Frame {
			line,
			source: Box::new(self),
		}
	}
}

/// Result type for source map operations.
pub type Result<T> = std::result::Result<T, SourceMapError>;
