// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source Map v3 codec and bidirectional position-query engine.
//!
//! This crate provides functionality for:
//! - Decoding Base64 VLQ mapping strings into an indexable segment store
//! - Bidirectional lookups between generated and original positions
//! - Extracting original source context around a resolved position
//! - Re-encoding the store back to the canonical wire format
//! - Composing maps as if their generated files were concatenated
//!
//! # Example
//!
//! ```
//! use weft_sourcemap::{Bias, SourceMap};
//!
//! let map = SourceMap::from_json(r#"{
//!     "version": 3,
//!     "sources": ["src/index.ts"],
//!     "names": ["hello"],
//!     "mappings": "AAAAA,SAASA"
//! }"#).unwrap();
//!
//! let position = map.get_by_generated(1, 1, Bias::Exact).unwrap();
//! assert_eq!(position.source_path, "src/index.ts");
//! assert_eq!(position.name.as_deref(), Some("hello"));
//!
//! // Columns between mapping points resolve with an explicit bias.
//! let nearest = map.get_by_generated(1, 7, Bias::Floor).unwrap();
//! assert_eq!(nearest.generated_column, 1);
//! ```

pub mod error;
pub mod mappings;
pub mod path;
pub mod segment;
pub mod sourcemap;
pub mod vlq;

// Re-export main types
pub use error::{Result, SourceMapError};
pub use mappings::{Bias, MappingLine, MappingStore, OriginalIndex, RebaseOffsets};
pub use segment::Segment;
pub use sourcemap::{
	CodeContextOpts, ContextLine, MappedPosition, MappedPositionWithCode, SourceMap,
	SourceMapEnvelope, SourceMapMetadata,
};
