// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use weft_sourcemap::{Bias, CodeContextOpts, SourceMap};

/// Map for a first bundle chunk: two generated lines over one source.
fn chunk_a() -> SourceMap {
	SourceMap::from_json(
		r#"{
			"version": 3,
			"file": "chunk-a.js",
			"sources": ["src/app.ts"],
			"sourcesContent": ["export function main() {\n  run();\n}\n"],
			"names": ["main", "run"],
			"mappings": "AAAAA,gBAAgB;AACbC"
		}"#,
	)
	.unwrap()
}

/// Map for a second chunk: two generated lines over two sources.
fn chunk_b() -> SourceMap {
	SourceMap::from_json(
		r#"{
			"version": 3,
			"file": "chunk-b.js",
			"sources": ["src/util.ts", "src/log.ts"],
			"names": ["helper"],
			"mappings": "AAAAA;ACAA"
		}"#,
	)
	.unwrap()
}

#[test]
fn test_bundle_composition_end_to_end() {
	let mut bundle = chunk_a();
	bundle.concat(&chunk_b()).unwrap();

	assert_eq!(bundle.generated_line_count(), 4);
	assert_eq!(bundle.sources, vec!["src/app.ts", "src/util.ts", "src/log.ts"]);
	assert_eq!(bundle.names, vec!["main", "run", "helper"]);
	// Content alignment is padded for the appended sources.
	assert_eq!(bundle.sources_content.len(), 3);
	assert!(bundle.sources_content[0].is_some());
	assert!(bundle.sources_content[1].is_none());

	// A frame in the first chunk still resolves as before.
	let top = bundle.get_by_generated(1, 1, Bias::Exact).unwrap();
	assert_eq!(top.source_path, "src/app.ts");
	assert_eq!(top.name.as_deref(), Some("main"));

	// A frame in the second chunk resolves through the rebased tables.
	let shifted = bundle.get_by_generated(3, 1, Bias::Exact).unwrap();
	assert_eq!(shifted.source_path, "src/util.ts");
	assert_eq!(shifted.source_index, 1);
	assert_eq!(shifted.name.as_deref(), Some("helper"));

	let log = bundle.get_by_generated(4, 1, Bias::Exact).unwrap();
	assert_eq!(log.source_path, "src/log.ts");
	assert!(log.name.is_none());
}

#[test]
fn test_symbolicate_frame_with_context() {
	let map = chunk_a();

	// A minified stack frame at generated line 2, column 1 points into
	// the body of `main`.
	let hit = map
		.get_by_generated_with_code(
			2,
			1,
			Bias::Floor,
			CodeContextOpts {
				lines_before: 1,
				lines_after: 1,
			},
		)
		.unwrap();

	assert_eq!(hit.position.source_line, 2);
	assert_eq!(hit.position.name.as_deref(), Some("run"));
	let lines: Vec<&str> = hit
		.code_context
		.iter()
		.map(|l| l.content.as_str())
		.collect();
	assert_eq!(lines, vec!["export function main() {", "  run();", "}"]);
}

#[test]
fn test_reverse_queries_match_both_paths() {
	let mut bundle = chunk_a();
	bundle.concat(&chunk_b()).unwrap();

	let index = bundle.build_original_index();
	for source_index in 0..3 {
		for line in 1..4 {
			for column in 1..6 {
				for bias in [Bias::Exact, Bias::Floor, Bias::Ceil] {
					let scanned = bundle
						.store()
						.get_by_original(line, column, source_index, bias);
					let indexed = index.get(line, column, source_index, bias);
					assert_eq!(scanned, indexed);
				}
			}
		}
	}
}

#[test]
fn test_reemitted_bundle_is_stable() {
	let mut bundle = chunk_a();
	bundle.concat(&chunk_b()).unwrap();

	let json = bundle.to_json_string().unwrap();
	let reparsed = SourceMap::from_json(&json).unwrap();

	assert_eq!(reparsed.store().lines(), bundle.store().lines());
	assert_eq!(reparsed.to_json_string().unwrap(), json);
}
