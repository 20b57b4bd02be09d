//! Stateful diffing of repeated object sightings.
//!
//! Watch-style streams emit the same logical object many times. The
//! differ remembers the last rendered text per identity and, from the
//! second sighting on, prints what changed instead of the full text.

use std::collections::HashMap;

use nu_ansi_term::Color;
use serde_yaml::{Mapping, Sequence, Value};
use similar::{utils::diff_chars, Algorithm, ChangeTag};

use crate::resource::KubeObject;

/// Rendering used for repeated sightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
	/// Structural diff of the parsed YAML trees.
	#[default]
	Line,
	/// Character diff, ANSI-annotated inline.
	Inline,
}

/// Last rendered text per object identity. Owned by one pipeline
/// invocation; construct a fresh one per run.
pub struct Differ {
	mode: DiffMode,
	seen: HashMap<KubeObject, String>,
}

impl Differ {
	pub fn new(mode: DiffMode) -> Self {
		Self {
			mode,
			seen: HashMap::new(),
		}
	}

	/// Record `now` as the latest text for `obj` and return what
	/// should be printed: the text itself on first sighting, a
	/// rendered diff against the previous text afterwards.
	pub fn add(&mut self, obj: &KubeObject, now: String) -> String {
		match self.seen.insert(obj.clone(), now.clone()) {
			None => now,
			Some(old) => match self.mode {
				DiffMode::Line => line_diff(&old, &now),
				DiffMode::Inline => inline_diff(&old, &now),
			},
		}
	}
}

/// Marker prefixes for the structural rendering. Every line of the
/// dump carries one, mirroring the usual yaml-diff output shape.
const CONTEXT: &str = "  ";
const REMOVED: &str = "- ";
const ADDED: &str = "+ ";

/// Structural diff: parse both texts as YAML and dump the tree with
/// changed entries annotated. Diffed texts are always re-serialized
/// documents or summary lines from this pipeline; anything that still
/// fails to parse is treated as the null document.
fn line_diff(old: &str, now: &str) -> String {
	let old_value = serde_yaml::from_str::<Value>(old).unwrap_or(Value::Null);
	let new_value = serde_yaml::from_str::<Value>(now).unwrap_or(Value::Null);
	let mut out = String::new();
	diff_value(&mut out, 0, &old_value, &new_value);
	out
}

fn diff_value(out: &mut String, depth: usize, old: &Value, new: &Value) {
	match (old, new) {
		(Value::Mapping(o), Value::Mapping(n)) => diff_mapping(out, depth, o, n),
		(Value::Sequence(o), Value::Sequence(n)) => diff_sequence(out, depth, o, n),
		_ if old == new => dump(out, CONTEXT, depth, old),
		_ => {
			dump(out, REMOVED, depth, old);
			dump(out, ADDED, depth, new);
		}
	}
}

fn diff_mapping(out: &mut String, depth: usize, old: &Mapping, new: &Mapping) {
	for (key, old_value) in old {
		match new.get(key) {
			Some(new_value) if old_value == new_value => {
				dump_entry(out, CONTEXT, depth, key, old_value);
			}
			Some(new_value) => match (old_value, new_value) {
				(Value::Mapping(_), Value::Mapping(_))
				| (Value::Sequence(_), Value::Sequence(_)) => {
					dump_key(out, depth, key);
					diff_value(out, depth + 1, old_value, new_value);
				}
				_ => {
					dump_entry(out, REMOVED, depth, key, old_value);
					dump_entry(out, ADDED, depth, key, new_value);
				}
			},
			None => dump_entry(out, REMOVED, depth, key, old_value),
		}
	}
	for (key, new_value) in new {
		if old.get(key).is_none() {
			dump_entry(out, ADDED, depth, key, new_value);
		}
	}
}

fn diff_sequence(out: &mut String, depth: usize, old: &Sequence, new: &Sequence) {
	let shared = old.len().min(new.len());
	for (old_item, new_item) in old.iter().zip(new.iter()) {
		if old_item == new_item {
			dump_item(out, CONTEXT, depth, old_item);
		} else {
			dump_item(out, REMOVED, depth, old_item);
			dump_item(out, ADDED, depth, new_item);
		}
	}
	for item in &old[shared..] {
		dump_item(out, REMOVED, depth, item);
	}
	for item in &new[shared..] {
		dump_item(out, ADDED, depth, item);
	}
}

/// Append a serialized value, every line prefixed with the marker and
/// the indentation for `depth`.
fn dump(out: &mut String, marker: &str, depth: usize, value: &Value) {
	let text = serde_yaml::to_string(value).unwrap_or_default();
	prefix_lines(out, marker, depth, &text);
}

/// Append one `key: value` mapping entry.
fn dump_entry(out: &mut String, marker: &str, depth: usize, key: &Value, value: &Value) {
	let mut entry = Mapping::new();
	entry.insert(key.clone(), value.clone());
	let text = serde_yaml::to_string(&entry).unwrap_or_default();
	prefix_lines(out, marker, depth, &text);
}

/// Append a bare `key:` context line introducing a changed subtree.
fn dump_key(out: &mut String, depth: usize, key: &Value) {
	let rendered = serde_yaml::to_string(key).unwrap_or_default();
	let line = format!("{}:\n", rendered.trim_end());
	prefix_lines(out, CONTEXT, depth, &line);
}

/// Append one sequence element, rendered with its `- ` item marker.
fn dump_item(out: &mut String, marker: &str, depth: usize, item: &Value) {
	let text = serde_yaml::to_string(&Sequence::from(vec![item.clone()])).unwrap_or_default();
	prefix_lines(out, marker, depth, &text);
}

fn prefix_lines(out: &mut String, marker: &str, depth: usize, text: &str) {
	for line in text.lines() {
		out.push_str(marker);
		for _ in 0..depth {
			out.push_str("  ");
		}
		out.push_str(line);
		out.push('\n');
	}
}

/// Character diff rendered inline: deletions red, insertions green.
/// Runs of equal-tagged characters come back pre-grouped, so each
/// annotation covers a contiguous span.
fn inline_diff(old: &str, now: &str) -> String {
	let mut out = String::new();
	for (tag, span) in diff_chars(Algorithm::Myers, old, now) {
		match tag {
			ChangeTag::Equal => out.push_str(span),
			ChangeTag::Delete => out.push_str(&Color::Red.paint(span).to_string()),
			ChangeTag::Insert => out.push_str(&Color::Green.paint(span).to_string()),
		}
	}
	out
}
