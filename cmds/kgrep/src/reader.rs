//! Streaming YAML document splitter.
//!
//! Splits the input into one serialized object per `read` call without
//! buffering the whole stream. Two physical encodings are supported:
//! bare documents separated by `---` lines, and the `kubectl get -o
//! yaml` List envelope whose items sit one indent level deep. The
//! encoding is sniffed once from the head of the input; both readers
//! implement the same next-document contract.

use std::io::BufRead;

use thiserror::Error;

/// YAML document separator, at column 0.
const SEPARATOR: &str = "---";

/// Opening lines of `kubectl get -o yaml` list output. When they head
/// the stream, followed by an item marker, the list fast path splits
/// items by indentation instead of reparsing the envelope.
const LIST_HEADER_LINES: [&str; 2] = ["apiVersion: v1\n", "items:\n"];

/// First two characters of the envelope key that follows the items
/// sequence (`kind: List`). A column-0 line starting with it means the
/// list is over.
const LIST_TRAILER: &str = "ki";

/// Errors surfaced while splitting the input into documents.
#[derive(Debug, Error)]
pub enum ReadError {
	/// A `---` separator carried trailing text that is not a comment.
	#[error("invalid yaml document separator: {trailing}")]
	InvalidSeparator { trailing: String },

	/// A list-encoded line that cannot carry the two-column item indent.
	#[error("malformed list item line: {line:?}")]
	MalformedListItem { line: String },

	#[error("reading input")]
	Io(#[from] std::io::Error),
}

/// Line source with lookahead.
///
/// Yields newline-terminated lines; a final line without a trailing
/// newline gets one appended. End of input is `Ok(None)` and repeats
/// on later calls. Lines pushed back with `unread` are replayed
/// most-recent-first; splitting needs a single line of lookahead, the
/// encoding sniff pushes back up to two.
pub struct LineReader<R> {
	reader: R,
	pending: Vec<String>,
}

impl<R: BufRead> LineReader<R> {
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			pending: Vec::new(),
		}
	}

	/// Consume and return the next line.
	pub fn read(&mut self) -> Result<Option<String>, ReadError> {
		if let Some(line) = self.pending.pop() {
			return Ok(Some(line));
		}
		let mut line = String::new();
		if self.reader.read_line(&mut line)? == 0 {
			return Ok(None);
		}
		if !line.ends_with('\n') {
			line.push('\n');
		}
		Ok(Some(line))
	}

	/// Look at the next line without consuming it.
	pub fn peek(&mut self) -> Result<Option<&str>, ReadError> {
		if self.pending.is_empty() {
			if let Some(line) = self.read()? {
				self.pending.push(line);
			}
		}
		Ok(self.pending.last().map(String::as_str))
	}

	/// Push a consumed line back; the next `read` returns it again.
	pub fn unread(&mut self, line: String) {
		self.pending.push(line);
	}
}

/// One-document-at-a-time reader over either physical encoding.
pub enum DocumentReader<R> {
	Flat(FlatReader<R>),
	List(ListReader<R>),
}

impl<R: BufRead> DocumentReader<R> {
	/// Sniff the head of the input and pick the encoding. For list
	/// input the envelope header is consumed up to, and excluding, the
	/// first item marker; for flat input every examined line is pushed
	/// back untouched. Sniffing goes through the line source, so the
	/// decision does not depend on how many bytes the underlying
	/// reader hands out per read.
	pub fn new(reader: R) -> Result<Self, ReadError> {
		let mut lines = LineReader::new(reader);
		if sniff_list(&mut lines)? {
			Ok(Self::List(ListReader { lines, done: false }))
		} else {
			Ok(Self::Flat(FlatReader { lines }))
		}
	}

	/// Return the next document, `Ok(None)` at end of input. Reading
	/// past the end keeps returning `Ok(None)`.
	pub fn read(&mut self) -> Result<Option<String>, ReadError> {
		match self {
			Self::Flat(r) => r.read(),
			Self::List(r) => r.read(),
		}
	}
}

/// Check for the list envelope header at the head of the input. The
/// header lines are left consumed only when the whole header matched,
/// with the first item marker still unread.
fn sniff_list<R: BufRead>(lines: &mut LineReader<R>) -> Result<bool, ReadError> {
	let Some(first) = lines.read()? else {
		return Ok(false);
	};
	if first != LIST_HEADER_LINES[0] {
		lines.unread(first);
		return Ok(false);
	}
	let Some(second) = lines.read()? else {
		lines.unread(first);
		return Ok(false);
	};
	let is_list = second == LIST_HEADER_LINES[1]
		&& matches!(lines.peek()?, Some(line) if line.starts_with('-'));
	if !is_list {
		lines.unread(second);
		lines.unread(first);
	}
	Ok(is_list)
}

/// Reader for bare concatenated documents separated by `---` lines.
pub struct FlatReader<R> {
	lines: LineReader<R>,
}

impl<R: BufRead> FlatReader<R> {
	fn read(&mut self) -> Result<Option<String>, ReadError> {
		let mut buffer = String::new();
		loop {
			let Some(line) = self.lines.read()? else {
				// Final document may lack a trailing separator.
				if buffer.is_empty() {
					return Ok(None);
				}
				return Ok(Some(buffer));
			};
			if let Some(rest) = line.strip_prefix(SEPARATOR) {
				let trailing = rest.trim();
				if !trailing.is_empty() && !trailing.starts_with('#') {
					return Err(ReadError::InvalidSeparator {
						trailing: trailing.to_string(),
					});
				}
				if !buffer.is_empty() {
					return Ok(Some(buffer));
				}
				// Leading or doubled separator, nothing accumulated yet.
				continue;
			}
			buffer.push_str(&line);
		}
	}
}

/// Reader for `v1/List` envelopes. Each item is rendered at one indent
/// level; stripping the two-column indent recovers the document.
pub struct ListReader<R> {
	lines: LineReader<R>,
	done: bool,
}

impl<R: BufRead> ListReader<R> {
	fn read(&mut self) -> Result<Option<String>, ReadError> {
		if self.done {
			return Ok(None);
		}
		let mut buffer = String::new();
		loop {
			let Some(line) = self.lines.read()? else {
				self.done = true;
				if buffer.is_empty() {
					return Ok(None);
				}
				return Ok(Some(buffer));
			};
			if line == "\n" {
				buffer.push('\n');
			} else if let Some(rest) = line.strip_prefix("- ") {
				if !buffer.is_empty() {
					// Start of the next item; leave the marker line
					// for the next call.
					self.lines.unread(line);
					return Ok(Some(buffer));
				}
				buffer.push_str(rest);
			} else if let Some(rest) = line.strip_prefix("  ") {
				buffer.push_str(rest);
			} else if line.starts_with(LIST_TRAILER) {
				// Unindented continuation of the envelope; the list is
				// over, the rest of the input carries no items.
				while self.lines.read()?.is_some() {}
				self.done = true;
				if buffer.is_empty() {
					return Ok(None);
				}
				return Ok(Some(buffer));
			} else {
				return Err(ReadError::MalformedListItem { line });
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use indoc::indoc;

	use super::*;

	fn read_all(input: &str) -> Vec<String> {
		let mut reader = DocumentReader::new(input.as_bytes()).unwrap();
		let mut docs = Vec::new();
		while let Some(doc) = reader.read().unwrap() {
			docs.push(doc);
		}
		docs
	}

	#[test]
	fn line_reader_appends_missing_newline() {
		let mut lines = LineReader::new("a\nb".as_bytes());
		assert_eq!(lines.read().unwrap().as_deref(), Some("a\n"));
		assert_eq!(lines.read().unwrap().as_deref(), Some("b\n"));
		assert_eq!(lines.read().unwrap(), None);
		assert_eq!(lines.read().unwrap(), None);
	}

	#[test]
	fn line_reader_peek_does_not_consume() {
		let mut lines = LineReader::new("a\nb\n".as_bytes());
		assert_eq!(lines.peek().unwrap(), Some("a\n"));
		assert_eq!(lines.read().unwrap().as_deref(), Some("a\n"));
		let line = lines.read().unwrap().unwrap();
		lines.unread(line);
		assert_eq!(lines.read().unwrap().as_deref(), Some("b\n"));
	}

	#[test]
	fn flat_splits_on_separator() {
		let docs = read_all(indoc! {"
			kind: Pod
			---
			kind: Service
		"});
		assert_eq!(docs, vec!["kind: Pod\n", "kind: Service\n"]);
	}

	#[test]
	fn flat_ignores_leading_and_doubled_separators() {
		let docs = read_all("---\nkind: Pod\n---\n---\nkind: Service\n");
		assert_eq!(docs, vec!["kind: Pod\n", "kind: Service\n"]);
	}

	#[test]
	fn flat_allows_comment_after_separator() {
		let docs = read_all("kind: Pod\n--- # source: chart\nkind: Service\n");
		assert_eq!(docs, vec!["kind: Pod\n", "kind: Service\n"]);
	}

	#[test]
	fn flat_rejects_garbage_after_separator() {
		let mut reader = DocumentReader::new("kind: Pod\n--- garbage\n".as_bytes()).unwrap();
		let err = reader.read().unwrap_err();
		match err {
			ReadError::InvalidSeparator { trailing } => assert_eq!(trailing, "garbage"),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn flat_empty_input() {
		assert!(read_all("").is_empty());
	}

	#[test]
	fn list_splits_items() {
		let docs = read_all(indoc! {"
			apiVersion: v1
			items:
			- kind: Pod
			  metadata:
			    name: a
			- kind: Pod
			  metadata:
			    name: b
			kind: List
			metadata:
			  resourceVersion: \"\"
		"});
		assert_eq!(
			docs,
			vec![
				"kind: Pod\nmetadata:\n  name: a\n",
				"kind: Pod\nmetadata:\n  name: b\n",
			]
		);
	}

	#[test]
	fn list_without_trailer_ends_at_eof() {
		let docs = read_all("apiVersion: v1\nitems:\n- kind: Pod\n");
		assert_eq!(docs, vec!["kind: Pod\n"]);
	}

	#[test]
	fn list_keeps_blank_lines_inside_items() {
		let docs = read_all("apiVersion: v1\nitems:\n- kind: ConfigMap\n\n  data: {}\n");
		assert_eq!(docs, vec!["kind: ConfigMap\n\ndata: {}\n"]);
	}

	#[test]
	fn list_rejects_short_line() {
		let mut reader = DocumentReader::new("apiVersion: v1\nitems:\n- kind: Pod\nx\n".as_bytes())
			.unwrap();
		let err = reader.read().unwrap_err();
		assert!(matches!(err, ReadError::MalformedListItem { .. }));
	}

	#[test]
	fn list_detected_through_small_buffered_reads() {
		let input = "apiVersion: v1\nitems:\n- kind: Pod\n  metadata:\n    name: a\nkind: List\n";
		// A tiny buffer hands out the header a few bytes at a time.
		let buffered = std::io::BufReader::with_capacity(4, input.as_bytes());
		let mut reader = DocumentReader::new(buffered).unwrap();
		let mut docs = Vec::new();
		while let Some(doc) = reader.read().unwrap() {
			docs.push(doc);
		}
		assert_eq!(docs, vec!["kind: Pod\nmetadata:\n  name: a\n"]);
	}

	#[test]
	fn near_list_header_stays_flat() {
		let input = "apiVersion: v1\nitems: []\nkind: List\n";
		assert_eq!(read_all(input), vec![input.to_string()]);
	}

	#[test]
	fn header_cut_short_by_eof_stays_flat() {
		assert_eq!(read_all("apiVersion: v1\n"), vec!["apiVersion: v1\n"]);
		assert_eq!(
			read_all("apiVersion: v1\nitems:\n"),
			vec!["apiVersion: v1\nitems:\n"]
		);
	}

	#[test]
	fn read_past_end_keeps_signaling_end() {
		let mut reader = DocumentReader::new("kind: Pod\n".as_bytes()).unwrap();
		assert!(reader.read().unwrap().is_some());
		assert!(reader.read().unwrap().is_none());
		assert!(reader.read().unwrap().is_none());
	}
}
