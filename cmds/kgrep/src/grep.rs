//! Pipeline driver: split → select → transform → diff → write.

use std::io::{BufRead, Write};

use serde_yaml::Mapping;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::{
	diff::{DiffMode, Differ},
	reader::{DocumentReader, ReadError},
	resource::KubeObject,
	selector::Selector,
	transform::{self, DisplayMode},
};

/// Separator emitted between output documents, reproducing the flat
/// multi-document convention regardless of the input encoding.
const SEPARATOR: &str = "---\n";

/// Errors aborting a pipeline run. One bad document fails the whole
/// stream; there is no partial recovery.
#[derive(Debug, Error)]
pub enum GrepError {
	#[error(transparent)]
	Read(#[from] ReadError),

	/// A document that could not be deserialized, carried verbatim for
	/// context.
	#[error("failed to parse document ({doc})")]
	Parse {
		doc: String,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("failed to re-serialize document")]
	Serialize(#[source] serde_yaml::Error),

	#[error("writing output")]
	Write(#[from] std::io::Error),
}

/// Pipeline configuration, already structured. Flag parsing lives in
/// the binary.
#[derive(Debug, Default, Clone)]
pub struct Opts {
	pub selector: Selector,
	pub mode: DisplayMode,
	pub diff: bool,
	pub diff_mode: DiffMode,
	pub decode: bool,
}

impl Opts {
	/// True when documents can pass through untouched, without even
	/// being parsed.
	fn passthrough(&self) -> bool {
		self.selector.matches_all()
			&& self.mode == DisplayMode::Full
			&& !self.decode
			&& !self.diff
	}

	/// True when the document must be fully deserialized because some
	/// transform rewrites it.
	fn rewrites(&self) -> bool {
		matches!(self.mode, DisplayMode::Clean | DisplayMode::CleanStatus)
			|| self.decode
			|| self.diff
	}
}

/// Run the pipeline over `input`, writing admitted documents to `out`.
/// Diff state lives for exactly one call; repeated invocations start
/// fresh.
#[instrument(skip_all, fields(mode = ?opts.mode, diff = opts.diff, decode = opts.decode))]
pub fn grep_resources<W: Write>(
	opts: &Opts,
	input: impl BufRead,
	mut out: W,
) -> Result<(), GrepError> {
	let mut reader = DocumentReader::new(input)?;
	let mut differ = Differ::new(opts.diff_mode);
	let mut first = true;

	let mut emit =
		|out: &mut W, differ: &mut Differ, obj: &KubeObject, text: String| -> Result<(), GrepError> {
			if !first && opts.mode != DisplayMode::Summary {
				out.write_all(SEPARATOR.as_bytes())?;
			}
			first = false;
			let text = if opts.diff { differ.add(obj, text) } else { text };
			out.write_all(text.as_bytes())?;
			Ok(())
		};

	while let Some(text) = reader.read()? {
		if opts.passthrough() {
			emit(&mut out, &mut differ, &KubeObject::default(), text)?;
			continue;
		}

		// Partial parse: only the identity envelope, not the document.
		let obj = parse::<KubeObject>(&text)?;
		if !opts.selector.admits(&obj, &text) {
			trace!(object = %obj, "rejected");
			continue;
		}

		if opts.mode == DisplayMode::Summary {
			if !obj.is_empty() {
				emit(&mut out, &mut differ, &obj, format!("{obj}\n"))?;
			}
		} else if opts.rewrites() {
			let mut raw = parse::<Mapping>(&text)?;
			transform::strip(&mut raw, opts.mode);
			if opts.decode {
				transform::decode(&mut raw, &obj.kind);
			}
			let rendered = if raw.is_empty() {
				// Stripping can consume the whole document; an empty
				// mapping must not render as `{}`.
				String::new()
			} else {
				serde_yaml::to_string(&raw).map_err(GrepError::Serialize)?
			};
			emit(&mut out, &mut differ, &obj, rendered)?;
		} else {
			emit(&mut out, &mut differ, &obj, text)?;
		}
	}
	out.flush()?;
	Ok(())
}

/// Deserialize a document, treating an all-whitespace document as the
/// type's empty value rather than a parse error.
fn parse<T: serde::de::DeserializeOwned + Default>(text: &str) -> Result<T, GrepError> {
	serde_yaml::from_str::<Option<T>>(text)
		.map(Option::unwrap_or_default)
		.map_err(|source| GrepError::Parse {
			doc: text.to_string(),
			source,
		})
}
