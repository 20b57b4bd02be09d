use std::io::{self, ErrorKind, Write};

use anyhow::{Context, Result};
use clap::Parser;
use kgrep::{
	diff::DiffMode,
	grep::{grep_resources, Opts},
	resource::ResourcePattern,
	selector::Selector,
	transform::DisplayMode,
};
use regex::Regex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// A plugin to grep Kubernetes resources.
///
/// Reads YAML from stdin (flat multi-document streams or `v1/List`
/// output) and writes the selected, optionally transformed documents
/// to stdout.
#[derive(Parser)]
#[command(name = "kubectl-grep", version)]
struct Cli {
	/// Resource selectors, format: [kind/]name[.namespace]; every
	/// component accepts a single leading or trailing `*`
	pub resources: Vec<ResourcePattern>,

	/// Summarize each object as one kind/name.namespace line
	#[arg(short = 's', long)]
	pub summary: bool,

	/// Strip generated fields
	#[arg(short = 'n', long)]
	pub clean: bool,

	/// Strip generated fields, including status
	#[arg(short = 'N', long)]
	pub clean_status: bool,

	/// Only show objects whose text matches this regex
	#[arg(short = 'e', long)]
	pub regex: Option<String>,

	/// Invert the regex match
	#[arg(short = 'v', long, requires = "regex")]
	pub invert_match: bool,

	/// Base64-decode Secret data and ConfigMap binaryData values
	#[arg(short = 'd', long)]
	pub decode: bool,

	/// Diff repeated sightings of the same object (for watch streams)
	#[arg(long)]
	pub diff: bool,

	/// Diff rendering
	#[arg(long, value_enum, default_value_t = DiffModeArg::Line)]
	pub diff_mode: DiffModeArg,

	/// Log level (error, warn, info, debug, trace)
	#[arg(long, default_value = "info")]
	pub log_level: String,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum DiffModeArg {
	Line,
	Inline,
}

impl From<DiffModeArg> for DiffMode {
	fn from(arg: DiffModeArg) -> Self {
		match arg {
			DiffModeArg::Line => Self::Line,
			DiffModeArg::Inline => Self::Inline,
		}
	}
}

impl Cli {
	fn display_mode(&self) -> DisplayMode {
		if self.summary {
			DisplayMode::Summary
		} else if self.clean_status {
			DisplayMode::CleanStatus
		} else if self.clean {
			DisplayMode::Clean
		} else {
			DisplayMode::Full
		}
	}
}

/// Initialize tracing to stderr; RUST_LOG overrides the flag.
fn init_logger(level: &str) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
		.init();
}

/// Writer that swallows broken pipe errors, so piping into `head`
/// exits cleanly instead of failing mid-stream.
struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logger(&cli.log_level);

	let regex = cli
		.regex
		.as_deref()
		.map(Regex::new)
		.transpose()
		.context("invalid --regex")?;

	let opts = Opts {
		selector: Selector {
			resources: cli.resources.clone(),
			regex,
			invert_regex: cli.invert_match,
		},
		mode: cli.display_mode(),
		diff: cli.diff,
		diff_mode: cli.diff_mode.into(),
		decode: cli.decode,
	};

	let stdin = io::stdin().lock();
	let stdout = BrokenPipeGuard {
		inner: io::stdout().lock(),
	};
	grep_resources(&opts, stdin, stdout)?;
	Ok(())
}
