//! Resource identity and pattern matching.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::Deserialize;

/// Minimal projection of a Kubernetes object: just enough to identify
/// and match it. Obtained by partial deserialization; everything else
/// in the document is ignored. Doubles as the diff engine's map key,
/// correlating repeated sightings of the same logical object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct KubeObject {
	#[serde(default)]
	pub kind: String,
	#[serde(default)]
	pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ObjectMeta {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub namespace: String,
}

impl KubeObject {
	/// True when every identity field is absent, i.e. the document was
	/// not a Kubernetes object envelope at all.
	pub fn is_empty(&self) -> bool {
		self.kind.is_empty() && self.metadata.name.is_empty() && self.metadata.namespace.is_empty()
	}

	/// All three components must match for the pattern to apply.
	pub fn matches(&self, pattern: &ResourcePattern) -> bool {
		matches_component(&pattern.kind, &self.kind)
			&& matches_component(&pattern.name, &self.metadata.name)
			&& matches_component(&pattern.namespace, &self.metadata.namespace)
	}
}

impl fmt::Display for KubeObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}/{}.{}",
			self.kind, self.metadata.name, self.metadata.namespace
		)
	}
}

/// Glob triple selecting resources. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePattern {
	pub kind: String,
	pub name: String,
	pub namespace: String,
}

impl FromStr for ResourcePattern {
	type Err = Infallible;

	/// Parse the `[kind/]name[.namespace]` selector syntax. Every
	/// input is a valid pattern; missing components stay empty and
	/// match anything.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut pattern = Self::default();
		let rest = match s.split_once('/') {
			Some((kind, rest)) => {
				pattern.kind = kind.to_string();
				rest
			}
			None => s,
		};
		match rest.split_once('.') {
			Some((name, namespace)) => {
				pattern.name = name.to_string();
				pattern.namespace = namespace.to_string();
			}
			None => pattern.name = rest.to_string(),
		}
		Ok(pattern)
	}
}

/// Single-component glob match: empty or `*` matches anything, a
/// single leading or trailing `*` matches by suffix/prefix, anything
/// else is exact. Empty values only match the match-all patterns.
pub fn matches_component(pattern: &str, value: &str) -> bool {
	if pattern.is_empty() || pattern == "*" {
		return true;
	}
	if value.is_empty() {
		return false;
	}
	if let Some(suffix) = pattern.strip_prefix('*') {
		return value.ends_with(suffix);
	}
	if let Some(prefix) = pattern.strip_suffix('*') {
		return value.starts_with(prefix);
	}
	pattern == value
}
