//! Admission predicate combining resource patterns and a raw-text regex.

use regex::Regex;

use crate::resource::{KubeObject, ResourcePattern};

/// Combined admit/reject predicate for one pipeline run.
///
/// Resource patterns are ORed: any matching pattern admits. The regex,
/// when present, applies to the raw document text and short-circuits
/// rejection before the patterns are consulted.
#[derive(Debug, Default, Clone)]
pub struct Selector {
	pub resources: Vec<ResourcePattern>,
	pub regex: Option<Regex>,
	pub invert_regex: bool,
}

impl Selector {
	/// True when the selector cannot reject anything. The pipeline
	/// driver uses this to skip parsing entirely in passthrough mode.
	pub fn matches_all(&self) -> bool {
		self.resources.is_empty() && self.regex.is_none()
	}

	pub fn admits(&self, obj: &KubeObject, text: &str) -> bool {
		if let Some(regex) = &self.regex {
			if regex.is_match(text) == self.invert_regex {
				return false;
			}
		}
		if self.resources.is_empty() {
			return true;
		}
		self.resources.iter().any(|r| obj.matches(r))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pod() -> (KubeObject, &'static str) {
		let text = "kind: Pod\nmetadata:\n  name: nginx\n  namespace: default\n";
		(serde_yaml::from_str(text).unwrap(), text)
	}

	#[test]
	fn empty_selector_matches_all() {
		let selector = Selector::default();
		assert!(selector.matches_all());
		let (obj, text) = pod();
		assert!(selector.admits(&obj, text));
	}

	#[test]
	fn any_pattern_admits() {
		let selector = Selector {
			resources: vec![
				"Service/*".parse().unwrap(),
				"Pod/nginx".parse().unwrap(),
			],
			..Selector::default()
		};
		assert!(!selector.matches_all());
		let (obj, text) = pod();
		assert!(selector.admits(&obj, text));
	}

	#[test]
	fn no_pattern_matches_rejects() {
		let selector = Selector {
			resources: vec!["Service/*".parse().unwrap()],
			..Selector::default()
		};
		let (obj, text) = pod();
		assert!(!selector.admits(&obj, text));
	}

	#[test]
	fn regex_short_circuits_patterns() {
		let selector = Selector {
			resources: vec!["Pod/nginx".parse().unwrap()],
			regex: Some(Regex::new("no-such-text").unwrap()),
			invert_regex: false,
		};
		let (obj, text) = pod();
		assert!(!selector.admits(&obj, text));
	}

	#[test]
	fn inverted_regex_rejects_matches() {
		let selector = Selector {
			resources: vec![],
			regex: Some(Regex::new("nginx").unwrap()),
			invert_regex: true,
		};
		let (obj, text) = pod();
		assert!(!selector.admits(&obj, text));

		let selector = Selector {
			invert_regex: false,
			..selector
		};
		assert!(selector.admits(&obj, text));
	}
}
