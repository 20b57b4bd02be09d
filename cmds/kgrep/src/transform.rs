//! Field stripping and payload decoding.
//!
//! Clean modes remove the server-generated metadata that makes
//! `kubectl get -o yaml` output noisy to review; the decode flag
//! recovers base64 payloads from Secrets and ConfigMaps in place.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_yaml::{Mapping, Value};

/// How an admitted document is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
	/// Original text, byte for byte when no transform applies.
	#[default]
	Full,
	/// One `kind/name.namespace` line per object.
	Summary,
	/// Generated fields stripped.
	Clean,
	/// Generated fields and the `status` subtree stripped.
	CleanStatus,
}

/// Server-populated fields with no information a human reviewer wants.
const GENERATED_FIELDS: &[&[&str]] = &[
	&[
		"metadata",
		"annotations",
		"kubectl.kubernetes.io/last-applied-configuration",
	],
	&["metadata", "generation"],
	&["metadata", "resourceVersion"],
	&["metadata", "selfLink"],
	&["metadata", "uid"],
	&["metadata", "creationTimestamp"],
	&["metadata", "generateName"],
	&["metadata", "ownerReferences"],
	&["metadata", "managedFields"],
	&["metadata", "labels", "pod-template-hash"],
];

/// Strip generated fields in place. A no-op outside the clean modes.
pub fn strip(raw: &mut Mapping, mode: DisplayMode) {
	if matches!(mode, DisplayMode::Clean | DisplayMode::CleanStatus) {
		for path in GENERATED_FIELDS {
			delete_nested(raw, path);
		}
	}
	if mode == DisplayMode::CleanStatus {
		delete_nested(raw, &["status"]);
	}
}

/// Delete the key at `path`, descending through nested mappings. Each
/// parent mapping along the path that the deletion left empty is
/// removed from its own parent in turn; mappings off the path are
/// never touched.
fn delete_nested(raw: &mut Mapping, path: &[&str]) {
	let [head, rest @ ..] = path else {
		return;
	};
	let key = Value::from(*head);
	if rest.is_empty() {
		raw.remove(&key);
		return;
	}
	let mut emptied = false;
	if let Some(Value::Mapping(child)) = raw.get_mut(&key) {
		delete_nested(child, rest);
		emptied = child.is_empty();
	}
	if emptied {
		raw.remove(&key);
	}
}

/// Base64-decode opaque payloads in place: `data` for Secrets,
/// `binaryData` for ConfigMaps. Values that are not strings, fail to
/// decode, or do not decode to UTF-8 stay as they are.
pub fn decode(raw: &mut Mapping, kind: &str) {
	let field = match kind {
		"Secret" => "data",
		"ConfigMap" => "binaryData",
		_ => return,
	};
	let Some(Value::Mapping(data)) = raw.get_mut(&Value::from(field)) else {
		return;
	};
	for (_, value) in data.iter_mut() {
		if let Value::String(encoded) = value {
			if let Ok(decoded) = BASE64.decode(encoded.as_bytes()) {
				if let Ok(text) = String::from_utf8(decoded) {
					*value = Value::String(text);
				}
			}
		}
	}
}
