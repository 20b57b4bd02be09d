//! Grep-like filtering for streams of Kubernetes resources.
//!
//! The input is a stream of YAML documents, either separated by `---`
//! lines (`kubectl get -o yaml` applied to single resources, files on
//! disk, watch output) or wrapped in a `v1/List` envelope. Documents
//! are split without buffering the whole stream, matched against
//! resource selectors and an optional regex, optionally stripped of
//! server-generated noise, base64-decoded, and diffed across repeated
//! sightings of the same object identity.
//!
//! The binary installs as `kubectl-grep`; everything interesting lives
//! in this library so the pipeline can be driven from tests.

pub mod diff;
pub mod grep;
pub mod reader;
pub mod resource;
pub mod selector;
pub mod transform;
