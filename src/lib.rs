//! kubelet-ca-mirror - keeps the kubelet serving CA bundle mirrored into the
//! operand namespace
//!
//! The kubelet serving CA bundle is published as a ConfigMap in a platform
//! namespace. Operand workloads can only mount ConfigMaps from their own
//! namespace, so this controller maintains a copy under a well-known name in
//! the operand namespace and converges it whenever the source changes.
//!
//! # Modules
//!
//! - [`controller`] - Reconciliation logic for the mirrored CA bundle
//! - [`config`] - Mirror configuration values (source and target coordinates)
//! - [`error`] - Error types for the controller
//!
//! The reconciler is level-triggered and stateless: every invocation re-reads
//! both ConfigMaps from the API server and applies the minimal write needed to
//! converge the mirror, so redundant invocations are always safe.

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Well-known name of the mirrored CA bundle ConfigMap in the operand namespace
///
/// Consumers mount the bundle by this name, so it is fixed rather than
/// configurable. Only the source coordinates vary by installation.
pub const KUBELET_CA_CONFIGMAP_NAME: &str = "kubelet-serving-ca";
