//! Mirror configuration values
//!
//! Flag and environment parsing lives in the binary; the library consumes the
//! resulting plain values.

use crate::{Error, Result, KUBELET_CA_CONFIGMAP_NAME};

/// Configuration for the CA bundle mirror controller
///
/// The target ConfigMap name is not part of the configuration: it is the
/// well-known [`KUBELET_CA_CONFIGMAP_NAME`] that consumers mount by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Namespace holding the source CA bundle ConfigMap
    pub source_namespace: String,
    /// Name of the source CA bundle ConfigMap
    pub ca_configmap_name: String,
    /// Operand namespace the bundle is mirrored into
    pub target_namespace: String,
}

impl MirrorConfig {
    /// Create a new mirror configuration
    pub fn new(
        source_namespace: impl Into<String>,
        ca_configmap_name: impl Into<String>,
        target_namespace: impl Into<String>,
    ) -> Self {
        Self {
            source_namespace: source_namespace.into(),
            ca_configmap_name: ca_configmap_name.into(),
            target_namespace: target_namespace.into(),
        }
    }

    /// Validate the configuration
    ///
    /// All coordinates must be non-empty, and the source must not be the
    /// mirror itself (same namespace and the well-known name), which would
    /// make the controller copy the ConfigMap onto itself.
    pub fn validate(&self) -> Result<()> {
        if self.source_namespace.is_empty() {
            return Err(Error::validation("source namespace must not be empty"));
        }
        if self.ca_configmap_name.is_empty() {
            return Err(Error::validation("CA configmap name must not be empty"));
        }
        if self.target_namespace.is_empty() {
            return Err(Error::validation("target namespace must not be empty"));
        }
        if self.source_namespace == self.target_namespace
            && self.ca_configmap_name == KUBELET_CA_CONFIGMAP_NAME
        {
            return Err(Error::validation(format!(
                "source {}/{} is the mirror target itself",
                self.source_namespace, self.ca_configmap_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let config = MirrorConfig::new("openshift-config-managed", "kubelet-serving-ca", "node-observability");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn same_namespace_with_different_source_name_passes() {
        // Mirroring within one namespace is fine as long as the names differ
        let config = MirrorConfig::new("node-observability", "upstream-ca-bundle", "node-observability");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_coordinates_are_rejected() {
        for config in [
            MirrorConfig::new("", "kubelet-serving-ca", "node-observability"),
            MirrorConfig::new("openshift-config-managed", "", "node-observability"),
            MirrorConfig::new("openshift-config-managed", "kubelet-serving-ca", ""),
        ] {
            let err = config.validate().expect_err("empty coordinate should be rejected");
            assert!(err.to_string().contains("must not be empty"), "{err}");
        }
    }

    #[test]
    fn source_equal_to_target_is_rejected() {
        let config = MirrorConfig::new("node-observability", KUBELET_CA_CONFIGMAP_NAME, "node-observability");
        let err = config.validate().expect_err("self-mirror should be rejected");
        assert!(err.to_string().contains("mirror target itself"), "{err}");
    }
}
