//! Controller implementation for the mirrored CA bundle
//!
//! This module contains the reconciliation logic for the kubelet serving CA
//! ConfigMap. The controller follows the Kubernetes controller pattern with an
//! observe-diff-act loop.

mod ca_configmap;

pub use ca_configmap::{
    configmaps_equal, desired_kubelet_ca_configmap, ensure_kubelet_ca_configmap, error_policy,
    kubelet_ca_configmap_name, reconcile, ConfigMapStore, Context, KubeStore, NamespacedName,
};
