//! Kubelet serving CA ConfigMap reconciliation
//!
//! Mirrors the source CA bundle ConfigMap into the operand namespace under the
//! well-known name and keeps the copy converged. The engine is a pure function
//! of the cluster state observed at each invocation: fetch source, fetch
//! target, then apply the minimal write (create when absent, update when the
//! payload diverged, nothing when it already matches).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument};

#[cfg(test)]
use mockall::automock;

use crate::config::MirrorConfig;
use crate::{Error, Result, KUBELET_CA_CONFIGMAP_NAME};

/// Requeue interval after successful reconciliation (drift detection)
const REQUEUE_SUCCESS_SECS: u64 = 300;
/// Requeue interval after a write conflict (a fresh read resolves it)
const REQUEUE_CONFLICT_SECS: u64 = 5;
/// Requeue interval after other retryable errors
const REQUEUE_ERROR_SECS: u64 = 60;

/// Identity of a ConfigMap in the cluster: namespace plus name
///
/// Immutable once constructed; two names are equal iff both fields match
/// exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespacedName {
    /// Namespace the object lives in
    pub namespace: String,
    /// Object name, unique within the namespace
    pub name: String,
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait abstracting ConfigMap operations against the API server
///
/// This trait allows mocking the Kubernetes client in tests while using the
/// real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigMapStore: Send + Sync {
    /// Get a ConfigMap by namespace and name
    ///
    /// Returns `Ok(None)` when the object does not exist; absence is not an
    /// error and must be distinguished from every other failure.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;

    /// Create the given ConfigMap in its namespace
    async fn create(&self, cm: &ConfigMap) -> Result<()>;

    /// Replace an existing ConfigMap with the given copy
    ///
    /// The copy must carry the `resource_version` it was read with; the API
    /// server rejects the write with a conflict if the object has changed
    /// since, rather than silently overwriting a concurrent writer.
    async fn update(&self, cm: &ConfigMap) -> Result<()>;
}

/// Real Kubernetes-backed store implementation
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new KubeStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ConfigMapStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, cm: &ConfigMap) -> Result<()> {
        let namespace = cm.metadata.namespace.as_deref().unwrap_or_default();
        self.api(namespace).create(&PostParams::default(), cm).await?;
        Ok(())
    }

    async fn update(&self, cm: &ConfigMap) -> Result<()> {
        let namespace = cm.metadata.namespace.as_deref().unwrap_or_default();
        self.api(namespace)
            .replace(&cm.name_any(), &PostParams::default(), cm)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Pure Functions - Extracted for Unit Testability
// =============================================================================
// These functions contain the decision logic of the mirror with no I/O. They
// can be unit tested without mocking the Kubernetes client.

/// Namespaced name of the mirrored CA bundle in the operand namespace
///
/// The name is the well-known constant consumers mount by; only the namespace
/// varies.
pub fn kubelet_ca_configmap_name(target_namespace: &str) -> NamespacedName {
    NamespacedName {
        namespace: target_namespace.to_string(),
        name: KUBELET_CA_CONFIGMAP_NAME.to_string(),
    }
}

/// Build the desired target ConfigMap from the source's payload
///
/// Only identity and data are set. Labels, annotations and server-managed
/// metadata are deliberately left empty; the mirror carries nothing but the
/// bundle. The payload is cloned, so mutating the result never touches the
/// source.
pub fn desired_kubelet_ca_configmap(source: &ConfigMap, target: &NamespacedName) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            ..Default::default()
        },
        data: source.data.clone(),
        ..Default::default()
    }
}

/// Compare two ConfigMaps for the purpose of deciding whether an update is
/// necessary
///
/// Only the data payload matters; identity and metadata are ignored. A missing
/// map and an empty map both denote "no data" and compare equal.
pub fn configmaps_equal(a: &ConfigMap, b: &ConfigMap) -> bool {
    match (&a.data, &b.data) {
        (Some(a), Some(b)) => a == b,
        (Some(d), None) | (None, Some(d)) => d.is_empty(),
        (None, None) => true,
    }
}

// =============================================================================
// Convergence Engine
// =============================================================================

/// Ensure the source CA bundle has been mirrored into the operand namespace
///
/// Returns `Ok(None)` when the source does not exist: nothing to propagate is
/// a valid steady state, not an error, and an existing mirror is deliberately
/// left in place (never deleted). Otherwise returns the target as observed
/// after convergence; after a write it is re-read from the store so it carries
/// server-assigned fields.
///
/// Every store failure aborts the attempt immediately and surfaces to the
/// caller; the mirror stays at its last successfully converged value until a
/// later invocation succeeds. The engine performs no retries of its own.
pub async fn ensure_kubelet_ca_configmap(
    store: &dyn ConfigMapStore,
    config: &MirrorConfig,
) -> Result<Option<ConfigMap>> {
    let source = match store
        .get(&config.source_namespace, &config.ca_configmap_name)
        .await?
    {
        Some(source) => source,
        None => {
            debug!(
                namespace = %config.source_namespace,
                name = %config.ca_configmap_name,
                "source CA configmap not found, nothing to mirror"
            );
            return Ok(None);
        }
    };

    let target_name = kubelet_ca_configmap_name(&config.target_namespace);
    let target = store.get(&target_name.namespace, &target_name.name).await?;

    let desired = desired_kubelet_ca_configmap(&source, &target_name);

    match target {
        None => {
            store.create(&desired).await?;
            info!(
                namespace = %target_name.namespace,
                name = %target_name.name,
                "created kubelet CA configmap"
            );
            store.get(&target_name.namespace, &target_name.name).await
        }
        Some(current) if configmaps_equal(&current, &desired) => Ok(Some(current)),
        Some(current) => {
            // Write back the retrieved copy with only the payload replaced, so
            // its resource version travels with it and a concurrent writer
            // turns the replace into a conflict instead of a silent overwrite.
            let mut updated = current;
            updated.data = desired.data.clone();
            store.update(&updated).await?;
            info!(
                namespace = %target_name.namespace,
                name = %target_name.name,
                "updated kubelet CA configmap"
            );
            store.get(&target_name.namespace, &target_name.name).await
        }
    }
}

// =============================================================================
// Controller Glue
// =============================================================================

/// Shared context for the CA mirror controller
///
/// Shared across all reconciliation calls; holds the store handle and the
/// mirror configuration.
pub struct Context {
    /// ConfigMap store (trait object for testability)
    pub store: Arc<dyn ConfigMapStore>,
    /// Mirror configuration (source and target coordinates)
    pub config: MirrorConfig,
}

impl Context {
    /// Create a production context backed by the given Kubernetes client
    pub fn new(client: Client, config: MirrorConfig) -> Self {
        Self {
            store: Arc::new(KubeStore::new(client)),
            config,
        }
    }

    /// Create a context for tests with a custom store implementation
    #[cfg(test)]
    pub fn for_testing(store: Arc<dyn ConfigMapStore>, config: MirrorConfig) -> Self {
        Self { store, config }
    }
}

/// Reconcile the mirrored CA bundle
///
/// Invoked by the controller runtime whenever the source bundle or its mirror
/// changes, and periodically for drift detection. The watched object is only a
/// trigger: all state is re-read from the API server, so redundant invocations
/// are safe and produce no writes once converged.
#[instrument(skip_all, fields(configmap = %cm.name_any()))]
pub async fn reconcile(cm: Arc<ConfigMap>, ctx: Arc<Context>) -> Result<Action> {
    match ensure_kubelet_ca_configmap(ctx.store.as_ref(), &ctx.config).await? {
        Some(target) => {
            debug!(
                namespace = %ctx.config.target_namespace,
                name = %target.name_any(),
                "kubelet CA configmap converged"
            );
        }
        None => {
            debug!("no source CA bundle to mirror");
        }
    }
    Ok(Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS)))
}

/// Decide how to requeue after a failed reconciliation
///
/// Write conflicts retry quickly: the next attempt starts from a fresh read
/// and resolves them. Other retryable failures back off; non-retryable ones
/// (forbidden, invalid config) only resolve through external change, so they
/// fall back to the drift-detection cadence.
pub fn error_policy(cm: Arc<ConfigMap>, error: &Error, _ctx: Arc<Context>) -> Action {
    if error.is_conflict() {
        debug!(
            configmap = %cm.name_any(),
            "mirror write conflicted with a concurrent update, requeueing"
        );
        return Action::requeue(Duration::from_secs(REQUEUE_CONFLICT_SECS));
    }

    error!(?error, configmap = %cm.name_any(), "reconciliation failed");

    if error.is_retryable() {
        Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
    } else {
        Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS))
    }
}
