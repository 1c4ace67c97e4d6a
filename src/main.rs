//! kubelet-ca-mirror - mirrors the kubelet serving CA bundle into the operand namespace

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kubelet_ca_mirror::config::MirrorConfig;
use kubelet_ca_mirror::controller::{error_policy, reconcile, Context};
use kubelet_ca_mirror::KUBELET_CA_CONFIGMAP_NAME;

/// Watcher timeout (seconds) - must be less than the client read timeout (30s)
/// so the API server closes idle watches before the client gives up on them.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Mirror the kubelet serving CA bundle from a source namespace into the operand namespace
#[derive(Parser, Debug)]
#[command(name = "kubelet-ca-mirror", version, about, long_about = None)]
struct Cli {
    /// Namespace holding the source CA bundle ConfigMap
    #[arg(long, env = "SOURCE_NAMESPACE")]
    source_namespace: String,

    /// Name of the source CA bundle ConfigMap
    #[arg(long, env = "CA_CONFIGMAP_NAME", default_value = KUBELET_CA_CONFIGMAP_NAME)]
    ca_configmap_name: String,

    /// Operand namespace the bundle is mirrored into
    #[arg(long, env = "TARGET_NAMESPACE")]
    target_namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = MirrorConfig::new(
        cli.source_namespace,
        cli.ca_configmap_name,
        cli.target_namespace,
    );
    config.validate()?;

    let client = Client::try_default().await?;

    let source_api: Api<ConfigMap> = Api::namespaced(client.clone(), &config.source_namespace);
    let target_api: Api<ConfigMap> = Api::namespaced(client.clone(), &config.target_namespace);

    // Watch only the configured source bundle...
    let source_watch = WatcherConfig::default()
        .fields(&format!("metadata.name={}", config.ca_configmap_name))
        .timeout(WATCH_TIMEOUT_SECS);
    // ...and the well-known mirror, so edits or deletion of the copy
    // re-trigger convergence.
    let mirror_watch = WatcherConfig::default()
        .fields(&format!("metadata.name={KUBELET_CA_CONFIGMAP_NAME}"))
        .timeout(WATCH_TIMEOUT_SECS);

    // Mirror events map back to the source bundle, which is what the
    // reconciler is keyed on.
    let source_ref =
        ObjectRef::<ConfigMap>::new(&config.ca_configmap_name).within(&config.source_namespace);

    tracing::info!(
        source = %format!("{}/{}", config.source_namespace, config.ca_configmap_name),
        target = %format!("{}/{}", config.target_namespace, KUBELET_CA_CONFIGMAP_NAME),
        "starting kubelet CA mirror controller"
    );

    let ctx = Arc::new(Context::new(client, config));

    Controller::new(source_api, source_watch)
        .watches(target_api, mirror_watch, move |_mirror| {
            [source_ref.clone()]
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(object = %obj, ?action, "reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("controller shut down");
    Ok(())
}
