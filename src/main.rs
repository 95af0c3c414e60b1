use costatus::config::MonitorConfig;
use costatus::controller::monitor::DEFAULT_CACHE_SYNC_TIMEOUT;
use costatus::controller::{
    cache_sync_channel, new_monitor, CsvWatch, EventHandler, KubeClusterOperatorClient,
    MonitorError, Reporter, RunHandle, StatusWriter,
};
use costatus::crd::csv::Csv;
use costatus::server::{
    create_metrics, run_health_server, shutdown_channel, wait_for_signal, ReadinessState,
};
use kube::runtime::reflector;
use kube::{Api, Client};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Follow the monitor through startup and mark the pod ready once it runs
async fn supervise(handle: &mut RunHandle, readiness: &ReadinessState) -> Result<(), MonitorError> {
    handle.error().await?;
    if handle.ready().await {
        readiness.set_ready();
        info!("Monitor ready, processing CSV notifications");
    }
    handle.done().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting clusteroperator status reconciler");

    let config = match MonitorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let readiness = ReadinessState::new();
    let metrics = create_metrics()?;

    let client = match Client::try_default().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to create Kubernetes client");
            return Err(e.into());
        }
    };
    info!("Connected to Kubernetes cluster");

    let health_readiness = readiness.clone();
    let health_metrics = metrics.clone();
    let health_port = config.health_port;
    let health_handle = tokio::spawn(async move {
        if let Err(e) = run_health_server(health_port, health_readiness, health_metrics).await {
            warn!(error = %e, "Health server failed");
        }
    });

    let writer = StatusWriter::new(
        Arc::new(KubeClusterOperatorClient::new(client.clone())),
        Reporter::default(),
        Some(metrics.clone()),
    );
    let (monitor, sender) = new_monitor(
        config.operator_names.clone(),
        writer,
        config.channel_size,
    );
    let sender = sender.with_metrics(metrics.clone());

    let (reader, store_writer) = reflector::store::<Csv>();
    let mut handler = EventHandler::new(Arc::new(reader), Arc::new(sender));
    if let Some(ref expected) = config.expected_name {
        info!(expected = %expected, "Only handling CSVs labelled for the expected clusteroperator");
        handler = handler.with_expected_name(expected.clone());
    }

    let csvs: Api<Csv> = match config.namespace {
        Some(ref namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };
    let (notifier, cache_sync) = cache_sync_channel();
    let watch = CsvWatch::new(csvs, store_writer, Arc::new(handler), config.resync_period);
    let watch_handle = tokio::spawn(watch.run(notifier, shutdown_signal.clone()));

    let mut handle = monitor
        .with_probe_interval(config.probe_interval)
        .with_cache_sync(cache_sync, DEFAULT_CACHE_SYNC_TIMEOUT)
        .run(shutdown_signal);

    let outcome = tokio::select! {
        result = supervise(&mut handle, &readiness) => {
            if result.is_ok() {
                warn!("Monitor exited on its own");
            }
            result
        }
        signal = wait_for_signal() => {
            match signal {
                Ok(name) => info!(signal = name, "Initiating graceful shutdown"),
                Err(e) => error!(error = %e, "Failed to listen for termination signals"),
            }
            Ok(())
        }
    };

    readiness.set_not_ready();
    shutdown_controller.shutdown();

    info!("Stopping components...");
    handle.done().await;
    if let Err(e) = watch_handle.await {
        warn!(error = %e, "CSV watch task failed");
    }
    health_handle.abort();

    match outcome {
        Ok(()) => {
            info!("Status reconciler shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Status reconciler stopped after startup failure");
            Err(e.into())
        }
    }
}
