use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    signal::unix::{SignalKind, signal},
};
use tokio_util::sync::CancellationToken;

use sentinel::{
    audit::AuditStore,
    cli::config_path_from_args,
    config::Config,
    logging::init_tracing,
    model::{ModelPort, OpenAiCompatibleModel, ScriptedModel},
    observability::metrics::{MetricsRuntime, start_prometheus_exporter},
    orchestrator::{Orchestrator, OrchestratorConfig, TurnRequest},
    registry::{RegistryPersistence, ResourceRegistry, seed_state},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(target: "main", run_id = %logging_guard.run_id(), "sentinel_starting");

    if config.metrics.enabled {
        let listen_addr = match &config.metrics.listen_addr {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("invalid metrics.listen_addr '{addr}'"))?,
            None => MetricsRuntime::default_listen_addr(),
        };
        let runtime = start_prometheus_exporter(listen_addr)
            .context("failed to start prometheus exporter")?;
        tracing::info!(target: "main", addr = %runtime.listen_addr, "metrics_exporter_started");
    }

    let today = Utc::now().date_naive();
    let persistence = RegistryPersistence::new(config.registry.state_path.clone());
    let state = match persistence
        .load()
        .context("failed to load registry state")?
    {
        Some(state) => state,
        None => {
            let seeded = seed_state(today);
            persistence
                .save(&seeded)
                .context("failed to write seed registry state")?;
            tracing::info!(target: "main", path = %persistence.path().display(), "registry_seeded");
            seeded
        }
    };
    // A corrupt registry is fatal: refuse to serve rather than guess.
    let registry = Arc::new(
        ResourceRegistry::new(state, today).context("registry state failed validation")?,
    );

    let audit = Arc::new(
        AuditStore::with_log_path(config.audit.log_path.clone())
            .context("failed to open audit log")?,
    );

    let model: Arc<dyn ModelPort> = if config.model.enabled {
        let api_key = config
            .model
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        Arc::new(OpenAiCompatibleModel::new(
            config.model.endpoint.clone(),
            config.model.model_id.clone(),
            api_key,
            config.model.timeout(),
        )?)
    } else {
        // Rule tier only: an empty script always reports unreachable, which
        // routes every turn through the deterministic fallback.
        Arc::new(ScriptedModel::new())
    };

    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        audit,
        model,
        OrchestratorConfig {
            model_timeout: config.model.timeout(),
        },
    ));

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone())?;
    spawn_registry_reloader(
        registry.clone(),
        persistence.clone(),
        config.registry.reload_interval_secs,
        shutdown.clone(),
    );

    serve_stdio(orchestrator, shutdown).await
}

/// NDJSON turn loop: one `TurnRequest` per stdin line, one `TurnResponse`
/// per stdout line. The caller serializes turns per conversation.
async fn serve_stdio(
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: TurnRequest = match serde_json::from_str(trimmed) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(target: "main", error = %err, "invalid_turn_request");
                continue;
            }
        };

        let response = orchestrator.handle_turn(request, &shutdown).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!(target: "main", "sentinel_stopped");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        tracing::info!(target: "main", "shutdown_signal_received");
        shutdown.cancel();
    });
    Ok(())
}

fn spawn_registry_reloader(
    registry: Arc<ResourceRegistry>,
    persistence: RegistryPersistence,
    interval_secs: u64,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match persistence.load() {
                Ok(Some(state)) => {
                    let today = Utc::now().date_naive();
                    if let Err(err) = registry.reload(state, today) {
                        tracing::error!(target: "main", error = %err, "registry_reload_rejected");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(target: "main", error = %err, "registry_reload_failed");
                }
            }
        }
    });
}
