use crate::backends::Backends;
use crate::config::TourpostConfig;
use crate::http::{AppState, TourpostMetrics};
use crate::reload::AgendaWatcher;
use std::sync::Arc;
use std::time::Duration;
use tourpost_core::AgendaStore;
use tracing::{error, info, warn};

pub async fn run(config: TourpostConfig) -> anyhow::Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(anyhow::anyhow!(
            "Invalid configuration:\n  - {}",
            errors.join("\n  - ")
        ));
    }
    for w in config.warnings() {
        warn!("{}", w);
    }

    info!("Starting tourpost server v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP: {}", config.server.http_addr);
    info!("Agenda: {:?}", config.server.agenda_path);

    let auth_enabled = config.security.auth_enabled;
    let auth_token = config.security.auth_token.clone();
    if auth_enabled {
        info!("Bearer token auth: enabled");
    } else {
        warn!("Auth disabled, tourpost is open to all connections on {}", config.server.http_addr);
    }

    // A malformed agenda at startup is fatal; later reloads only warn.
    let store = Arc::new(AgendaStore::open(&config.server.agenda_path)?);
    {
        let agenda = store.snapshot();
        info!(
            "Agenda loaded: {} ({} sessions, {} topics)",
            agenda.event.name,
            agenda.len(),
            agenda.known_topics().len()
        );
    }

    let metrics = Arc::new(TourpostMetrics::new());
    let backends = Backends::from_config(&config)?;

    let reload_task = if config.server.agenda_reload_secs > 0 {
        let watcher = AgendaWatcher::new(store.clone(), config.server.agenda_path.clone());
        let interval = Duration::from_secs(config.server.agenda_reload_secs);
        info!("Agenda hot reload every {:?}", interval);
        Some(tokio::spawn(watcher.run(interval, metrics.clone())))
    } else {
        info!("Agenda hot reload disabled");
        None
    };

    let app_state = AppState::new(
        store,
        backends,
        config.generation.clone(),
        config.event.clone(),
        metrics,
    );

    let http_auth_token = auth_token.clone();
    let app = crate::http::create_router(app_state).layer(axum::middleware::from_fn(
        move |req, next| {
            let tok = http_auth_token.clone();
            async move { crate::http::auth::check(req, next, auth_enabled, tok).await }
        },
    ));

    let addr = config.http_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP server on {}: {}", addr, e))?;
    let http_task = tokio::spawn(async move {
        info!("Starting HTTP server on {}", addr);
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server failed: {}", e);
        }
    });

    info!("Tourpost server ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, terminating...");

    http_task.abort();
    if let Some(task) = reload_task {
        task.abort();
    }

    Ok(())
}
