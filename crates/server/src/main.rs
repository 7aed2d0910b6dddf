//! Turf Advisor Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use turf_advisor_config::{load_settings, Settings};
use turf_advisor_llm::{OpenAiChat, OpenAiChatConfig};
use turf_advisor_pipeline::{Backends, TurfAdvisor};
use turf_advisor_rag::{FileKnowledgeStore, HttpEmbedder, QdrantIndex};
use turf_advisor_server::{create_router, init_metrics, AppState};

const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // env vars override config/{env}.yaml, which overrides config/default.yaml
    let env = std::env::var("TURF_ADVISOR_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing is not initialized yet
            eprintln!(
                "Configuration loaded (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Turf Advisor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(environment = ?config.environment, "Configuration loaded");

    let metrics = if config.observability.metrics_enabled {
        let handle = init_metrics();
        tracing::info!("Prometheus recorder installed");
        handle
    } else {
        None
    };

    let chat = Arc::new(
        OpenAiChat::new(OpenAiChatConfig::from(&config.llm)).context("building chat client")?,
    );
    let index = QdrantIndex::connect(&config.vector_store).context("connecting to Qdrant")?;
    let embedder = HttpEmbedder::new(config.embedding.clone()).context("building embedding client")?;
    let knowledge = FileKnowledgeStore::load(&config.knowledge.dir).unwrap_or_else(|e| {
        tracing::warn!(dir = %config.knowledge.dir, error = %e, "Knowledge files unavailable");
        FileKnowledgeStore::default()
    });
    let sink = turf_advisor_persistence::connect_sink(&config.persistence).await;

    let advisor = TurfAdvisor::from_settings(
        &config,
        Backends {
            chat: chat.clone(),
            index: Arc::new(index),
            embedder: Arc::new(embedder),
            knowledge: Arc::new(knowledge),
            sink,
        },
    );

    let state = AppState::new(config.clone(), advisor)
        .with_metrics(metrics)
        .with_llm_probe(chat);

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            tick.tick().await;
            limiter.prune();
        }
    });

    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    tracing::info!(%addr, "Turf advisor listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.verification.calibration_path {
        match state.advisor.calibrator().save(path) {
            Ok(()) => tracing::info!(path = %path, "Calibration saved"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Calibration not saved"),
        }
    }

    tracing::info!("Turf advisor stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, draining connections");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, draining connections");
        }
    }
}

fn env_filter(config: &Settings) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("turf_advisor={},tower_http=debug", level).into()
    })
}

/// Tracing with an optional OTLP exporter
#[cfg(feature = "telemetry")]
fn init_tracing(config: &Settings) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let subscriber = tracing_subscriber::registry().with(env_filter(config));
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Some(otlp_endpoint) = &config.observability.otlp_endpoint {
        if config.observability.tracing_enabled {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(otlp_endpoint)
                .build();
            match exporter {
                Ok(exporter) => {
                    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
                        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(
                            opentelemetry_sdk::Resource::new(vec![
                                opentelemetry::KeyValue::new("service.name", "turf-advisor"),
                                opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                            ]),
                        ))
                        .build();
                    let tracer = provider.tracer("turf-advisor");
                    opentelemetry::global::set_tracer_provider(provider);
                    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                    subscriber.with(fmt_layer).with(otel_layer).init();
                    tracing::info!(endpoint = %otlp_endpoint, "Exporting spans over OTLP");
                    return;
                }
                Err(e) => eprintln!("OTLP exporter unavailable ({e}), logging to console only"),
            }
        }
    }
    subscriber.with(fmt_layer).init();
}

/// Console tracing only
#[cfg(not(feature = "telemetry"))]
fn init_tracing(config: &Settings) {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
