use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use rust_file_uploader::config::UploadConfig;
use rust_file_uploader::infrastructure::{logging, storage};
use rust_file_uploader::{AppState, create_app};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind, overrides APP_BIND_ADDRESS
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment, configuration and logging; any failure aborts startup
    dotenv().ok();
    let args = Args::parse();

    let mut config = UploadConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    config.validate().context("invalid configuration")?;

    logging::setup_logging(&config)?;

    info!("🚀 Starting upload service...");
    info!(
        "⚙️  Config: temp={:?} files={:?} chunk={}B max body={}MB",
        config.temp_path,
        config.files_path,
        config.chunk_size,
        config.max_upload_size / 1024 / 1024
    );

    // 2. Storage roots
    let storage_service = storage::setup_storage(&config).await?;

    // 3. HTTP
    let state = AppState::new(config.clone(), storage_service);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("could not bind {}", config.bind_address))?;

    info!("✅ Upload service listening on: http://{}", config.bind_address);
    info!(
        "📖 Swagger UI documentation: http://{}/swagger-ui",
        config.bind_address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Upload service exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
