use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use driftflake::{Driftflake, IdParts};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Serves decomposed driftflake IDs over HTTP")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "DRIFTFLAKE_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Fixed 16-bit machine ID, overriding private IP discovery.
    #[arg(long, env = "DRIFTFLAKE_MACHINE_ID")]
    machine_id: Option<u16>,

    /// Epoch override in milliseconds since the Unix epoch.
    #[arg(long, env = "DRIFTFLAKE_EPOCH_MS")]
    epoch_ms: Option<u64>,
}

// The generator is the composition root's: built once here, shared through
// axum state. No process-wide singleton.
#[derive(Clone)]
struct AppState {
    generator: Arc<Driftflake>,
}

async fn handler(State(state): State<AppState>) -> Result<Json<IdParts>, (StatusCode, String)> {
    let generator = Arc::clone(&state.generator);
    // Allocation may sleep up to one tick under the generator's lock; keep
    // it off the async worker threads.
    let id = tokio::task::spawn_blocking(move || generator.next_id())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(id.decompose()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = CliArgs::parse();

    let mut builder = Driftflake::builder();
    if let Some(epoch_ms) = args.epoch_ms {
        builder = builder.epoch(Duration::from_millis(epoch_ms));
    }
    if let Some(machine_id) = args.machine_id {
        builder = builder.machine_id(move || Ok(machine_id));
    }
    let generator = builder.build()?;
    tracing::info!(machine_id = generator.machine_id(), "generator ready");

    let state = AppState {
        generator: Arc::new(generator),
    };
    let app = Router::new().route("/", get(handler)).with_state(state);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
