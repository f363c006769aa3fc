use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use altgate_server::state::AppState;

/// `altgate health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$ALTGATE_PORT/`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("ALTGATE_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("altgate=info".parse()?)
                .add_directive("altgate_server=info".parse()?)
                .add_directive("altgate_duckdb=info".parse()?),
        )
        .json()
        .init();

    let cfg = altgate_server::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    for name in cfg.insecure_defaults() {
        warn!(
            variable = name,
            "Using local-development default; set it before running in production"
        );
    }

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/altgate.db", cfg.data_dir);
    let db = altgate_duckdb::DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let state = Arc::new(AppState::new(db, cfg.clone())?);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = altgate_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        model = %cfg.openai_model,
        starter = cfg.plan_quotas.starter,
        pro = cfg.plan_quotas.pro,
        enterprise = cfg.plan_quotas.enterprise,
        "altgate listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("altgate stopped");
    Ok(())
}
