use std::net::{Ipv4Addr, SocketAddr};

use adapter::database::{connect_database_with, init_schema};
use anyhow::{Context, Result};
use api::job::Scheduler;
use api::route::{health::build_health_check_routers, v1};
use axum::Router;
use kernel::model::id::ChannelId;
use registry::AppRegistry;
use shared::config::AppConfig;
use shared::env::{which, Environment};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let pool = connect_database_with(&app_config.database);
    init_schema(&pool).await.context("スキーマの初期化に失敗しました")?;
    let registry = AppRegistry::new(pool, app_config);

    // 予約表と起動通知は失敗しても起動自体は続ける
    if let Err(e) = registry.reservation_board().init().await {
        tracing::warn!(error = %e, "予約表の初期化に失敗しました");
    }
    let startup_channel = registry.config().discord.startup_channel;
    if startup_channel != 0 {
        if let Err(e) = registry
            .chat()
            .send(ChannelId::new(startup_channel), "再起動しました。", None)
            .await
        {
            tracing::warn!(error = %e, "起動通知の送信に失敗しました");
        }
    }

    Scheduler::new(registry.clone()).spawn_all();

    let app = Router::new()
        .merge(build_health_check_routers())
        .merge(v1::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(registry);

    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 8080);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(error.cause_chain = ?e, error.message = %e, "Unexpected error")
        })
}
