use std::net::TcpListener;

use anyhow::Context;

use subscription_service::app;
use subscription_service::repo::{postgres, PgTransactor};
use subscription_service::service::Engine;
use subscription_service::settings::Settings;
use subscription_service::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    let subscriber = telemetry::create_subscriber(settings.log.env_filter(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let pool = postgres::connect_with_retry(&settings.database).await?;
    postgres::migrate(&pool).await?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let engine = Engine::new(PgTransactor::new(pool));

    app::run(listener, engine)?.await.context("Failed to run app")
}
