use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::controller::{offers, subscriptions, RestError};
use crate::repo::Transactor;
use crate::service::Engine;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run<T: Transactor>(listener: TcpListener, engine: Engine<T>) -> anyhow::Result<Server> {
    // Wrap application data
    let engine = web::Data::new(engine);

    // Malformed bodies, queries, and paths are reported like any other parse failure
    let json_config = web::JsonConfig::default()
        .error_handler(|e, _req| RestError::ParseError(e.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|e, _req| RestError::ParseError(e.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|e, _req| RestError::ParseError(e.to_string()).into());

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(engine.clone())
            .app_data(json_config.clone())
            .app_data(query_config.clone())
            .app_data(path_config.clone())
            .service(health_check)
            .service(offers::scope::<T>())
            .service(subscriptions::scope::<T>())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
