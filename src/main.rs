//! # REST Server - Entry Point
//! src/main.rs
//!
//! Levanta el servidor con la configuración de CLI/entorno y un conjunto
//! pequeño de handlers de demostración.

use rest_server::config::Config;
use rest_server::http::{HandlerError, HttpError, Method, Response, StatusCode};
use rest_server::router::{Router, RouterError};
use rest_server::server::Server;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Status {
    server: &'static str,
    version: &'static str,
    uptime_secs: u64,
    requests: u64,
}

#[derive(Deserialize)]
struct Greeting {
    name: String,
}

#[derive(Serialize)]
struct GreetingReply {
    message: String,
}

fn routes() -> Result<Router, RouterError> {
    let started = Instant::now();
    let served = Arc::new(AtomicU64::new(0));
    let mut router = Router::new();

    router.register(Method::GET, "/", |_req| Ok(Response::text("OK")))?;

    let counter = Arc::clone(&served);
    router.register(Method::GET, "/status", move |_req| {
        let status = Status {
            server: "rest_server",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: started.elapsed().as_secs(),
            requests: counter.fetch_add(1, Ordering::Relaxed) + 1,
        };
        let body = serde_json::to_string(&status).map_err(HandlerError::internal)?;
        Ok(Response::json(&body))
    })?;

    router.register(Method::GET, "/hello/[A-Za-z]+", |req| {
        let name = req.path().trim_start_matches("/hello/");
        Ok(Response::text(&format!("Hello, {}!", name)))
    })?;

    router.register(Method::POST, "/echo", |req| {
        Ok(Response::new(StatusCode::Ok)
            .with_content_type(req.header_ignore_case("Content-Type").unwrap_or("text/plain"))
            .with_body(req.body().unwrap_or_default()))
    })?;

    router.register(Method::POST, "/greet", |req| {
        let greeting: Greeting = serde_json::from_slice(req.body().unwrap_or_default())
            .map_err(|_| HttpError::bad_request())?;
        let reply = GreetingReply {
            message: format!("Hello, {}!", greeting.name),
        };
        let body = serde_json::to_string(&reply).map_err(HandlerError::internal)?;
        Ok(Response::json(&body))
    })?;

    Ok(router)
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rest_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new();
    config.log_summary();

    let router = match routes() {
        Ok(router) => router,
        Err(e) => {
            error!(error = %e, "invalid route table");
            std::process::exit(1);
        }
    };
    info!(routes = router.len(), "routes registered");

    let server = match Server::bind(&config, router) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    // Bloquea el thread principal aceptando conexiones
    if let Err(e) = server.run() {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
