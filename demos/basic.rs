//! Minimal API with request logging and a stand-in login endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i -X POST http://localhost:3000/api/auth/login \
//!        -H 'content-type: application/json' \
//!        -d '{"email":"a@b.com","password":"secret"}'
//!   curl -i -X POST http://localhost:3000/api/auth/login \
//!        -H 'content-type: application/json' \
//!        -d '{"email":"a@b.com","password":"wrong"}'
//!   curl -i http://localhost:3000/api/boom
//!   curl http://localhost:3000/healthz

use std::path::Path;

use http::StatusCode;
use noteworthy::config::AppConfig;
use noteworthy::middleware::RequestLogging;
use noteworthy::{BoxError, IntoResponse, Json, Request, Response, Router, Server, health, telemetry};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load(Path::new("noteworthy.toml"))?;
    telemetry::try_init(&config.logging)?;

    let logging = RequestLogging::from_config(&config.logging);

    let app = Router::new()
        .post("/api/auth/login", logging.wrap(login))
        .get("/api/boom", logging.wrap(boom))
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::bind(&config.server.addr)?.serve(app).await?;
    Ok(())
}

// POST /api/auth/login: accepts a single demo account.
async fn login(req: Request) -> Result<Response, BoxError> {
    let body: LoginBody = serde_json::from_slice(req.body())?;

    if body.email == "a@b.com" && body.password == "secret" {
        Ok(Json(json!({
            "accessToken": "demo-token",
            "user": { "id": 1, "email": body.email },
        })).into_response())
    } else {
        Ok((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid credentials" }))).into_response())
    }
}

// GET /api/boom: fails, to show the generic 500 and the error entry.
async fn boom(_req: Request) -> Result<Response, BoxError> {
    Err("storage backend unavailable".into())
}
