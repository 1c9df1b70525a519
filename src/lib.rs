//! # noteworthy
//!
//! The runtime behind Noteworthy's API routes and the login page's client flow.
//!
//! ## What's here
//!
//! - Radix-tree routing over hyper, with graceful shutdown
//! - Request logging middleware: a correlation id per request (returned as
//!   `x-request-id`), structured start/end entries, latency with slow-request
//!   warnings, and handler failures turned into a generic 500
//! - The login page as a state machine: form validation, the call to the
//!   auth service, banners, and the redirect to the dashboard
//!
//! What this crate leaves to others: issuing tokens and storing sessions
//! belong to the auth service; drawing the page belongs to the UI.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use noteworthy::middleware::RequestLogging;
//! use noteworthy::{BoxError, Json, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), noteworthy::Error> {
//!     let app = Router::new()
//!         .get("/api/notes/{id}", get_note)
//!         .with_request_logging(RequestLogging::new());
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_note(req: Request) -> Result<Response, BoxError> {
//!     let id: u64 = req.param("id").unwrap_or_default().parse()?;
//!     if id == 0 {
//!         return Ok(Response::status(StatusCode::NOT_FOUND));
//!     }
//!     Ok(Json(serde_json::json!({ "id": id })).into_response())
//! }
//! # use noteworthy::IntoResponse;
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod health;
pub mod login;
pub mod middleware;
pub mod telemetry;

pub use error::{BoxError, Error};
pub use handler::{Handler, HandlerOutput, Outcome};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
