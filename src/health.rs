//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can it serve traffic? Failure → pulled from rotation. |
//!
//! ```rust,no_run
//! use noteworthy::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Probes are usually registered without request logging; they would
//! otherwise dominate the log stream.

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it if readiness depends on the
/// auth backend or another downstream service.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
