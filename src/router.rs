//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler. Request logging can be applied per handler with
//! [`with_request_logging`](crate::middleware::with_request_logging) or to
//! every route at once with [`Router::with_request_logging`].

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler, Outcome};
use crate::middleware::RequestLogging;
use crate::request::Request;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    logging: Option<RequestLogging>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use noteworthy::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_note(_: Request) -> Response { Response::text("") }
    /// # async fn delete_note(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::DELETE, "/notes/{id}", delete_note)
    ///     .on(Method::GET,    "/notes/{id}", get_note);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on an invalid or conflicting route pattern. Routes are fixed at
    /// startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Registers `handler` wrapped with `logging`, leaving other routes as
    /// they are.
    pub fn on_logged(self, method: Method, path: &str, logging: &RequestLogging, handler: impl Handler) -> Self {
        self.on(method, path, logging.wrap(handler))
    }

    /// Runs every matched route, registered before or after this call,
    /// through `logging`.
    pub fn with_request_logging(mut self, logging: RequestLogging) -> Self {
        self.logging = Some(logging);
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Invokes a looked-up handler, applying router-wide logging if set.
    pub(crate) async fn call(&self, handler: BoxedHandler, req: Request) -> Outcome {
        match &self.logging {
            Some(logging) => Ok(logging.instrument(handler, req).await),
            None => handler.call(req).await,
        }
    }
}
