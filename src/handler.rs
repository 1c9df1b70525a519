//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in a single
//! `HashMap<Method, Tree>`, so each one is hidden behind a trait object
//! (`dyn ErasedHandler`) and stored uniformly:
//!
//! ```text
//! async fn login(req: Request) -> Result<Response, BoxError> { … }
//!        ↓ router.post("/api/auth/login", login)
//! login.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(login))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { login(req).await.into_outcome() })  ← HandlerFuture
//! ```
//!
//! # Failure
//!
//! A handler fails by returning `Err(_)`. Middleware sees that failure as an
//! [`Outcome`] and decides what the client gets; the request-logging wrapper
//! turns it into a generic 500. Panics are not part of the outcome; they are
//! caught one level up, at the same boundaries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// What a handler produced: a response, or the error it failed with.
pub type Outcome = Result<Response, BoxError>;

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
///
/// `Send + 'static` let tokio move the future across threads safely.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> HandlerFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Handler output ────────────────────────────────────────────────────────────

/// Anything a handler may return.
///
/// Every [`IntoResponse`] type succeeds unconditionally; `Result<T, E>`
/// succeeds with `T` or fails with `E`.
pub trait HandlerOutput {
    fn into_outcome(self) -> Outcome;
}

impl<T: IntoResponse> HandlerOutput for T {
    fn into_outcome(self) -> Outcome {
        Ok(self.into_response())
    }
}

impl<T, E> HandlerOutput for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl HandlerOutput
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
