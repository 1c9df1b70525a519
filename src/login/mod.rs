//! The login page, minus the pixels.
//!
//! - [`form`]: field schema and client-side validation
//! - [`client`]: the external login endpoint and how its replies read
//! - [`page`]: view state, banners, and navigation decisions

pub mod client;
pub mod form;
pub mod page;

pub use client::{BackendReply, HttpLoginBackend, LoginBackend, LoginReply, rejection_message};
pub use form::{Credentials, FieldErrors, LoginForm};
pub use page::{FormView, History, LoginPage, MemorySession, Navigator, Session, SubmitOutcome, View};
