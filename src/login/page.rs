//! Login page state machine.
//!
//! Holds everything the page renders from and decides navigation, with the
//! session store and the router injected. Rendering itself is left to the
//! caller: [`LoginPage::view`] says *what* to show.

use serde_json::Value;
use tracing::{error, info};

use super::client::{LoginBackend, LoginReply};
use super::form::{Credentials, FieldErrors, LoginForm};
use crate::config::AuthConfig;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";
pub const REGISTRATION_SUCCESS: &str = "Registration successful! Please sign in.";

const REGISTRATION_SUCCESS_FLAG: &str = "registration-success";

// ── Collaborators ─────────────────────────────────────────────────────────────

/// Where the signed-in user is kept.
pub trait Session {
    /// `true` while the stored session is still being checked.
    fn is_loading(&self) -> bool;
    fn user(&self) -> Option<&Value>;
    fn establish(&mut self, access_token: String, user: Value);
    fn clear_tokens(&mut self);
}

/// Client-side navigation.
pub trait Navigator {
    fn push(&mut self, path: &str);
}

/// A [`Session`] that keeps the access token in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemorySession {
    loading: bool,
    access_token: Option<String>,
    user: Option<Value>,
}

impl MemorySession {
    /// A session whose stored state has not been checked yet.
    pub fn checking() -> Self {
        Self { loading: true, ..Self::default() }
    }

    /// A checked session restored from storage.
    pub fn restored(access_token: Option<String>, user: Option<Value>) -> Self {
        Self { loading: false, access_token, user }
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl Session for MemorySession {
    fn is_loading(&self) -> bool { self.loading }
    fn user(&self) -> Option<&Value> { self.user.as_ref() }

    fn establish(&mut self, access_token: String, user: Value) {
        self.access_token = Some(access_token);
        self.user = Some(user);
    }

    fn clear_tokens(&mut self) {
        self.access_token = None;
    }
}

/// A [`Navigator`] that records every push.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History(pub Vec<String>);

impl History {
    pub fn current(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl Navigator for History {
    fn push(&mut self, path: &str) {
        self.0.push(path.to_owned());
    }
}

// ── View ──────────────────────────────────────────────────────────────────────

/// What the page shows right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// The stored session is still being checked.
    CheckingAuthentication,
    /// Already signed in; nothing is rendered while the redirect happens.
    Redirecting,
    Form(FormView),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormView {
    pub success_banner: Option<String>,
    pub error_banner: Option<String>,
    pub email_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
    /// `"password"` or `"text"`.
    pub password_input_type: &'static str,
    pub submit_label: &'static str,
    pub submit_disabled: bool,
}

/// How a submission ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid,
    /// The server accepted and the page navigated away.
    Accepted { session_established: bool },
    /// The server refused; the banner shows why.
    Rejected,
    /// Transport or decoding failure.
    Failed,
}

// ── Page ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct LoginPage {
    dashboard_path: String,
    api_error: Option<String>,
    success_message: Option<String>,
    field_errors: FieldErrors,
    loading: bool,
    show_password: bool,
}

impl LoginPage {
    pub fn new(dashboard_path: impl Into<String>) -> Self {
        Self {
            dashboard_path: dashboard_path.into(),
            api_error: None,
            success_message: None,
            field_errors: FieldErrors::default(),
            loading: false,
            show_password: false,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.dashboard_path.clone())
    }

    /// Applies the page's query string (without the leading `?`).
    pub fn with_query(mut self, query: &str) -> Self {
        let registered = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "message")
            .is_some_and(|(_, v)| v == REGISTRATION_SUCCESS_FLAG);
        if registered {
            self.success_message = Some(REGISTRATION_SUCCESS.to_owned());
        }
        self
    }

    /// Reacts to the current session state: a signed-in user is sent to the
    /// dashboard, a signed-out one has any stale tokens cleared. Call it
    /// whenever the session changes.
    pub fn sync(&mut self, session: &mut impl Session, nav: &mut impl Navigator) {
        if session.is_loading() {
            return;
        }
        if session.user().is_some() {
            nav.push(&self.dashboard_path);
        } else {
            session.clear_tokens();
        }
    }

    pub fn view(&self, session: &impl Session) -> View {
        if session.is_loading() {
            return View::CheckingAuthentication;
        }
        if session.user().is_some() {
            return View::Redirecting;
        }
        View::Form(FormView {
            success_banner: self.success_message.clone(),
            error_banner: self.api_error.clone(),
            email_error: self.field_errors.email,
            password_error: self.field_errors.password,
            password_input_type: if self.show_password { "text" } else { "password" },
            submit_label: if self.loading { "Signing In..." } else { "Sign In" },
            submit_disabled: self.loading,
        })
    }

    pub fn toggle_password_visibility(&mut self) {
        self.show_password = !self.show_password;
    }

    pub fn dismiss_error(&mut self) {
        self.api_error = None;
    }

    /// Validates `form` and, if it passes, enters the submitting state.
    ///
    /// Returns `None` when validation fails; the field errors are then shown
    /// and no request must be made.
    pub fn begin_submit(&mut self, form: &LoginForm) -> Option<Credentials> {
        match form.validate() {
            Ok(credentials) => {
                self.field_errors = FieldErrors::default();
                self.api_error = None;
                self.loading = true;
                Some(credentials)
            }
            Err(errors) => {
                self.field_errors = errors;
                None
            }
        }
    }

    /// Leaves the submitting state with the server's answer.
    pub fn finish_submit<E: std::fmt::Display>(
        &mut self,
        reply: Result<LoginReply, E>,
        session: &mut impl Session,
        nav: &mut impl Navigator,
    ) -> SubmitOutcome {
        self.loading = false;

        match reply {
            Ok(LoginReply::Accepted { session: opened }) => {
                let session_established = opened.is_some();
                if let Some((token, user)) = opened {
                    info!(%user, "login successful");
                    session.establish(token, user);
                }
                nav.push(&self.dashboard_path);
                SubmitOutcome::Accepted { session_established }
            }
            Ok(LoginReply::Rejected { message }) => {
                self.api_error = Some(message);
                SubmitOutcome::Rejected
            }
            Err(e) => {
                error!(error = %e, "login submission error");
                self.api_error = Some(UNEXPECTED_ERROR.to_owned());
                SubmitOutcome::Failed
            }
        }
    }

    /// Full submission: validate, call `backend`, apply the answer.
    pub async fn submit<B: LoginBackend>(
        &mut self,
        form: &LoginForm,
        backend: &B,
        session: &mut impl Session,
        nav: &mut impl Navigator,
    ) -> SubmitOutcome {
        let Some(credentials) = self.begin_submit(form) else {
            return SubmitOutcome::Invalid;
        };
        let reply = backend.login(&credentials).await.map(|r| r.interpret());
        self.finish_submit(reply, session, nav)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::login::client::BackendReply;
    use crate::login::form::PASSWORD_REQUIRED;

    /// Answers every login with a fixed reply and counts the calls.
    struct Canned {
        status: u16,
        body: Value,
        calls: Mutex<Vec<Credentials>>,
    }

    impl Canned {
        fn new(status: u16, body: Value) -> Self {
            Self { status, body, calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl LoginBackend for Canned {
        async fn login(&self, credentials: &Credentials) -> Result<BackendReply, Error> {
            self.calls.lock().unwrap().push(credentials.clone());
            Ok(BackendReply {
                status: StatusCode::from_u16(self.status).unwrap(),
                body: self.body.clone(),
            })
        }
    }

    /// A backend whose reply never decodes.
    struct Garbled;

    impl LoginBackend for Garbled {
        async fn login(&self, _: &Credentials) -> Result<BackendReply, Error> {
            Err(serde_json::from_str::<Value>("<html>").unwrap_err().into())
        }
    }

    fn signed_out() -> (LoginPage, MemorySession, History) {
        (LoginPage::new("/dashboard"), MemorySession::default(), History::default())
    }

    fn form_view(page: &LoginPage, session: &MemorySession) -> FormView {
        match page.view(session) {
            View::Form(f) => f,
            other => panic!("expected the form, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_login_establishes_session_and_navigates() {
        let (mut page, mut session, mut nav) = signed_out();
        let backend = Canned::new(200, json!({"accessToken": "tok", "user": {"id": 1}}));

        let outcome = page.submit(&LoginForm::new("a@b.com", "secret"), &backend, &mut session, &mut nav).await;

        assert_eq!(outcome, SubmitOutcome::Accepted { session_established: true });
        assert_eq!(session.access_token(), Some("tok"));
        assert_eq!(session.user(), Some(&json!({"id": 1})));
        assert_eq!(nav.current(), Some("/dashboard"));
        assert_eq!(backend.calls.lock().unwrap()[0].password, "secret");
    }

    #[tokio::test]
    async fn rejected_login_shows_server_message_and_stays() {
        let (mut page, mut session, mut nav) = signed_out();
        let backend = Canned::new(401, json!({"error": "Invalid credentials"}));

        let outcome = page.submit(&LoginForm::new("a@b.com", "wrong"), &backend, &mut session, &mut nav).await;

        assert_eq!(outcome, SubmitOutcome::Rejected);
        assert_eq!(form_view(&page, &session).error_banner.as_deref(), Some("Invalid credentials"));
        assert!(nav.0.is_empty());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn empty_password_never_reaches_the_network() {
        let (mut page, mut session, mut nav) = signed_out();
        let backend = Canned::new(200, json!({}));

        let outcome = page.submit(&LoginForm::new("a@b.com", ""), &backend, &mut session, &mut nav).await;

        assert_eq!(outcome, SubmitOutcome::Invalid);
        assert_eq!(backend.calls(), 0);
        let view = form_view(&page, &session);
        assert_eq!(view.password_error, Some(PASSWORD_REQUIRED));
        assert_eq!(view.email_error, None);
        assert_eq!(view.error_banner, None);
    }

    #[tokio::test]
    async fn undecodable_reply_shows_generic_banner() {
        let (mut page, mut session, mut nav) = signed_out();

        let outcome = page.submit(&LoginForm::new("a@b.com", "secret"), &Garbled, &mut session, &mut nav).await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(form_view(&page, &session).error_banner.as_deref(), Some(UNEXPECTED_ERROR));
        assert!(nav.0.is_empty());
    }

    #[tokio::test]
    async fn accepted_without_token_still_navigates() {
        let (mut page, mut session, mut nav) = signed_out();
        let backend = Canned::new(200, json!({"ok": true}));

        let outcome = page.submit(&LoginForm::new("a@b.com", "secret"), &backend, &mut session, &mut nav).await;

        assert_eq!(outcome, SubmitOutcome::Accepted { session_established: false });
        assert!(session.user().is_none());
        assert_eq!(nav.current(), Some("/dashboard"));
    }

    #[test]
    fn submitting_disables_the_button_and_clears_the_banner() {
        let (mut page, mut session, mut nav) = signed_out();
        page.finish_submit(
            Ok::<_, Error>(LoginReply::Rejected { message: "Invalid credentials".into() }),
            &mut session,
            &mut nav,
        );

        assert!(page.begin_submit(&LoginForm::new("a@b.com", "secret")).is_some());
        let view = form_view(&page, &session);
        assert_eq!(view.submit_label, "Signing In...");
        assert!(view.submit_disabled);
        assert_eq!(view.error_banner, None);
    }

    #[test]
    fn banner_can_be_dismissed() {
        let (mut page, mut session, mut nav) = signed_out();
        page.finish_submit(
            Ok::<_, Error>(LoginReply::Rejected { message: "Nope".into() }),
            &mut session,
            &mut nav,
        );
        page.dismiss_error();
        assert_eq!(form_view(&page, &session).error_banner, None);
        assert_eq!(form_view(&page, &session).submit_label, "Sign In");
    }

    #[test]
    fn password_visibility_toggles() {
        let (mut page, session, _) = signed_out();
        assert_eq!(form_view(&page, &session).password_input_type, "password");
        page.toggle_password_visibility();
        assert_eq!(form_view(&page, &session).password_input_type, "text");
    }

    #[test]
    fn checking_session_shows_placeholder_without_side_effects() {
        let mut page = LoginPage::new("/dashboard");
        let mut session = MemorySession::checking();
        let mut nav = History::default();

        page.sync(&mut session, &mut nav);

        assert_eq!(page.view(&session), View::CheckingAuthentication);
        assert!(nav.0.is_empty());

        session.finish_loading();
        page.sync(&mut session, &mut nav);
        assert!(matches!(page.view(&session), View::Form(_)));
        assert!(nav.0.is_empty());
    }

    #[test]
    fn signed_in_user_is_redirected() {
        let mut page = LoginPage::new("/dashboard");
        let mut session = MemorySession::default();
        session.establish("tok".into(), json!({"id": 7}));
        let mut nav = History::default();

        page.sync(&mut session, &mut nav);

        assert_eq!(page.view(&session), View::Redirecting);
        assert_eq!(nav.current(), Some("/dashboard"));
        assert_eq!(session.access_token(), Some("tok"));
    }

    #[test]
    fn every_signed_out_sync_clears_stale_tokens() {
        let mut page = LoginPage::new("/dashboard");
        let mut nav = History::default();

        let mut session = MemorySession::restored(Some("stale".into()), None);
        page.sync(&mut session, &mut nav);
        assert!(session.access_token().is_none());

        // Signed out again later: the same page clears again.
        let mut session = MemorySession::restored(Some("stale-again".into()), None);
        page.sync(&mut session, &mut nav);
        assert!(session.access_token().is_none());
        assert!(nav.0.is_empty());

        // A signed-in session is left alone.
        let mut session = MemorySession::restored(Some("fresh".into()), Some(json!({"id": 1})));
        page.sync(&mut session, &mut nav);
        assert_eq!(session.access_token(), Some("fresh"));
        assert_eq!(nav.current(), Some("/dashboard"));
    }

    #[test]
    fn clearing_tokens_keeps_the_user() {
        let mut session = MemorySession::default();
        session.establish("tok".into(), json!({"id": 3}));

        session.clear_tokens();

        assert!(session.access_token().is_none());
        assert_eq!(session.user(), Some(&json!({"id": 3})));
    }

    #[test]
    fn registration_flag_shows_success_banner() {
        let session = MemorySession::default();
        let page = LoginPage::new("/dashboard").with_query("message=registration-success&next=%2Fnotes");
        assert_eq!(form_view(&page, &session).success_banner.as_deref(), Some(REGISTRATION_SUCCESS));

        let page = LoginPage::new("/dashboard").with_query("message=welcome");
        assert_eq!(form_view(&page, &session).success_banner, None);

        // Only the first `message` counts.
        let page = LoginPage::new("/dashboard").with_query("message=welcome&message=registration-success");
        assert_eq!(form_view(&page, &session).success_banner, None);
    }
}
