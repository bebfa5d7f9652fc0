//! Session lifecycle — brackets authenticated operations with the
//! login/logout protocol, scoped home-directory isolation, and login-state
//! verification.
//!
//! The process environment is a shared mutable resource: a session owns it
//! exclusively for its duration, enforced per manager with a session mutex.

use std::ffi::OsString;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{HarnessError, Result};
use crate::execute::ExecutionResult;
use crate::harness::RosaHarness;

/// Marker emitted by `rosa whoami` on stderr when no login is active.
const NOT_LOGGED_IN_MARKER: &str = "User is not logged in to OCM";
/// Key in the `whoami` status mapping reporting the logged-in environment.
const STATUS_ENV_KEY: &str = "OCM API";
/// Lightweight status command used for login-state checks.
const STATUS_COMMAND: &str = "whoami";
const LOGOUT_COMMAND: &str = "logout";
/// Home-directory override applied for the duration of a session.
const HOME_OVERRIDE: &str = "/tmp/";
/// OCM environment used when none is supplied.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    LoggingOut,
}

/// External collaborator providing/validating cloud credentials before
/// login. Any failure is fatal to the session attempt, with no retry.
pub trait CredentialSource: Send + Sync {
    fn ensure(&self) -> Result<()>;
}

/// Optional collaborator supplying the OCM environment and access token in
/// place of directly passed values.
pub trait IdentityProvider: Send + Sync {
    fn environment(&self) -> String;
    fn token(&self) -> String;
}

/// Identity used to log in: OCM environment plus access token.
#[derive(Debug, Clone)]
pub struct Auth {
    pub environment: String,
    pub token: String,
}

impl Auth {
    /// Auth against the default (production) environment.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            token: token.into(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Read both values from an identity collaborator.
    pub fn from_provider(provider: &dyn IdentityProvider) -> Self {
        Self {
            environment: provider.environment(),
            token: provider.token(),
        }
    }
}

/// Credential source backed by required environment variables.
///
/// Stands in for an external cloud-credential collaborator: `ensure` fails
/// with [`HarnessError::MissingCredentials`] when any named variable is
/// unset or empty.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    required: Vec<String>,
}

impl EnvCredentials {
    pub fn new(required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// The standard AWS credential pair.
    pub fn aws() -> Self {
        Self::new(["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"])
    }
}

impl CredentialSource for EnvCredentials {
    fn ensure(&self) -> Result<()> {
        for var in &self.required {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => {}
                _ => {
                    return Err(HarnessError::MissingCredentials(format!(
                        "environment variable '{}' is not set",
                        var
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scoped override of the `HOME` environment variable.
///
/// `apply` records the current value and points `HOME` at a throwaway
/// directory; `Drop` restores (or removes) the prior value on every exit
/// path, success or failure.
pub struct HomeOverride {
    previous: Option<OsString>,
}

impl HomeOverride {
    pub fn apply() -> Self {
        let previous = std::env::var_os("HOME");
        // SAFETY: the session holds the process environment exclusively for
        // its duration (session mutex), with no concurrent env access.
        unsafe { std::env::set_var("HOME", HOME_OVERRIDE) };
        tracing::debug!(home = %HOME_OVERRIDE, "home directory override applied");
        Self { previous }
    }
}

impl Drop for HomeOverride {
    fn drop(&mut self) {
        // SAFETY: same exclusivity as in `apply`.
        match self.previous.take() {
            Some(prev) => unsafe { std::env::set_var("HOME", prev) },
            None => unsafe { std::env::remove_var("HOME") },
        }
        tracing::debug!("home directory restored");
    }
}

/// Tracks state transitions for one session bracket.
struct Session {
    state: SessionState,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state transition");
        self.state = next;
    }
}

/// Brackets authenticated operations against one harness.
pub struct SessionManager<'h> {
    harness: &'h RosaHarness,
    credentials: Arc<dyn CredentialSource>,
    /// One session at a time per manager — the home-directory override is
    /// process-wide state.
    session_lock: Mutex<()>,
}

impl<'h> SessionManager<'h> {
    pub fn new(harness: &'h RosaHarness, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            harness,
            credentials,
            session_lock: Mutex::new(()),
        }
    }

    /// Run `body` inside a login/logout bracket.
    ///
    /// Order: credentials → home override → login → login verification →
    /// body → logout → home restore. Logout is attempted exactly once after
    /// `body` regardless of its outcome; a logout failure after a failed
    /// body is logged and never replaces the body's error. Login or
    /// verification failures return before any logout is attempted.
    pub async fn with_session<T, F, Fut>(&self, auth: &Auth, body: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.credentials.ensure()?;

        let _lock = self.session_lock.lock().await;
        let _home = HomeOverride::apply();

        let mut session = Session::new();
        session.transition(SessionState::LoggingIn);

        let login_command = format!(
            "login --env={} --token={}",
            auth.environment, auth.token
        );
        self.harness.run(&login_command).await?;
        self.verify_login(&auth.environment).await?;
        session.transition(SessionState::LoggedIn);

        let body_result = body().await;

        session.transition(SessionState::LoggingOut);
        let logout_result = self.harness.run(LOGOUT_COMMAND).await;
        session.transition(SessionState::LoggedOut);

        match (body_result, logout_result) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(logout_err)) => Err(logout_err),
            (Err(body_err), Ok(_)) => Err(body_err),
            (Err(body_err), Err(logout_err)) => {
                tracing::warn!(
                    error = %logout_err,
                    "logout failed after session body error"
                );
                Err(body_err)
            }
        }
    }

    /// Execute one command, bracketed in a session when `auth` is supplied.
    ///
    /// Without `auth`, the current login state is verified first (no
    /// environment-match requirement on this path); absence of a login fails
    /// with [`HarnessError::NotLoggedIn`].
    pub async fn execute(
        &self,
        command: &str,
        auth: Option<&Auth>,
    ) -> Result<ExecutionResult> {
        match auth {
            Some(auth) => {
                self.with_session(auth, || self.harness.run(command)).await
            }
            None => {
                if !self.is_logged_in().await {
                    return Err(HarnessError::NotLoggedIn(
                        "pass a token or log in before running".to_string(),
                    ));
                }
                self.harness.run(command).await
            }
        }
    }

    /// Probe the current login state.
    ///
    /// Any execution failure during the probe degrades to `false` rather
    /// than propagating — intentional, and confined to this call site.
    pub async fn is_logged_in(&self) -> bool {
        match self.harness.run(STATUS_COMMAND).await {
            Ok(result) => !result.stderr.contains(NOT_LOGGED_IN_MARKER),
            Err(_) => false,
        }
    }

    /// Check the status command against the expected environment.
    ///
    /// Three distinguishable failures: the probe itself failing
    /// (`LoginFailed`), a non-mapping response (`MalformedStatus`), and a
    /// mapping reporting a different environment (`EnvironmentMismatch`).
    async fn verify_login(&self, expected: &str) -> Result<()> {
        let status = self
            .harness
            .run(STATUS_COMMAND)
            .await
            .map_err(|e| HarnessError::LoginFailed(e.to_string()))?;

        let Some(mapping) = status.stdout.as_object() else {
            return Err(HarnessError::MalformedStatus(status.stdout.to_string()));
        };

        let actual = mapping
            .get(STATUS_ENV_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if actual != expected {
            return Err(HarnessError::EnvironmentMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        Ok(())
    }
}
