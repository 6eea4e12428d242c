//! Process-wide session with the earth-observation service.
//!
//! The session is established once at startup and never refreshed:
//!
//! ```text
//! Uninitialized -> Authenticating -> Ready
//!                                 \-> Degraded
//! ```
//!
//! A degraded session keeps the process alive, but every request signed
//! with it fails with [`CloudError::SessionUnavailable`].

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::{Authenticator, CloudAuth};
use crate::error::{CloudError, Result};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Authenticating,
    Ready,
    /// Authentication or initialization failed; the reason is kept for logs.
    Degraded { reason: String },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Degraded { reason } => write!(f, "degraded ({reason})"),
        }
    }
}

/// Authenticated session shared read-only by all requests.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    token: Option<String>,
}

impl Session {
    /// A session that has not been initialized yet.
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            token: None,
        }
    }

    /// Run the startup handshake and share the resulting session.
    pub async fn establish(auth: &dyn Authenticator) -> Arc<Self> {
        let mut session = Self::new();
        session.initialize(auth).await;
        Arc::new(session)
    }

    /// Authenticate, then initialize. Failures leave the session degraded.
    ///
    /// Only an uninitialized session runs the handshake; later calls are
    /// ignored.
    pub async fn initialize(&mut self, auth: &dyn Authenticator) {
        if self.state != SessionState::Uninitialized {
            warn!("session already initialized ({}), ignoring", self.state);
            return;
        }

        self.state = SessionState::Authenticating;
        match handshake(auth).await {
            Ok(token) => {
                info!("earth-observation session ready");
                self.token = Some(token);
                self.state = SessionState::Ready;
            }
            Err(e) => {
                error!("earth-observation session initialization failed: {e}");
                self.state = SessionState::Degraded {
                    reason: e.to_string(),
                };
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// The access token, available only in the ready state.
    pub fn access_token(&self) -> Result<&str> {
        match (&self.state, &self.token) {
            (SessionState::Ready, Some(token)) => Ok(token),
            (state, _) => Err(CloudError::SessionUnavailable(state.to_string())),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

async fn handshake(auth: &dyn Authenticator) -> Result<String> {
    let token = auth.authenticate().await?;
    auth.initialize(&token).await?;
    Ok(token)
}

impl CloudAuth for Session {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let token = self.access_token()?;
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use async_trait::async_trait;

    struct FailingInit;

    #[async_trait]
    impl Authenticator for FailingInit {
        async fn authenticate(&self) -> Result<String> {
            Ok("token".into())
        }

        async fn initialize(&self, _token: &str) -> Result<()> {
            Err(CloudError::Auth("service refused initialization".into()))
        }
    }

    #[tokio::test]
    async fn test_ready_session_signs_requests() {
        let session = Session::establish(&StaticToken("abc".into())).await;
        assert_eq!(session.state(), &SessionState::Ready);

        let mut headers = Vec::new();
        session.sign_request("https://x", "POST", &mut headers).unwrap();
        assert_eq!(headers, vec![("Authorization".into(), "Bearer abc".into())]);
    }

    #[tokio::test]
    async fn test_failed_initialization_degrades() {
        let session = Session::establish(&FailingInit).await;

        assert!(matches!(session.state(), SessionState::Degraded { .. }));
        assert!(!session.is_ready());
        assert!(matches!(
            session.access_token(),
            Err(CloudError::SessionUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let mut session = Session::new();
        session.initialize(&FailingInit).await;
        session.initialize(&StaticToken("late".into())).await;
        assert!(matches!(session.state(), SessionState::Degraded { .. }));
    }

    #[test]
    fn test_uninitialized_session_is_unavailable() {
        let session = Session::new();
        let mut headers = Vec::new();
        assert!(session.sign_request("https://x", "GET", &mut headers).is_err());
        assert!(headers.is_empty());
    }
}
