use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::user::{SignUpPayload, UserAccount};
use crate::infrastructure::backend::BackendClient;

/// Holding cell for the user's generation key. Every use case that talks to
/// the oracle shares one instance, so swapping the key here is immediately
/// visible to all of them.
pub struct ApiCredential {
    key: RwLock<Option<String>>,
}

impl ApiCredential {
    pub fn uninitialized() -> Self {
        Self {
            key: RwLock::new(None),
        }
    }

    /// Blank keys count as absent.
    pub fn set(&self, key: Option<String>) {
        let key = key.filter(|key| !key.trim().is_empty());
        *self.key.write().unwrap() = key;
    }

    pub fn clear(&self) {
        *self.key.write().unwrap() = None;
    }

    pub fn is_set(&self) -> bool {
        self.key.read().unwrap().is_some()
    }

    pub fn require(&self) -> Result<String> {
        self.key.read().unwrap().clone().ok_or_else(|| {
            AppError::CredentialError(
                "API key not configured. Please add your Gemini API key in settings.".to_string(),
            )
        })
    }
}

/// Coarse view of the session used by callers that only care which screen to
/// show, derived from the flags rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Anonymous,
    Loading,
    Authenticated,
    Error,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<UserAccount>,
    pub api_key: Option<String>,
    pub logged_in: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if self.logged_in {
            SessionPhase::Authenticated
        } else if self.error.is_some() {
            SessionPhase::Error
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// The application's only mutable session state. All mutation goes through
/// the action methods; callers read through `snapshot`. Each action runs to
/// completion before its result is returned, and the lock is never held
/// across an await point.
pub struct SessionStore {
    backend: Arc<BackendClient>,
    credential: Arc<ApiCredential>,
    state: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(backend: Arc<BackendClient>, credential: Arc<ApiCredential>) -> Self {
        Self {
            backend,
            credential,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    /// Signs the user in, then loads their stored API key. A key that fails
    /// to load leaves the login successful but records the problem.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserAccount> {
        self.begin();
        let outcome = self.try_login(email, password).await;
        match &outcome {
            Ok(_) => self.finish(),
            Err(error) => self.fail(error),
        }
        outcome
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<UserAccount> {
        self.backend.sign_in(email, password).await?;
        let account = self.backend.current_user().await?;
        {
            let mut state = self.state.lock().unwrap();
            state.user = Some(account.clone());
            state.logged_in = true;
        }
        self.load_api_key(&account.id).await;
        Ok(account)
    }

    /// Creates the account. The new user stays logged out until the
    /// verification email is acted on.
    pub async fn register(&self, payload: &SignUpPayload) -> Result<UserAccount> {
        self.begin();
        let outcome = self.backend.sign_up(payload).await;
        match &outcome {
            Ok(account) => {
                let mut state = self.state.lock().unwrap();
                state.user = Some(account.clone());
                state.logged_in = false;
                state.loading = false;
            }
            Err(error) => self.fail(error),
        }
        outcome
    }

    /// Clears the session, the stored key and the shared credential, so a
    /// later generation attempt fails with `CredentialError` instead of
    /// reusing the previous user's key.
    pub async fn logout(&self) {
        self.begin();
        if let Err(error) = self.backend.sign_out().await {
            warn!(%error, "sign out reported a failure");
        }
        self.credential.clear();
        let mut state = self.state.lock().unwrap();
        *state = SessionState::default();
    }

    /// Silent session restore on startup. A backend that no longer recognises
    /// the user demotes to a full logout rather than an error.
    pub async fn load_user(&self) -> Option<UserAccount> {
        if !self.backend.has_session().await {
            return None;
        }
        self.begin();
        match self.backend.current_user().await {
            Ok(account) => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.user = Some(account.clone());
                    state.logged_in = true;
                    state.loading = false;
                }
                self.load_api_key(&account.id).await;
                Some(account)
            }
            Err(AppError::CredentialError(_)) | Err(AppError::NotFound(_)) => {
                debug!("stored session is no longer valid, signing out");
                self.logout().await;
                None
            }
            Err(error) => {
                warn!(%error, "session restore failed");
                self.credential.clear();
                let mut state = self.state.lock().unwrap();
                state.user = None;
                state.logged_in = false;
                state.api_key = None;
                state.loading = false;
                None
            }
        }
    }

    /// Persists a new generation key, then updates the shared credential and
    /// the visible state before returning, so no caller can observe the old
    /// key after a successful update.
    pub async fn update_api_key(&self, api_key: &str) -> Result<()> {
        let user_id = {
            let state = self.state.lock().unwrap();
            state.user.as_ref().map(|user| user.id.clone())
        };
        let user_id = match user_id {
            Some(user_id) => user_id,
            None => {
                let error = AppError::CredentialError("User not authenticated".to_string());
                self.fail(&error);
                return Err(error);
            }
        };

        self.begin();
        let outcome = self.backend.save_api_key(&user_id, api_key).await;
        match &outcome {
            Ok(()) => {
                self.credential.set(Some(api_key.to_string()));
                let mut state = self.state.lock().unwrap();
                state.api_key = Some(api_key.to_string());
                state.loading = false;
            }
            Err(error) => self.fail(error),
        }
        outcome
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.begin();
        let outcome = self.backend.reset_password(email).await;
        match &outcome {
            Ok(()) => self.finish(),
            Err(error) => self.fail(error),
        }
        outcome
    }

    pub async fn resend_verification_email(&self, email: &str) -> Result<()> {
        self.begin();
        let outcome = self.backend.resend_verification_email(email).await;
        match &outcome {
            Ok(()) => self.finish(),
            Err(error) => self.fail(error),
        }
        outcome
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        self.begin();
        let outcome = self.backend.update_password(new_password).await;
        match &outcome {
            Ok(()) => self.finish(),
            Err(error) => self.fail(error),
        }
        outcome
    }

    async fn load_api_key(&self, user_id: &str) {
        match self.backend.get_api_key(user_id).await {
            Ok(key) => {
                self.credential.set(key.clone());
                self.state.lock().unwrap().api_key = key;
            }
            Err(error) => {
                warn!(%error, "failed to load the stored API key");
                self.credential.clear();
                let mut state = self.state.lock().unwrap();
                state.api_key = None;
                state.error = Some(error.to_string());
            }
        }
    }

    fn begin(&self) {
        let mut state = self.state.lock().unwrap();
        state.loading = true;
        state.error = None;
    }

    fn finish(&self) {
        self.state.lock().unwrap().loading = false;
    }

    fn fail(&self, error: &AppError) {
        let mut state = self.state.lock().unwrap();
        state.error = Some(error.to_string());
        state.loading = false;
    }
}
