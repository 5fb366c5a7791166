use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::storage::{FileStorage, LocalStorage};
use crate::validation::{LoginForm, ValidationErrors};

pub const SESSION_SLOT: &str = "auth_user";
pub const DEFAULT_LOGIN_LATENCY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl User {
    /// First letter of each word of the name, uppercased.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

struct MockCredential {
    id: &'static str,
    email: &'static str,
    password: &'static str,
    name: &'static str,
    role: Role,
}

const MOCK_USERS: &[MockCredential] = &[
    MockCredential {
        id: "1",
        email: "admin@example.com",
        password: "admin123",
        name: "Admin User",
        role: Role::Admin,
    },
    MockCredential {
        id: "2",
        email: "user@example.com",
        password: "user123",
        name: "Regular User",
        role: Role::User,
    },
];

/// Demo credentials shown on the login prompt.
pub fn demo_credentials() -> impl Iterator<Item = (Role, &'static str, &'static str)> {
    MOCK_USERS
        .iter()
        .map(|cred| (cred.role, cred.email, cred.password))
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

/// Exact, case-sensitive lookup in the credential table. The password is not
/// part of the returned user.
pub fn authenticate(email: &str, password: &str) -> Option<User> {
    MOCK_USERS
        .iter()
        .find(|cred| cred.email == email && cred.password == password)
        .map(|cred| User {
            id: cred.id.to_string(),
            email: cred.email.to_string(),
            name: cred.name.to_string(),
            role: cred.role,
        })
}

struct AuthInner {
    user: RwLock<Option<User>>,
    loading: AtomicBool,
    storage: Arc<dyn LocalStorage>,
    latency: Duration,
}

/// Shared session state. Clones observe the same session.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<AuthInner>,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &*self.inner.user.read())
            .field("loading", &self.is_loading())
            .finish()
    }
}

impl AuthContext {
    pub fn new(storage: Arc<dyn LocalStorage>, latency: Duration) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                user: RwLock::new(None),
                loading: AtomicBool::new(true),
                storage,
                latency,
            }),
        }
    }

    /// File-backed context under `data_dir`, with the session already restored.
    #[tracing::instrument(skip(cfg, data_dir))]
    pub fn open(cfg: &Config, data_dir: &Path) -> anyhow::Result<Self> {
        let storage = FileStorage::open(data_dir)?;
        let latency = cfg.get_millis("auth.latency_ms", DEFAULT_LOGIN_LATENCY)?;
        let ctx = Self::new(Arc::new(storage), latency);
        ctx.restore_session();
        Ok(ctx)
    }

    /// Hydrates the session from storage. Missing or unreadable data means logged out.
    #[tracing::instrument(skip(self))]
    pub fn restore_session(&self) -> Option<User> {
        let restored = match self.inner.storage.get_item(SESSION_SLOT) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "stored session is corrupt; treating as logged out");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed reading stored session");
                None
            }
        };

        if let Some(user) = &restored {
            debug!(email = %user.email, "restored session");
        }
        *self.inner.user.write() = restored.clone();
        self.inner.loading.store(false, Ordering::SeqCst);
        restored
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.inner.loading.store(true, Ordering::SeqCst);
        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }

        let outcome = match authenticate(email, password) {
            Some(user) => {
                *self.inner.user.write() = Some(user.clone());
                self.persist(&user);
                info!(email = %user.email, role = %user.role, "logged in");
                Ok(user)
            }
            None => {
                warn!("login rejected");
                Err(AuthError::InvalidCredentials)
            }
        };

        self.inner.loading.store(false, Ordering::SeqCst);
        outcome
    }

    /// Validates the form before attempting the login.
    pub async fn submit(&self, form: &LoginForm) -> Result<User, AuthError> {
        form.validate()?;
        self.login(&form.email, &form.password).await
    }

    #[tracing::instrument(skip(self))]
    pub fn logout(&self) {
        *self.inner.user.write() = None;
        if let Err(err) = self.inner.storage.remove_item(SESSION_SLOT) {
            warn!(error = %format!("{err:#}"), "failed clearing stored session");
        }
        info!("logged out");
    }

    pub fn user(&self) -> Option<User> {
        self.inner.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.user.read().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    fn persist(&self, user: &User) {
        let stored = serde_json::to_string(user)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.inner.storage.set_item(SESSION_SLOT, &raw));
        if let Err(err) = stored {
            warn!(error = %format!("{err:#}"), "session kept in memory only");
        }
    }
}
