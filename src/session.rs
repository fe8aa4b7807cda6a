use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::User;
use crate::pocketbase::{api_error, update_as, Collection, PocketBaseApi};

pub const MIN_PASSWORD_LEN: usize = 8;
/// Cached sessions are re-checked with the backend after this long.
pub const SESSION_TTL_MINUTES: i64 = 15;
const LOGIN_FALLBACK_MESSAGE: &str = "Invalid email or password. Please try again.";
const REGISTER_FALLBACK_MESSAGE: &str = "Registration failed. Please try again.";

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    /// Last time the backend confirmed the token.
    pub validated_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str())
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.validated_at < ttl
    }
}

/// Holds every signed-in session, keyed by backend auth token.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::minutes(SESSION_TTL_MINUTES))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// The cached session, unless it is due for re-validation.
    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(token)
            .filter(|s| s.is_fresh(self.ttl))
            .cloned()
    }

    /// Stores a freshly validated session and drops the stale ones.
    pub async fn insert(&self, token: String, user: User) -> Session {
        let session = Session {
            token: token.clone(),
            user,
            validated_at: Utc::now(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.is_fresh(self.ttl));
        sessions.insert(token, session.clone());
        session
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn replace_user(&self, token: &str, user: User) {
        if let Some(session) = self.sessions.write().await.get_mut(token) {
            session.user = user;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Failure the user should see verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Invalid(#[from] RegistrationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,
    #[error("You must accept the terms of use")]
    TermsNotAccepted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub agree_to_terms: bool,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.password != self.password_confirm {
            return Err(RegistrationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }
        if !self.agree_to_terms {
            return Err(RegistrationError::TermsNotAccepted);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
}

/// Lowercases, keeps `[a-z0-9 -]`, and turns whitespace runs into `-`.
pub fn slugify(username: &str) -> String {
    let kept: String = username
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let mut out = String::with_capacity(kept.len());
    let mut in_space = false;
    for ch in kept.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

fn registration_message(err: &anyhow::Error) -> String {
    let Some(api) = api_error(err) else {
        return REGISTER_FALLBACK_MESSAGE.to_string();
    };
    if api.has_field("email") {
        "This email is already in use".to_string()
    } else if api.has_field("username") {
        "This username is already taken".to_string()
    } else if let Some(msg) = api.field_message("password") {
        msg.to_string()
    } else {
        REGISTER_FALLBACK_MESSAGE.to_string()
    }
}

fn login_message(err: &anyhow::Error) -> String {
    api_error(err)
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| LOGIN_FALLBACK_MESSAGE.to_string())
}

/// Backend failures of any kind come back as a user-facing message.
pub async fn sign_in(
    api: &dyn PocketBaseApi,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Session, AuthError> {
    match api.auth_with_password(email.trim(), password).await {
        Ok(auth) => {
            info!(user_id = %auth.record.id, "User signed in");
            Ok(store.insert(auth.token, auth.record).await)
        }
        Err(err) => {
            warn!("Sign-in failed: {:#}", err);
            Err(AuthError::Rejected(login_message(&err)))
        }
    }
}

pub async fn sign_up(
    api: &dyn PocketBaseApi,
    store: &SessionStore,
    form: &RegistrationForm,
) -> Result<Session, AuthError> {
    form.validate()?;

    let body = json!({
        "email": form.email.trim(),
        "username": form.username,
        "password": form.password,
        "passwordConfirm": form.password_confirm,
        "slug": slugify(&form.username),
        "bio": "",
        "meta_title": form.username,
        "meta_description": format!("Profile of {}", form.username),
    });
    if let Err(err) = api.create(Collection::Users, body, None).await {
        warn!("Registration failed: {:#}", err);
        return Err(AuthError::Rejected(registration_message(&err)));
    }
    info!(username = %form.username, "Registered new user");

    sign_in(api, store, &form.email, &form.password).await
}

pub async fn sign_out(store: &SessionStore, token: &str) -> bool {
    let removed = store.remove(token).await;
    debug!(removed, "Signed out");
    removed
}

/// Looks a token up locally. Unknown or stale tokens are checked with the
/// backend's refresh endpoint, and a rejected token is forgotten.
pub async fn resolve(
    api: &dyn PocketBaseApi,
    store: &SessionStore,
    token: &str,
) -> Option<Session> {
    if let Some(session) = store.get(token).await {
        return Some(session);
    }
    match api.auth_refresh(token).await {
        Ok(auth) => {
            debug!(user_id = %auth.record.id, "Restored session from backend");
            Some(store.insert(token.to_string(), auth.record).await)
        }
        Err(err) => {
            debug!("Token rejected by backend: {:#}", err);
            store.remove(token).await;
            None
        }
    }
}

pub async fn update_profile(
    api: &dyn PocketBaseApi,
    store: &SessionStore,
    session: &Session,
    update: &ProfileUpdate,
) -> Result<User> {
    let body = json!({
        "username": update.username.trim(),
        "name": update.name.trim(),
        "bio": update.bio.trim(),
    });
    let user: User = update_as(api, Collection::Users, &session.user.id, body, session.token())
        .await
        .context("Failed to update profile")?;
    store.replace_user(&session.token, user.clone()).await;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pocketbase::ApiError;

    fn form(password: &str, confirm: &str, terms: bool) -> RegistrationForm {
        RegistrationForm {
            email: "neo@example.com".to_string(),
            username: "Neo".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            agree_to_terms: terms,
        }
    }

    #[test]
    fn validates_registration_in_order() {
        assert_eq!(
            form("password1", "password2", true).validate(),
            Err(RegistrationError::PasswordMismatch)
        );
        assert_eq!(
            form("short", "short", true).validate(),
            Err(RegistrationError::PasswordTooShort)
        );
        assert_eq!(
            form("password1", "password1", false).validate(),
            Err(RegistrationError::TermsNotAccepted)
        );
        assert!(form("password1", "password1", true).validate().is_ok());
    }

    #[test]
    fn slugifies_usernames() {
        assert_eq!(slugify("John  Doe"), "john-doe");
        assert_eq!(slugify("Ivan_Petrov!"), "ivanpetrov");
        assert_eq!(slugify("already-slug 42"), "already-slug-42");
    }

    #[test]
    fn maps_backend_field_errors() {
        let email = anyhow::Error::new(ApiError::from_body(
            400,
            r#"{"message":"x","data":{"email":{"code":"validation_not_unique","message":"taken"}}}"#,
        ));
        assert_eq!(registration_message(&email), "This email is already in use");

        let password = anyhow::Error::new(ApiError::from_body(
            400,
            r#"{"message":"x","data":{"password":{"code":"validation_length","message":"Too weak."}}}"#,
        ));
        assert_eq!(registration_message(&password), "Too weak.");

        let network = anyhow::anyhow!("connection refused");
        assert_eq!(registration_message(&network), REGISTER_FALLBACK_MESSAGE);
        assert_eq!(login_message(&network), LOGIN_FALLBACK_MESSAGE);
    }

    fn viewer() -> User {
        User {
            id: "u1".to_string(),
            username: "neo".to_string(),
            email: String::new(),
            name: None,
            slug: None,
            bio: None,
            avatar: None,
            role: None,
            verified: false,
            created: String::new(),
            updated: String::new(),
        }
    }

    #[tokio::test]
    async fn store_replaces_cached_user() {
        let store = SessionStore::new();
        let user = viewer();
        store.insert("t1".to_string(), user.clone()).await;
        let renamed = User {
            username: "thomas".to_string(),
            ..user
        };
        store.replace_user("t1", renamed).await;
        assert_eq!(store.get("t1").await.map(|s| s.user.username), Some("thomas".to_string()));
        assert!(sign_out(&store, "t1").await);
        assert!(store.get("t1").await.is_none());
    }

    #[tokio::test]
    async fn stale_sessions_are_hidden_and_pruned() {
        let store = SessionStore::with_ttl(Duration::zero());
        store.insert("t1".to_string(), viewer()).await;
        assert!(store.get("t1").await.is_none());

        store.insert("t2".to_string(), viewer()).await;
        assert_eq!(store.len().await, 1);

        let lasting = SessionStore::new();
        lasting.insert("t1".to_string(), viewer()).await;
        assert!(lasting.get("t1").await.is_some());
    }
}
