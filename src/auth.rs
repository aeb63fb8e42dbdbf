use std::future::Future;
use std::time::Duration;

use actix_session::Session;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand_core::OsRng;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ProfileRow, UserRow};

const SESSION_USER_KEY: &str = "user_id";

/// Profiles are provisioned by a database trigger after the user row is
/// inserted; sign-up polls for the row with this budget.
pub const PROFILE_POLL_ATTEMPTS: u32 = 10;
pub const PROFILE_POLL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("e-mail already registered")]
    EmailTaken,
    #[error("password hashing failed")]
    Hash,
    #[error("session write failed: {0}")]
    Session(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Localized message shown to the user; internal failures collapse to
    /// a generic line and are only detailed in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "E-mail ou senha incorretos.",
            AuthError::EmailTaken => "Este e-mail já está cadastrado. Tente fazer login.",
            AuthError::Hash | AuthError::Session(_) | AuthError::Database(_) => {
                "Erro ao processar. Tente novamente em instantes."
            }
        }
    }
}

/// The authenticated identity plus its profile, when one exists. The
/// profile can legitimately be absent right after sign-up (see
/// [`sign_up`]); anything profile-dependent must tolerate `None`.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: UserRow,
    pub profile: Option<ProfileRow>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.profile
            .as_ref()
            .map(|profile| profile.is_admin == 1)
            .unwrap_or(false)
    }

    pub fn display_name(&self) -> String {
        self.profile
            .as_ref()
            .and_then(|profile| profile.full_name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.user.email.clone())
    }
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn fetch_profile(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(
        r#"SELECT id, email, full_name, phone, is_admin, created_at, updated_at
           FROM profiles
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Loads the session's user and profile, if any. Stale sessions that
/// point at a deleted user behave like anonymous visitors.
pub async fn current_user(session: &Session, pool: &SqlitePool) -> Option<CurrentUser> {
    let user_id: String = session.get(SESSION_USER_KEY).ok().flatten()?;

    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password_hash, created_at FROM users WHERE id = ? LIMIT 1",
    )
    .bind(&user_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)?;

    let profile = fetch_profile(pool, &user.id).await.unwrap_or(None);
    Some(CurrentUser { user, profile })
}

pub async fn sign_in(
    pool: &SqlitePool,
    session: &Session,
    email: &str,
    password: &str,
) -> Result<CurrentUser, AuthError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = ? LIMIT 1",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    session
        .insert(SESSION_USER_KEY, user.id.clone())
        .map_err(|err| AuthError::Session(err.to_string()))?;

    let profile = fetch_profile(pool, &user.id).await.unwrap_or(None);
    Ok(CurrentUser { user, profile })
}

#[derive(Debug)]
pub struct SignUpOutcome {
    pub user_id: String,
    /// False when the trigger-provisioned profile never showed up inside
    /// the polling budget. The identity is valid either way.
    pub profile_provisioned: bool,
}

/// Creates the identity, then waits for the database-provisioned profile
/// and stamps the sign-up name/phone onto it. Password and phone policy
/// are the caller's responsibility; this only guards e-mail uniqueness.
pub async fn sign_up(
    pool: &SqlitePool,
    session: &Session,
    email: &str,
    password: &str,
    full_name: &str,
    phone: &str,
) -> Result<SignUpOutcome, AuthError> {
    let password_hash = hash_password(password).map_err(|_| AuthError::Hash)?;
    let user_id = new_id();
    let now = Utc::now().to_rfc3339();

    let inserted = sqlx::query(
        "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(email.trim())
    .bind(password_hash)
    .bind(&now)
    .execute(pool)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AuthError::EmailTaken);
        }
        return Err(err.into());
    }

    let profile = poll_until(PROFILE_POLL_ATTEMPTS, PROFILE_POLL_DELAY, || {
        let pool = pool.clone();
        let user_id = user_id.clone();
        async move { fetch_profile(&pool, &user_id).await.ok().flatten() }
    })
    .await;

    let profile_provisioned = match profile {
        Some(_) => {
            sqlx::query(
                "UPDATE profiles SET full_name = ?, phone = ?, updated_at = ? WHERE id = ?",
            )
            .bind(full_name.trim())
            .bind(phone)
            .bind(Utc::now().to_rfc3339())
            .bind(&user_id)
            .execute(pool)
            .await?;
            true
        }
        None => {
            log::warn!("Profile for user {user_id} not provisioned within the polling budget");
            false
        }
    };

    session
        .insert(SESSION_USER_KEY, user_id.clone())
        .map_err(|err| AuthError::Session(err.to_string()))?;

    Ok(SignUpOutcome {
        user_id,
        profile_provisioned,
    })
}

pub fn sign_out(session: &Session) {
    session.purge();
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Bounded fixed-delay poll: probes up to `attempts` times, sleeping
/// `delay` after each miss, and reports not-found as `None` instead of
/// pretending success.
pub async fn poll_until<T, F, Fut>(attempts: u32, delay: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..attempts {
        if let Some(found) = probe().await {
            return Some(found);
        }
        tokio::time::sleep(delay).await;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("Abc123!").unwrap();
        assert!(verify_password("Abc123!", &hash));
        assert!(!verify_password("abc123!", &hash));
        assert!(!verify_password("Abc123!", "not-a-hash"));
    }

    #[tokio::test]
    async fn poll_until_returns_as_soon_as_the_probe_succeeds() {
        let calls = AtomicU32::new(0);
        let result = poll_until(10, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { (n == 3).then_some(n) }
        })
        .await;
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn poll_until_gives_up_after_the_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Option<u32> = poll_until(4, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
