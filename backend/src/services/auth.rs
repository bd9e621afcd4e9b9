//! Authentication service for user registration, login, and token management

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{User, UserRole};
use shared::validation::{validate_email, validate_name, validate_password};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new user account
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Input for logging in
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for refreshing an access token
#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// Input for changing a user's role
#[derive(Debug, Deserialize)]
pub struct UpdateRoleInput {
    pub role: UserRole,
}

/// Response after successful login or registration
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Account row for the current-user lookup
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    is_active: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new user account
    ///
    /// New accounts start as operators; role changes are an admin concern.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        validate_email(&input.email).map_err(|m| AppError::Validation {
            field: "email".to_string(),
            message: m.to_string(),
        })?;
        validate_password(&input.password).map_err(|m| AppError::Validation {
            field: "password".to_string(),
            message: m.to_string(),
        })?;
        validate_name(&input.full_name).map_err(|m| AppError::Validation {
            field: "full_name".to_string(),
            message: m.to_string(),
        })?;

        let email = input.email.trim().to_lowercase();

        let email_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if email_exists {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let role = UserRole::Operator;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(input.full_name.trim())
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await?;

        let tokens = self.generate_tokens(user_id, role)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user_id, "User registered");

        Ok(AuthResponse {
            user_id,
            email,
            full_name: input.full_name.trim().to_string(),
            role,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        let email = input.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, full_name, role, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        // Update last login
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let role = UserRole::from_str(&user.role)
            .map_err(|_| AppError::Internal(format!("Unknown role in database: {}", user.role)))?;

        let tokens = self.generate_tokens(user.id, role)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(AuthResponse {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
            role,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        })
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let token_record = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT rt.user_id, u.role
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid or expired refresh token".to_string())
        })?;

        let (user_id, role) = token_record;
        let role = UserRole::from_str(&role)
            .map_err(|_| AppError::Internal(format!("Unknown role in database: {}", role)))?;

        // Revoke old refresh token
        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(user_id, role)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Fetch the account behind an authenticated request
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, full_name, role, is_active, last_login_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Self::row_to_user(row)
    }

    /// List all user accounts, admin only
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, full_name, role, is_active, last_login_at, created_at
            FROM users
            ORDER BY full_name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    /// Change a user's role, admin only
    pub async fn update_user_role(&self, user_id: Uuid, role: UserRole) -> AppResult<User> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, email, full_name, role, is_active, last_login_at, created_at
            "#,
        )
        .bind(role.as_str())
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user_id, role = %role, "User role updated");

        Self::row_to_user(row)
    }

    /// Flip a user account between active and disabled, admin only
    ///
    /// Disabling blocks new logins and refresh grants; already-issued access
    /// tokens remain valid until they expire.
    pub async fn toggle_user_status(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE users
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, full_name, role, is_active, last_login_at, created_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(user_id = %user_id, is_active = row.is_active, "User status toggled");

        Self::row_to_user(row)
    }

    fn row_to_user(row: AccountRow) -> AppResult<User> {
        let role = UserRole::from_str(&row.role)
            .map_err(|_| AppError::Internal(format!("Unknown role in database: {}", row.role)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: Uuid, role: UserRole) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (opaque random token, only its hash is stored)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at: DateTime<Utc> = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        BASE64.encode(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_and_opaque() {
        let a = AuthService::hash_token("some-refresh-token");
        let b = AuthService::hash_token("some-refresh-token");
        let c = AuthService::hash_token("another-token");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, "some-refresh-token");
    }
}
