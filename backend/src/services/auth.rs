//! Authentication service for staff login, token validation and accounts

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{actions, entities, validation, ListRange, NewActivity, Page, SortSpec, User, UserRole};
use validator::Validate;

use crate::config::{AuthConfig, Config};
use crate::error::{AppError, AppResult};
use crate::services::audit::AuditRecorder;
use crate::store::{NewUser, UserStore};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Input for creating a staff account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Response after successful login
#[derive(Debug, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    recorder: AuditRecorder,
    jwt_secret: String,
    access_token_expiry: i64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, recorder: AuditRecorder, config: &Config) -> Self {
        Self {
            users,
            recorder,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthToken> {
        input.validate()?;

        let credentials = self
            .users
            .find_credentials(input.email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !credentials.user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(&input.password, &credentials.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        self.users.record_login(credentials.user.id, now).await?;

        let mut user = credentials.user;
        user.last_login_at = Some(now);

        tracing::info!(user_id = user.id, "User logged in");

        Ok(AuthToken {
            access_token: self.generate_token(&user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }

    /// Sign an access token for a user
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    pub async fn current_user(&self, id: i64) -> AppResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    pub async fn list_users(&self, sort: &SortSpec, range: ListRange) -> AppResult<Page<User>> {
        self.users.list_users(sort, range).await
    }

    pub async fn create_user(&self, input: CreateUserInput, actor: Option<i64>) -> AppResult<User> {
        input.validate()?;
        validation::validate_password(&input.password).map_err(|m| AppError::validation("password", m))?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = self
            .users
            .insert_user(NewUser {
                email: input.email.trim().to_string(),
                name: input.name.trim().to_string(),
                password_hash,
                role: input.role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = user.role.as_str(), "User created");

        self.recorder
            .record_activity(
                NewActivity::new(actions::USER_CREATED, entities::USER, Some(user.id))
                    .by(actor)
                    .details(serde_json::json!({ "email": user.email, "role": user.role })),
            )
            .await;

        Ok(user)
    }

    /// Create the configured admin account when no user exists yet
    pub async fn bootstrap_admin(&self, config: &AuthConfig) -> AppResult<Option<User>> {
        let (Some(email), Some(password)) = (&config.bootstrap_admin_email, &config.bootstrap_admin_password)
        else {
            return Ok(None);
        };

        if self.users.count_users().await? > 0 {
            return Ok(None);
        }

        let user = self
            .create_user(
                CreateUserInput {
                    email: email.clone(),
                    name: config
                        .bootstrap_admin_name
                        .clone()
                        .unwrap_or_else(|| "Administrator".to_string()),
                    password: password.clone(),
                    role: UserRole::Admin,
                },
                None,
            )
            .await?;

        tracing::info!(email = %user.email, "Bootstrap admin account created");
        Ok(Some(user))
    }
}
