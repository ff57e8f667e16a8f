//! Authentication and account tests
//!
//! Property-based and unit tests for:
//! - Credential checks and token round-trips
//! - Admin bootstrap on an empty user table
//! - Input validation shared with the order form

mod common;

use common::*;
use injera_backend::{
    config::AuthConfig,
    services::auth::{CreateUserInput, LoginInput},
    AppError,
};
use proptest::prelude::*;
use shared::{validation, UserRole};
use validator::Validate;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|org|net|et)"
}

/// Generate valid passwords (8+ chars)
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#$%]{8,20}"
}

/// Generate phone numbers in the formats customers type
fn phone_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\+251 9[0-9]{2} [0-9]{3} [0-9]{3}",
        "09[0-9]{8}",
        "\\(0[0-9]{2}\\) [0-9]{3}-[0-9]{4}",
    ]
}

fn role_strategy() -> impl Strategy<Value = UserRole> {
    prop_oneof![Just(UserRole::Admin), Just(UserRole::Staff)]
}

proptest! {
    #[test]
    fn test_valid_emails_accepted(email in email_strategy(), password in password_strategy()) {
        let input = LoginInput { email, password };
        prop_assert!(input.validate().is_ok());
    }

    #[test]
    fn test_malformed_emails_rejected(local in "[a-z]{3,10}", password in password_strategy()) {
        let input = LoginInput { email: local, password };
        prop_assert!(input.validate().is_err());
    }

    #[test]
    fn test_passwords_of_eight_chars_accepted(password in password_strategy()) {
        prop_assert!(validation::validate_password(&password).is_ok());
    }

    #[test]
    fn test_short_passwords_rejected(password in "[a-z0-9]{0,7}") {
        prop_assert!(validation::validate_password(&password).is_err());
    }

    #[test]
    fn test_phone_formats_accepted(phone in phone_strategy()) {
        prop_assert!(validation::validate_phone(&phone).is_ok());
    }

    #[test]
    fn test_phone_with_letters_rejected(phone in "[0-9]{4}[a-z]{1,3}[0-9]{4}") {
        prop_assert!(validation::validate_phone(&phone).is_err());
    }

    #[test]
    fn test_role_round_trip(role in role_strategy()) {
        prop_assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
    }
}

proptest! {
    // Every case hashes a password
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// A token carries the user's id, email and role
    #[test]
    fn test_token_round_trip(role in role_strategy(), email in email_strategy()) {
        let state = test_state();
        let user = tokio_test::block_on(async {
            create_user(&state, &email, role).await
        });

        let auth = state.auth_service();
        let token = auth.generate_token(&user).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        prop_assert_eq!(claims.sub, user.id.to_string());
        prop_assert_eq!(claims.email, email);
        prop_assert_eq!(claims.role, role.as_str());
        prop_assert!(claims.exp > claims.iat);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[tokio::test]
async fn test_login_records_last_login() {
    let state = test_state();
    let user = create_user(&state, "staff@injera.test", UserRole::Staff).await;
    assert!(user.last_login_at.is_none());

    let token = state
        .auth_service()
        .login(LoginInput {
            email: "staff@injera.test".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(token.token_type, "Bearer");
    assert!(token.user.last_login_at.is_some());

    let stored = state.auth_service().current_user(user.id).await.unwrap();
    assert!(stored.last_login_at.is_some());
}

#[tokio::test]
async fn test_login_rejects_unknown_email_and_wrong_password() {
    let state = test_state();
    create_user(&state, "staff@injera.test", UserRole::Staff).await;
    let auth = state.auth_service();

    let unknown = auth
        .login(LoginInput {
            email: "nobody@injera.test".to_string(),
            password: "correct-horse".to_string(),
        })
        .await;
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));

    let wrong = auth
        .login(LoginInput {
            email: "staff@injera.test".to_string(),
            password: "incorrect".to_string(),
        })
        .await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let state = test_state();
    let user = create_user(&state, "admin@injera.test", UserRole::Admin).await;
    let token = state.auth_service().generate_token(&user).unwrap();

    let other = injera_backend::AppState::new(
        injera_backend::store::Stores::in_memory(),
        injera_backend::Config::in_memory("another-secret"),
    )
    .unwrap();

    assert!(matches!(
        other.auth_service().validate_token(&token),
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let state = test_state();
    create_user(&state, "staff@injera.test", UserRole::Staff).await;

    let result = state
        .auth_service()
        .create_user(
            CreateUserInput {
                email: "staff@injera.test".to_string(),
                name: "Second".to_string(),
                password: "correct-horse".to_string(),
                role: UserRole::Staff,
            },
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[tokio::test]
async fn test_short_password_rejected_on_create() {
    let state = test_state();
    let result = state
        .auth_service()
        .create_user(
            CreateUserInput {
                email: "staff@injera.test".to_string(),
                name: "Staff".to_string(),
                password: "short".to_string(),
                role: UserRole::Staff,
            },
            None,
        )
        .await;

    match result {
        Err(AppError::Validation { field, .. }) => assert_eq!(field, "password"),
        other => panic!("expected validation error, got {:?}", other.map(|u| u.email)),
    }
}

#[tokio::test]
async fn test_bootstrap_admin_only_on_empty_table() {
    let state = test_state();
    let config = AuthConfig {
        bootstrap_admin_email: Some("owner@injera.test".to_string()),
        bootstrap_admin_password: Some("change-me-now".to_string()),
        bootstrap_admin_name: None,
    };

    let admin = state
        .auth_service()
        .bootstrap_admin(&config)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, UserRole::Admin);
    assert_eq!(admin.name, "Administrator");

    let again = state.auth_service().bootstrap_admin(&config).await.unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_bootstrap_skipped_without_credentials() {
    let state = test_state();
    let result = state
        .auth_service()
        .bootstrap_admin(&AuthConfig::default())
        .await
        .unwrap();
    assert!(result.is_none());
}
