//! Test utilities for integration testing.

use crate::{
    Application, BackgroundServices,
    api::models::users::{CurrentUser, Role, RoleFlags},
    auth::session,
    config::{Config, DummyPaymentConfig, EmailTransportConfig, PaymentConfig},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    payment_providers::signing,
};
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_test_app(pool: PgPool) -> (TestServer, BackgroundServices) {
    let config = create_test_config();

    let app = Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("mercado-test-emails-{}", std::process::id()));

    let mut config = Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        payment: Some(PaymentConfig::Dummy(DummyPaymentConfig {
            webhook_secret: signing::generate_secret(),
        })),
        ..Default::default()
    };

    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().to_string(),
    };
    config.auth.native.session.cookie_secure = false;
    // Fast argon2 so auth tests don't crawl
    config.auth.native.password.argon2_memory_kib = 128;
    config.auth.native.password.argon2_iterations = 1;
    config.background_services.boost_expiry_sweep.enabled = false;

    config
}

/// A user with zero credits and a unique username and email
pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    create_test_user_with_flags(pool, role, RoleFlags::default()).await
}

pub async fn create_test_user_with_flags(pool: &PgPool, role: Role, flags: RoleFlags) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire database connection");
    let suffix = Uuid::new_v4().simple().to_string();

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            username: format!("user_{}", &suffix[..12]),
            email: format!("{}@example.com", &suffix[..12]),
            display_name: None,
            password_hash: None,
            role,
            flags,
            email_verified: true,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_admin_user(pool: &PgPool) -> UserDBResponse {
    create_test_user(pool, Role::Admin).await
}

/// Bearer session header for `user`, signed with the test config's secret
pub fn add_auth_headers(user: &UserDBResponse) -> Vec<(String, String)> {
    let config = create_test_config();
    let token = session::create_session_token(&CurrentUser::from(user), &config).expect("Failed to create session token");
    vec![("authorization".to_string(), format!("Bearer {token}"))]
}
