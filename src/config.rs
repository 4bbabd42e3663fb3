// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Time-spent value recorded for a question when the client omits it (seconds).
pub const DEFAULT_TIME_SPENT_SECS: i32 = 10;

/// Default page size for listing endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Shared secret used to verify session tokens issued by the identity provider.
    pub jwt_secret: String,
    /// Shared secret expected in the X-Webhook-Secret header on user-sync calls.
    pub webhook_secret: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let webhook_secret = env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            webhook_secret,
            rust_log,
        }
    }
}
