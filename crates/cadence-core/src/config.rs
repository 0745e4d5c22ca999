//! Configuration module
//!
//! Environment-driven configuration for the transcoding orchestrator: server and
//! database settings, the two signing secrets, and the external job service.

use std::env;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const RUNPOD_API_BASE_URL: &str = "https://api.runpod.ai/v2";
const RUNPOD_SUBMIT_TIMEOUT_SECS: u64 = 15;
const SIGNATURE_MAX_SKEW_SECS: u64 = 300;
const TRANSCODING_REVIEW_THRESHOLD: i32 = 5;
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Shared secret for worker-to-worker calls (trigger, retry, status).
    pub internal_signing_secret: Option<String>,
    /// Secret the external job service signs its callbacks with.
    pub runpod_webhook_secret: Option<String>,
    pub runpod_api_key: Option<String>,
    pub runpod_endpoint_id: Option<String>,
    pub runpod_api_base_url: String,
    pub runpod_submit_timeout_secs: u64,
    /// Public base URL of this service; the callback URL is derived from it.
    pub webhook_base_url: String,
    pub signature_max_skew_secs: u64,
    /// Attempts after which a media item is flagged for operator review.
    /// Advisory only: retries are never blocked.
    pub transcoding_review_threshold: i32,
    pub max_request_body_bytes: usize,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let server_port = env::var("PORT")
            .or_else(|_| env::var("SERVER_PORT"))
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(SERVER_PORT);

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .unwrap_or(MAX_CONNECTIONS);

        let db_timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(CONNECTION_TIMEOUT_SECS);

        let runpod_api_base_url = env::var("RUNPOD_API_BASE_URL")
            .unwrap_or_else(|_| RUNPOD_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let runpod_submit_timeout_secs = env::var("RUNPOD_SUBMIT_TIMEOUT_SECS")
            .unwrap_or_else(|_| RUNPOD_SUBMIT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(RUNPOD_SUBMIT_TIMEOUT_SECS);

        let webhook_base_url = env::var("WEBHOOK_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let signature_max_skew_secs = env::var("SIGNATURE_MAX_SKEW_SECS")
            .unwrap_or_else(|_| SIGNATURE_MAX_SKEW_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(SIGNATURE_MAX_SKEW_SECS);

        let transcoding_review_threshold = env::var("TRANSCODING_REVIEW_THRESHOLD")
            .unwrap_or_else(|_| TRANSCODING_REVIEW_THRESHOLD.to_string())
            .parse::<i32>()
            .unwrap_or(TRANSCODING_REVIEW_THRESHOLD);

        let max_request_body_bytes = env::var("MAX_REQUEST_BODY_BYTES")
            .unwrap_or_else(|_| MAX_REQUEST_BODY_BYTES.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_REQUEST_BODY_BYTES);

        Ok(Config {
            server_port,
            environment,
            cors_origins,
            database_url,
            db_max_connections,
            db_timeout_seconds,
            internal_signing_secret: non_empty_var("INTERNAL_SIGNING_SECRET"),
            runpod_webhook_secret: non_empty_var("RUNPOD_WEBHOOK_SECRET"),
            runpod_api_key: non_empty_var("RUNPOD_API_KEY"),
            runpod_endpoint_id: non_empty_var("RUNPOD_ENDPOINT_ID"),
            runpod_api_base_url,
            runpod_submit_timeout_secs,
            webhook_base_url,
            signature_max_skew_secs,
            transcoding_review_threshold,
            max_request_body_bytes,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.server_port == 0 {
            return Err(anyhow::anyhow!("PORT must be greater than 0"));
        }

        if self.transcoding_review_threshold < 1 {
            return Err(anyhow::anyhow!(
                "TRANSCODING_REVIEW_THRESHOLD must be at least 1"
            ));
        }

        if self.runpod_submit_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "RUNPOD_SUBMIT_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.is_production() {
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            for (name, value) in [
                ("INTERNAL_SIGNING_SECRET", &self.internal_signing_secret),
                ("RUNPOD_WEBHOOK_SECRET", &self.runpod_webhook_secret),
                ("RUNPOD_API_KEY", &self.runpod_api_key),
                ("RUNPOD_ENDPOINT_ID", &self.runpod_endpoint_id),
            ] {
                if value.is_none() {
                    return Err(anyhow::anyhow!("{} must be set in production", name));
                }
            }
            if !self.webhook_base_url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "WEBHOOK_BASE_URL must use https in production"
                ));
            }
        }

        if let (Some(internal), Some(webhook)) =
            (&self.internal_signing_secret, &self.runpod_webhook_secret)
        {
            if internal == webhook {
                return Err(anyhow::anyhow!(
                    "INTERNAL_SIGNING_SECRET and RUNPOD_WEBHOOK_SECRET must differ"
                ));
            }
        }

        Ok(())
    }

    /// Callback URL handed to the external job service.
    pub fn webhook_url(&self) -> String {
        format!("{}/webhooks/runpod", self.webhook_base_url)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
