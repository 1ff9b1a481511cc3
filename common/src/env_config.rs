use std::{env, sync::Arc, time::Duration};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, session token configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, outbound email settings and rate limiting.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Configuration for session tokens (JWT).
    pub jwt_config: JwtConfig,
    /// Configuration for emailed verification/reset tokens.
    pub token_config: TokenConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// SMTP settings. `None` when `SMTP_HOST` is not set.
    pub smtp: Option<SmtpConfig>,
    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Upper bound for generating one export document, in seconds.
    pub export_timeout_secs: u64,
}

#[derive(Clone, Debug)]
/// Configuration for session tokens.
///
/// Session tokens are signed with a server-held secret and expire
/// [`SESSION_TTL_DAYS`] days after issuance. There is no refresh mechanism.
pub struct JwtConfig {
    /// The secret key used to sign and verify session tokens.
    pub secret: String,
}

/// Lifetime of a session token.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
/// Configuration for single-use verification and password reset tokens.
pub struct TokenConfig {
    /// Secret mixed into every generated token.
    pub secret: String,
    /// Public base URL used to build the links that are emailed to users.
    pub public_base_url: String,
    /// Upper bound for one email send, in seconds.
    pub email_timeout_secs: u64,
}

impl TokenConfig {
    pub fn email_timeout(&self) -> Duration {
        Duration::from_secs(self.email_timeout_secs)
    }
}

#[derive(Clone, Debug)]
/// SMTP connection settings for outbound email.
pub struct SmtpConfig {
    pub host: String,
    /// 465 uses implicit TLS, any other port negotiates STARTTLS.
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. `QR Service <no-reply@example.com>`.
    pub from: String,
}

#[derive(Clone, Debug)]
/// Fixed-window rate limiting keyed by client address.
pub struct RateLimitConfig {
    /// Requests allowed per client within one window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads `JWT_SECRET` (required).
    ///
    /// # Panics
    ///
    /// This function will panic if `JWT_SECRET` environment variable is not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
        }
    }
}

impl SmtpConfig {
    /// Reads SMTP settings. Returns `None` when `SMTP_HOST` is unset or empty,
    /// in which case outbound email is only logged.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
        let username = env::var("SMTP_USER").unwrap_or_default();
        let from = env::var("EMAIL_FROM").unwrap_or_else(|_| format!("QR Service <{}>", username));

        Some(SmtpConfig {
            host,
            port: parse_or("SMTP_PORT", 465),
            username,
            password: env::var("SMTP_PASS").unwrap_or_default(),
            from,
        })
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for session token signing (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `TOKEN_SECRET`: Secret for emailed tokens (default: value of `JWT_SECRET`)
    /// - `PUBLIC_BASE_URL`: Base URL for emailed links (default: "http://localhost:8080")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `EMAIL_FROM`: outbound email
    /// - `EMAIL_TIMEOUT_SECS`: Bound on one email send (default: 10)
    /// - `EXPORT_TIMEOUT_SECS`: Bound on one export (default: 30)
    /// - `RATE_LIMIT_MAX_REQUESTS`: Requests per window per client (default: 100)
    /// - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let jwt_config = JwtConfig::from_env();
        let token_secret = env::var("TOKEN_SECRET").unwrap_or_else(|_| jwt_config.secret.clone());

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config,
            token_config: TokenConfig {
                secret: token_secret,
                public_base_url: env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
                email_timeout_secs: parse_or("EMAIL_TIMEOUT_SECS", 10),
            },
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_or("PORT", 8080),
            num_workers: parse_or("WORKERS", 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            smtp: SmtpConfig::from_env(),
            rate_limit: RateLimitConfig {
                max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 100),
                window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 60),
            },
            export_timeout_secs: parse_or("EXPORT_TIMEOUT_SECS", 30),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
