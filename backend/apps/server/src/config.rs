//! Server configuration from the environment

use std::net::SocketAddr;
use std::time::Duration;

use auth::AuthConfig;
use platform::config::{ConfigError, env_bool, env_opt, env_or, env_parse_or, env_required, env_secret};
use platform::rate_limit::RateLimitConfig;
use realm::RealmConfig;
use verification::VerificationConfig;

const DEFAULT_PORT: u16 = 31113;
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";
const DEFAULT_BACKUP_MIN_INTERVAL_SECS: u64 = 6 * 3600;

/// Settings for the `/api/jobs` endpoints
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Bearer token the scheduler presents; jobs are disabled without it
    pub job_token: Option<String>,
    pub backup_export_url: Option<String>,
    /// Minimum time between two backups
    pub backup_min_interval: Duration,
    pub http_client: reqwest::Client,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_token: None,
            backup_export_url: None,
            backup_min_interval: Duration::from_secs(DEFAULT_BACKUP_MIN_INTERVAL_SECS),
            http_client: reqwest::Client::new(),
        }
    }
}

/// Initial system admin, created on an empty database
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    /// Random secrets and insecure cookies are allowed
    pub dev_mode: bool,
    pub auth: AuthConfig,
    pub realm: RealmConfig,
    pub verification: VerificationConfig,
    pub jobs: JobConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let dev_mode = env_bool("DEV_MODE", cfg!(debug_assertions));
        let http_client = reqwest::Client::new();

        let mut auth = if dev_mode {
            AuthConfig::development()
        } else {
            AuthConfig::default()
        };
        auth.session_secret = env_secret("SESSION_SECRET", dev_mode)?;
        auth.password_pepper = env_opt("PASSWORD_PEPPER").map(String::into_bytes);
        if let Some(url) = env_opt("PASSWORD_RESET_URL") {
            auth.reset_url_base = url;
        }
        auth.http_client = http_client.clone();

        let realm = RealmConfig {
            api_key_secret: env_secret("API_KEY_HMAC_SECRET", dev_mode)?,
            redirect_domain: env_opt("ENX_REDIRECT_DOMAIN"),
            http_client: http_client.clone(),
            ..RealmConfig::default()
        };

        let default_rate = if dev_mode { 600 } else { 60 };
        let verification = VerificationConfig {
            code_hmac_secret: env_secret("CODE_HMAC_SECRET", dev_mode)?,
            api_rate_limit: RateLimitConfig::per_minute(env_parse_or(
                "API_RATE_LIMIT_PER_MINUTE",
                default_rate,
            )?),
            ..VerificationConfig::default()
        };

        let jobs = JobConfig {
            job_token: env_opt("JOB_TOKEN"),
            backup_export_url: env_opt("BACKUP_EXPORT_URL"),
            backup_min_interval: Duration::from_secs(env_parse_or(
                "BACKUP_MIN_INTERVAL_SECS",
                DEFAULT_BACKUP_MIN_INTERVAL_SECS,
            )?),
            http_client,
        };

        let bootstrap_admin = match (env_opt("BOOTSTRAP_ADMIN_EMAIL"), env_opt("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (Some(_), None) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD".into())),
            _ => None,
        };

        let bind_addr = env_parse_or(
            "BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        )?;

        Ok(Self {
            database_url: env_required("DATABASE_URL")?,
            bind_addr,
            frontend_origins: parse_origins(&env_or("FRONTEND_ORIGINS", DEFAULT_FRONTEND_ORIGINS)),
            dev_mode,
            auth,
            realm,
            verification,
            jobs,
            bootstrap_admin,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
