use chrono::NaiveTime;
use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub jobs: JobsConfig,
    pub reads: ReadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    /// Allowed CORS origin for the frontend. `None` means permissive.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    /// Super-admin created at startup when none exists yet.
    pub bootstrap_username: String,
    #[serde(default)]
    pub bootstrap_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub dir: String,
    /// Public URL prefix the uploads directory is served under.
    pub url_prefix: String,
    pub max_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    pub publish_check_interval_secs: u64,
    /// Local time of day (`HH:MM`) for the image sweep.
    pub image_gc_time: String,
    pub image_retention_days: i64,
}

impl JobsConfig {
    pub fn publish_check_interval(&self) -> Result<std::time::Duration, ConfigError> {
        if self.publish_check_interval_secs == 0 {
            return Err(ConfigError::Message(
                "jobs.publish_check_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(std::time::Duration::from_secs(self.publish_check_interval_secs))
    }

    pub fn gc_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.image_gc_time.trim(), "%H:%M").map_err(|e| {
            ConfigError::Message(format!("Invalid jobs.image_gc_time '{}': {}", self.image_gc_time, e))
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReadConfig {
    pub cooldown_secs: i64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("server.base_url", "http://localhost:3001")?
            .set_default("database.url", "sqlite://postboard.db")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.bootstrap_username", "admin")?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.url_prefix", "/uploads")?
            .set_default("uploads.max_bytes", 5 * 1024 * 1024)?
            .set_default("jobs.publish_check_interval_secs", 60)?
            .set_default("jobs.image_gc_time", "02:00")?
            .set_default("jobs.image_retention_days", 30)?
            .set_default("reads.cooldown_secs", 60)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with POSTBOARD__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("POSTBOARD").separator("__"))

            // The frontend tooling only knows the bare PORT variable
            .set_override_option("server.port", std::env::var("PORT").ok())?

            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that would only fail later inside a background job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jobs.publish_check_interval()?;
        self.jobs.gc_time()?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                base_url: "http://localhost:3001".to_string(),
                cors_origin: None,
            },
            database: DatabaseConfig {
                url: "sqlite://postboard.db".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 5,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                bootstrap_username: "admin".to_string(),
                bootstrap_password: None,
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                url_prefix: "/uploads".to_string(),
                max_bytes: 5 * 1024 * 1024,
            },
            jobs: JobsConfig {
                publish_check_interval_secs: 60,
                image_gc_time: "02:00".to_string(),
                image_retention_days: 30,
            },
            reads: ReadConfig {
                cooldown_secs: 60,
            },
        }
    }
}
