//! Environment-based configuration.
//!
//! All runtime settings come from environment variables with development
//! defaults, so the binary starts locally with nothing but a Mongo
//! instance running. Production refuses to start with the built-in JWT
//! secret.

use std::env;
use std::path::PathBuf;

/// Application environment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// SMTP settings; absent when `SMTP_HOST` is not configured, which
/// disables the mail endpoints.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub bind_addr: String,
    pub mongo_uri: String,
    pub mongo_db: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub max_page_size: u64,
    /// Role labels counted toward sales totals and leaderboards.
    pub sales_roles: Vec<String>,
    pub auth_rate_max: u32,
    pub auth_rate_window_secs: i64,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    pub smtp: Option<SmtpConfig>,
}

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";
const DEFAULT_SALES_ROLES: &str = "sales,cashier,manager";

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let environment = Environment::from_env();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => {
                return Err("JWT_SECRET must be set in production".to_string());
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let sales_roles: Vec<String> = env_or("SALES_ROLES", DEFAULT_SALES_ROLES)
            .split(',')
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .collect();
        if sales_roles.is_empty() {
            return Err("SALES_ROLES must name at least one role".to_string());
        }

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host: host.trim().to_string(),
                port: env_parse("SMTP_PORT", 587),
                username: env_or("SMTP_USERNAME", ""),
                password: env_or("SMTP_PASSWORD", ""),
                from_email: env_or("SMTP_FROM_EMAIL", "no-reply@storegoals.app"),
                from_name: env_or("SMTP_FROM_NAME", "Store Goals"),
            }),
            _ => None,
        };

        Ok(Config {
            environment,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:4000"),
            mongo_uri: env_or("MONGO_URI", "mongodb://127.0.0.1:27017"),
            mongo_db: env_or("MONGO_DB", "store_goals"),
            jwt_secret,
            token_ttl_hours: env_parse("TOKEN_TTL_HOURS", 72),
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
            max_page_size: env_parse("PAGE_SIZE_MAX", 100),
            sales_roles,
            auth_rate_max: env_parse("AUTH_RATE_MAX", 10),
            auth_rate_window_secs: env_parse("AUTH_RATE_WINDOW_SECS", 60),
            backup_dir: PathBuf::from(env_or("BACKUP_DIR", "./backups")),
            log_dir: PathBuf::from(env_or("LOG_DIR", "./logs")),
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_config_env() {
        for key in [
            "APP_ENV",
            "JWT_SECRET",
            "BIND_ADDR",
            "MONGO_URI",
            "MONGO_DB",
            "TOKEN_TTL_HOURS",
            "BCRYPT_COST",
            "PAGE_SIZE_MAX",
            "SALES_ROLES",
            "AUTH_RATE_MAX",
            "AUTH_RATE_WINDOW_SECS",
            "BACKUP_DIR",
            "LOG_DIR",
            "SMTP_HOST",
            "SMTP_PORT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn development_defaults_are_usable() {
        clear_config_env();
        let config = Config::from_env().expect("dev config should build");
        assert!(config.environment.is_development());
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.mongo_db, "store_goals");
        assert_eq!(config.max_page_size, 100);
        assert!(config.smtp.is_none());
        assert_eq!(config.sales_roles, vec!["sales", "cashier", "manager"]);
    }

    #[test]
    #[serial]
    fn production_requires_a_jwt_secret() {
        clear_config_env();
        env::set_var("APP_ENV", "production");
        assert!(Config::from_env().is_err());

        env::set_var("JWT_SECRET", "a-real-secret");
        let config = Config::from_env().expect("production config with secret");
        assert!(config.environment.is_production());
        assert_eq!(config.jwt_secret, "a-real-secret");
        clear_config_env();
    }

    #[test]
    #[serial]
    fn sales_roles_parse_and_trim() {
        clear_config_env();
        env::set_var("SALES_ROLES", " seller , floor lead ,");
        let config = Config::from_env().expect("config should build");
        assert_eq!(config.sales_roles, vec!["seller", "floor lead"]);
        clear_config_env();
    }

    #[test]
    #[serial]
    fn smtp_block_requires_host() {
        clear_config_env();
        env::set_var("SMTP_HOST", "mail.example.com");
        env::set_var("SMTP_PORT", "2525");
        let config = Config::from_env().expect("config should build");
        let smtp = config.smtp.expect("smtp should be configured");
        assert_eq!(smtp.host, "mail.example.com");
        assert_eq!(smtp.port, 2525);
        clear_config_env();
    }

    #[test]
    #[serial]
    fn invalid_numeric_env_falls_back_to_default() {
        clear_config_env();
        env::set_var("PAGE_SIZE_MAX", "not-a-number");
        let config = Config::from_env().expect("config should build");
        assert_eq!(config.max_page_size, 100);
        clear_config_env();
    }
}
