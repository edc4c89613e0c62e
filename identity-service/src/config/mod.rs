use platform_core::config as core_config;
use platform_core::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub lockout: LockoutConfig,
    pub oauth: OAuthSettings,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_minutes: i64,
    pub extended_access_ttl_minutes: i64,
    pub extended_refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthSettings {
    /// Public base URL of this service, used to build provider redirect URIs.
    pub api_url: String,
    /// Lifetime of the CSRF state cookie set on the authorize redirect.
    pub state_ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", Some("dev-only-insecure-secret-change-me"), is_prod)?,
                access_token_ttl_minutes: parse_i64(get_env(
                    "JWT_ACCESS_TOKEN_TTL_MINUTES",
                    Some("30"),
                    is_prod,
                )?)?,
                refresh_token_ttl_minutes: parse_i64(get_env(
                    "JWT_REFRESH_TOKEN_TTL_MINUTES",
                    Some("10080"),
                    is_prod,
                )?)?,
                extended_access_ttl_minutes: parse_i64(get_env(
                    "JWT_EXTENDED_ACCESS_TTL_MINUTES",
                    Some("1440"),
                    is_prod,
                )?)?,
                extended_refresh_ttl_minutes: parse_i64(get_env(
                    "JWT_EXTENDED_REFRESH_TTL_MINUTES",
                    Some("43200"),
                    is_prod,
                )?)?,
            },
            lockout: LockoutConfig {
                max_attempts: get_env("MAX_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                duration_minutes: get_env("LOGIN_LOCKOUT_DURATION_MINUTES", Some("15"), is_prod)?
                    .parse()
                    .unwrap_or(15),
            },
            oauth: OAuthSettings {
                api_url: get_env("API_URL", Some("http://localhost:8080"), is_prod)?,
                state_ttl_seconds: get_env("OAUTH_STATE_TTL_SECONDS", Some("600"), is_prod)?
                    .parse()
                    .unwrap_or(600),
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
                global_ip_limit: get_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?
                    .parse()
                    .unwrap_or(100),
                global_ip_window_seconds: get_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.access_token_ttl_minutes <= 0 || self.jwt.refresh_token_ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Token TTLs must be positive"
            )));
        }

        if self.jwt.access_token_ttl_minutes >= self.jwt.refresh_token_ttl_minutes {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Access token TTL must be shorter than refresh token TTL"
            )));
        }

        if self.jwt.extended_access_ttl_minutes >= self.jwt.extended_refresh_ttl_minutes {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Extended access token TTL must be shorter than extended refresh token TTL"
            )));
        }

        if self.lockout.max_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_LOGIN_ATTEMPTS must be greater than 0"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 bytes in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn parse_i64(value: String) -> Result<i64, AppError> {
    value
        .parse()
        .map_err(|e: std::num::ParseIntError| AppError::ConfigError(anyhow::anyhow!(e.to_string())))
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
