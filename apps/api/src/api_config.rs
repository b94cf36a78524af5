use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tessera_core::{AppError, UserId};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: Option<String>,
    pub bootstrap_super_admin: Option<UserId>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parsed_env("DATABASE_MAX_CONNECTIONS", 10)?;
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parsed_env("API_PORT", 3001)?;
        let frontend_url = optional_env("FRONTEND_URL");

        let bootstrap_super_admin = optional_env("BOOTSTRAP_SUPER_ADMIN_USER_ID")
            .map(|value| {
                uuid::Uuid::parse_str(value.trim())
                    .map(UserId::from_uuid)
                    .map_err(|error| {
                        AppError::Validation(format!(
                            "invalid BOOTSTRAP_SUPER_ADMIN_USER_ID: {error}"
                        ))
                    })
            })
            .transpose()?;

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            api_host,
            api_port,
            frontend_url,
            bootstrap_super_admin,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => parse_setting(name, value.as_str()),
        None => Ok(default),
    }
}

fn parse_setting<T>(name: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))
}
