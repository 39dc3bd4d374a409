//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errores al leer la configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Backend de almacenamiento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Reglas de negocio de tickets que antes vivían como literales en el frontend
#[derive(Debug, Clone)]
pub struct TicketPolicy {
    /// Extensión aplicada cuando la petición no indica duración
    pub default_extend: chrono::Duration,
    /// Extensión máxima aceptada en una sola petición
    pub max_extend: chrono::Duration,
    /// Duración de un ticket renovado
    pub default_renew: chrono::Duration,
    /// Precio usado cuando el servicio referenciado no existe
    pub missing_service_price: Decimal,
    /// Ventana para considerar un ticket activo como "por expirar"
    pub expiring_soon_window: chrono::Duration,
}

impl Default for TicketPolicy {
    fn default() -> Self {
        Self {
            default_extend: chrono::Duration::hours(2),
            max_extend: chrono::Duration::days(30),
            default_renew: chrono::Duration::hours(8),
            missing_service_price: Decimal::ZERO,
            expiring_soon_window: chrono::Duration::hours(2),
        }
    }
}

impl TicketPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            default_extend: optional_minutes("TICKET_EXTEND_MINUTES")?
                .unwrap_or(defaults.default_extend),
            max_extend: optional_minutes("TICKET_MAX_EXTEND_MINUTES")?
                .unwrap_or(defaults.max_extend),
            default_renew: optional_minutes("TICKET_RENEW_MINUTES")?
                .unwrap_or(defaults.default_renew),
            missing_service_price: optional_parse::<Decimal>("TICKET_MISSING_SERVICE_PRICE")?
                .unwrap_or(defaults.missing_service_price),
            expiring_soon_window: optional_minutes("TICKET_EXPIRING_SOON_MINUTES")?
                .unwrap_or(defaults.expiring_soon_window),
        })
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub log_level: tracing::Level,
    pub request_timeout: Duration,
    pub ticket_policy: TicketPolicy,
}

impl EnvironmentConfig {
    /// Cargar la configuración desde variables de entorno
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = optional_parse_with("STORAGE_BACKEND", |v| v.parse().ok())?
            .unwrap_or(StorageBackend::Postgres);

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let request_timeout_secs: u64 = optional_parse("REQUEST_TIMEOUT_SECS")?.unwrap_or(10);
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: optional_parse("PORT")?.unwrap_or(5001),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            database_url,
            storage_backend,
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_level: optional_parse::<tracing::Level>("LOG_LEVEL")?
                .unwrap_or(tracing::Level::INFO),
            request_timeout: Duration::from_secs(request_timeout_secs),
            ticket_policy: TicketPolicy::from_env()?,
        })
    }

    /// Configuración mínima para tests y almacenamiento en memoria
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            database_url: None,
            storage_backend: StorageBackend::Memory,
            jwt_secret: jwt_secret.into(),
            cors_origins: Vec::new(),
            log_level: tracing::Level::DEBUG,
            request_timeout: Duration::from_secs(10),
            ticket_policy: TicketPolicy::default(),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    optional_parse_with(name, |v| v.trim().parse().ok())
}

fn optional_parse_with<T>(
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse(&value)
            .map(Some)
            .ok_or(ConfigError::Invalid { name, value }),
        _ => Ok(None),
    }
}

fn optional_minutes(name: &'static str) -> Result<Option<chrono::Duration>, ConfigError> {
    match optional_parse::<i64>(name)? {
        Some(minutes) if minutes > 0 => chrono::Duration::try_minutes(minutes)
            .map(Some)
            .ok_or(ConfigError::Invalid {
                name,
                value: minutes.to_string(),
            }),
        Some(minutes) => Err(ConfigError::Invalid {
            name,
            value: minutes.to_string(),
        }),
        None => Ok(None),
    }
}
