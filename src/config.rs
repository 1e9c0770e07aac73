//! Process configuration, loaded once from the environment (and `.env`).
//!
//! Values operators may tune at runtime (exchange rate, admin WhatsApp number)
//! are resolved per call with precedence: explicit override, then the stored
//! setting, then the built-in default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::store::SettingStore;

pub const SETTING_EXCHANGE_RATE: &str = "usd_idr_rate";
pub const SETTING_ADMIN_WHATSAPP: &str = "admin_whatsapp";

pub const DEFAULT_EXCHANGE_RATE: f64 = 16_000.0;
pub const DEFAULT_ADMIN_WHATSAPP: &str = "6281234567890";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt_secret: Vec<u8>,
    pub webhook_secret: Vec<u8>,
    pub app_base_url: String,
    pub currency: String,

    pub payment_gateway_url: String,
    pub payment_gateway_api_key: String,

    pub mail_api_url: Option<String>,
    pub mail_api_key: String,
    pub mail_from: String,
    pub admin_email: String,

    /// Seeded on startup when both are present.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Zero disables the background sweeper.
    pub sweep_interval: Duration,

    pub exchange_rate_override: Option<f64>,
    pub admin_whatsapp_override: Option<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> Result<String> {
    optional(name)
        .ok_or_else(|| AppError::Config(format!("missing environment variable '{}'", name)))
}

fn parsed<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    optional(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| AppError::Config(format!("invalid {}: {}", name, e)))
        })
        .transpose()
}

impl AppConfig {
    /// Reads the process environment. `.env` is loaded by the binary before this runs.
    pub fn from_env() -> Result<Self> {
        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let app_base_url =
            optional("APP_BASE_URL").unwrap_or_else(|| format!("http://{}", bind_addr));
        let sweep_secs =
            parsed::<u64>("SWEEP_INTERVAL_SECS")?.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

        let config = Self {
            database_url: optional("DATABASE_URL"),
            jwt_secret: required("JWT_SECRET")?.into_bytes(),
            webhook_secret: required("WEBHOOK_SECRET")?.into_bytes(),
            currency: optional("CURRENCY").unwrap_or_else(|| "IDR".to_string()),
            payment_gateway_url: optional("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|| "http://127.0.0.1:9000".to_string()),
            payment_gateway_api_key: optional("PAYMENT_GATEWAY_API_KEY").unwrap_or_default(),
            mail_api_url: optional("MAIL_API_URL"),
            mail_api_key: optional("MAIL_API_KEY").unwrap_or_default(),
            mail_from: optional("MAIL_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
            admin_email: optional("ADMIN_EMAIL").unwrap_or_else(|| "admin@localhost".to_string()),
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            sweep_interval: Duration::from_secs(sweep_secs),
            exchange_rate_override: parsed::<f64>("EXCHANGE_RATE_OVERRIDE")?,
            admin_whatsapp_override: optional("ADMIN_WHATSAPP_OVERRIDE"),
            bind_addr,
            app_base_url,
        };
        tracing::info!(
            bind_addr = %config.bind_addr,
            database = config.database_url.is_some(),
            mailer = config.mail_api_url.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Config with fixed secrets and no external services, for tests and local runs.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            jwt_secret: b"test-jwt-secret".to_vec(),
            webhook_secret: b"test-webhook-secret".to_vec(),
            app_base_url: "http://localhost".to_string(),
            currency: "IDR".to_string(),
            payment_gateway_url: "http://127.0.0.1:9".to_string(),
            payment_gateway_api_key: String::new(),
            mail_api_url: None,
            mail_api_key: String::new(),
            mail_from: "noreply@localhost".to_string(),
            admin_email: "admin@localhost".to_string(),
            admin_username: None,
            admin_password: None,
            sweep_interval: Duration::ZERO,
            exchange_rate_override: None,
            admin_whatsapp_override: None,
        }
    }

    /// USD to IDR rate used at checkout.
    pub async fn exchange_rate<S: SettingStore + ?Sized>(&self, settings: &S) -> Result<f64> {
        let stored = settings.get_setting(SETTING_EXCHANGE_RATE).await?;
        Ok(resolve(
            self.exchange_rate_override,
            stored.as_deref(),
            DEFAULT_EXCHANGE_RATE,
        ))
    }

    /// Number the admin WhatsApp links point at.
    pub async fn admin_whatsapp<S: SettingStore + ?Sized>(&self, settings: &S) -> Result<String> {
        let stored = settings.get_setting(SETTING_ADMIN_WHATSAPP).await?;
        Ok(resolve(
            self.admin_whatsapp_override.clone(),
            stored.as_deref(),
            DEFAULT_ADMIN_WHATSAPP.to_string(),
        ))
    }
}

/// Override, else a stored value that parses, else the default.
pub fn resolve<T: FromStr>(explicit: Option<T>, stored: Option<&str>, default: T) -> T {
    if let Some(value) = explicit {
        return value;
    }
    match stored.map(|s| s.trim().parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            tracing::warn!(raw = ?stored, "ignoring unparseable stored setting");
            default
        }
        None => default,
    }
}
