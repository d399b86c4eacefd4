//! Configuration

use once_cell::sync::Lazy;
use std::env;

use crate::core::report::DEFAULT_PAGE_SIZE;

/// Which metadata store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub web_addr: String,
    pub cors: String,
    pub admin_token: String,
    /// Honor `X-Forwarded-For` / `X-Real-IP` from a reverse proxy
    pub trust_proxy: bool,
    pub store: StoreKind,
    pub db_file: String,
    pub page_size: usize,
    /// Extra public content types as (slug, label)
    pub extra_types: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            web_addr: env::var("WEB_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            cors: env::var("WEB_CORS").unwrap_or_else(|_| "*".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_default(),
            trust_proxy: matches!(
                env::var("AVC_TRUST_PROXY").as_deref(),
                Ok("1") | Ok("true") | Ok("yes")
            ),
            store: match env::var("AVC_STORE").as_deref() {
                Ok("memory") => StoreKind::Memory,
                _ => StoreKind::Sqlite,
            },
            db_file: env::var("AVC_DB_FILE").unwrap_or_else(|_| "avc.db".to_string()),
            page_size: env::var("AVC_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            extra_types: env::var("AVC_EXTRA_TYPES")
                .map(|v| parse_extra_types(&v))
                .unwrap_or_default(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Parse `slug:Label,slug2:Label 2`; a missing label reuses the slug
fn parse_extra_types(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((slug, label)) => (slug.trim().to_string(), label.trim().to_string()),
            None => (entry.to_string(), entry.to_string()),
        })
        .collect()
}
