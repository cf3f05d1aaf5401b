use std::{env, path::PathBuf};

use crate::cart::CheckoutPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub storage_root: PathBuf,
    pub storage_public_url: String,
    pub session_path: PathBuf,
    pub checkout_policy: CheckoutPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let storage_root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".to_string());
        let storage_public_url = env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}/storage"));
        let session_path = env::var("SESSION_PATH")
            .unwrap_or_else(|_| "./.storefront/session.json".to_string());
        let checkout_policy = checkout_policy(env::var("CHECKOUT_COMPENSATE").ok().as_deref());

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            storage_root: storage_root.into(),
            storage_public_url,
            session_path: session_path.into(),
            checkout_policy,
        })
    }
}

/// `true`/`1`/`yes` turn on deleting orphaned orders; anything else keeps them.
pub fn checkout_policy(flag: Option<&str>) -> CheckoutPolicy {
    match flag.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes") => CheckoutPolicy::DeleteOrphan,
        _ => CheckoutPolicy::KeepOrphan,
    }
}
