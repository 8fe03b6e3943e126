use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use sest_core::ParsePolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Admin routes answer 403 while this is unset.
    pub admin_token: Option<String>,
    pub parse_policy: ParsePolicy,
    pub notify_from: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("SEST_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("SEST_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("SEST_PORT must be a port number")?;
        let db_path: PathBuf = lookup("SEST_DB_PATH")
            .unwrap_or_else(|| "sest.db".into())
            .into();
        let admin_token = lookup("SEST_ADMIN_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let parse_policy = match lookup("SEST_PARSE_POLICY") {
            Some(v) => v.parse().context("invalid SEST_PARSE_POLICY")?,
            None => ParsePolicy::default(),
        };
        let notify_from = lookup("SEST_NOTIFY_FROM").unwrap_or_else(|| "sest@localhost".into());

        Ok(Self {
            host,
            port,
            db_path,
            admin_token,
            parse_policy,
            notify_from,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
