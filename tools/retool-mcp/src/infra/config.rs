use crate::infra::{
    client::ApiSettings,
    metrics::{MetricsServerConfig, TlsConfig},
};
use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_ENV: &str = "APP_CONFIG_DIR";
const CONFIG_PROFILE_ENV: &str = "APP_CONFIG_PROFILE";
const DEFAULT_CONFIG_DIR: &str = "config";
const DEFAULT_PROFILE: &str = "default";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub read_only: Option<bool>,
    pub metrics_addr: Option<String>,
    pub allow_insecure_metrics_dev: Option<bool>,
    #[serde(skip_serializing)]
    pub metrics_auth_token: Option<String>,
    pub metrics_tls_cert_path: Option<String>,
    pub metrics_tls_key_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let base_dir = env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));
        Self::load_from_dir(&base_dir)
    }

    /// `default.toml`, then `<APP_CONFIG_PROFILE>.toml`, then `local.toml`,
    /// then environment variables; later layers win.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut config = AppConfig::default();
        let mut overlays = Vec::new();

        if dir.exists() {
            let mut profiles = vec![DEFAULT_PROFILE.to_string()];
            if let Ok(active_profile) = env::var(CONFIG_PROFILE_ENV) {
                if !active_profile.trim().is_empty() && active_profile != DEFAULT_PROFILE {
                    profiles.push(active_profile);
                }
            }
            profiles.push("local".to_string());

            for profile in profiles {
                let candidate = dir.join(format!("{profile}.toml"));
                if let Some(overlay) = ConfigOverlay::from_file(&candidate)? {
                    overlays.push(overlay);
                }
            }
        }

        overlays.push(ConfigOverlay::from_env()?);

        for overlay in overlays {
            config.apply_overlay(overlay);
        }

        Ok(config)
    }

    pub fn read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let ConfigOverlay {
            base_url,
            api_token,
            request_timeout_ms,
            read_only,
            metrics_addr,
            allow_insecure_metrics_dev,
            metrics_auth_token,
            metrics_tls_cert_path,
            metrics_tls_key_path,
        } = overlay;
        overwrite(&mut self.base_url, base_url);
        overwrite(&mut self.api_token, api_token);
        overwrite(&mut self.request_timeout_ms, request_timeout_ms);
        overwrite(&mut self.read_only, read_only);
        overwrite(&mut self.metrics_addr, metrics_addr);
        overwrite(&mut self.allow_insecure_metrics_dev, allow_insecure_metrics_dev);
        overwrite(&mut self.metrics_auth_token, metrics_auth_token);
        overwrite(&mut self.metrics_tls_cert_path, metrics_tls_cert_path);
        overwrite(&mut self.metrics_tls_key_path, metrics_tls_key_path);
    }

    /// A missing base URL or token is tolerated here: the server still starts
    /// and remote tools report `NOT_CONFIGURED`. A malformed URL is an error.
    pub fn api_settings(&self) -> Result<ApiSettings> {
        let base_url = self
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw.trim()).with_context(|| format!("parse RETOOL_BASE_URL '{raw}'"))
            })
            .transpose()?;
        if let Some(url) = &base_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow!(
                    "RETOOL_BASE_URL must use http or https, got '{}'",
                    url.scheme()
                ));
            }
        }
        if self.request_timeout_ms == Some(0) {
            return Err(anyhow!("RETOOL_TIMEOUT_MS must be greater than zero"));
        }
        Ok(ApiSettings {
            base_url,
            api_token: self.api_token.clone(),
            timeout: self.request_timeout(),
        })
    }

    pub fn metrics_server_config(&self) -> Result<Option<MetricsServerConfig>> {
        let addr = match self.metrics_addr.as_ref() {
            Some(addr) => addr
                .parse::<SocketAddr>()
                .with_context(|| format!("parse METRICS_ADDR '{}'", addr))?,
            None => return Ok(None),
        };

        let allow_insecure = self.allow_insecure_metrics_dev.unwrap_or(false);
        let tls = match (
            self.metrics_tls_cert_path.as_ref(),
            self.metrics_tls_key_path.as_ref(),
        ) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "metrics TLS requires both METRICS_TLS_CERT_PATH and METRICS_TLS_KEY_PATH"
                ));
            }
        };

        Ok(Some(MetricsServerConfig {
            addr,
            auth_token: self.metrics_auth_token.clone(),
            allow_insecure,
            tls,
        }))
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    base_url: Option<String>,
    api_token: Option<String>,
    request_timeout_ms: Option<u64>,
    read_only: Option<bool>,
    metrics_addr: Option<String>,
    allow_insecure_metrics_dev: Option<bool>,
    metrics_auth_token: Option<String>,
    metrics_tls_cert_path: Option<String>,
    metrics_tls_key_path: Option<String>,
}

impl ConfigOverlay {
    fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let overlay: Self = toml::from_str(&contents)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(Some(overlay))
    }

    /// Malformed values are errors; a typo must not silently turn a safety flag off.
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env_string("RETOOL_BASE_URL"),
            api_token: env_string("RETOOL_API_TOKEN"),
            request_timeout_ms: env_millis("RETOOL_TIMEOUT_MS")?,
            read_only: env_flag("RETOOL_READ_ONLY")?,
            metrics_addr: env_string("METRICS_ADDR"),
            allow_insecure_metrics_dev: env_flag("ALLOW_INSECURE_METRICS_DEV")?,
            metrics_auth_token: env_string("METRICS_AUTH_TOKEN"),
            metrics_tls_cert_path: env_string("METRICS_TLS_CERT_PATH"),
            metrics_tls_key_path: env_string("METRICS_TLS_KEY_PATH"),
        })
    }
}

/// Unset and blank variables are both "not provided".
fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_millis(key: &str) -> Result<Option<u64>> {
    env_string(key)
        .map(|v| {
            v.parse()
                .map_err(|_| anyhow!("{key} must be a whole number of milliseconds, got '{v}'"))
        })
        .transpose()
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    env_string(key)
        .map(|v| parse_flag(&v).ok_or_else(|| anyhow!("{key} must be a boolean, got '{v}'")))
        .transpose()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
