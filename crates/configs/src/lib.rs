use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Connection parameters for the wide-column store, including the fixed
/// client-side resilience tuning (fail fast rather than hang).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Coordination-service quorum the client connects through.
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_client_port")]
    pub client_port: u16,
    /// Prepended to unqualified table names on creation.
    #[serde(default)]
    pub default_namespace: Option<String>,
    /// Login identity presented during the session handshake.
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_recoverable_wait_ms")]
    pub recoverable_wait_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            client_port: default_client_port(),
            default_namespace: None,
            principal: None,
            max_retries: default_max_retries(),
            retry_pause_ms: default_retry_pause_ms(),
            session_timeout_ms: default_session_timeout_ms(),
            recoverable_wait_ms: default_recoverable_wait_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Row cap for a single head/tail scan.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { page_size: default_page_size() }
    }
}

fn default_client_port() -> u16 { 2181 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_pause_ms() -> u64 { 1000 }
fn default_session_timeout_ms() -> u64 { 10_000 }
fn default_recoverable_wait_ms() -> u64 { 10_000 }
fn default_page_size() -> u32 { 10 }

pub fn load_default() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.store.normalize_from_env();
        self.store.validate()?;
        self.scan.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    /// Fill endpoints/namespace from the environment when the TOML file
    /// left them unset.
    pub fn normalize_from_env(&mut self) {
        if self.endpoints.is_empty() {
            if let Ok(quorum) = std::env::var("STORE_ENDPOINTS") {
                self.endpoints = quorum
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }
        if self.default_namespace.is_none() {
            if let Ok(ns) = std::env::var("STORE_NAMESPACE") {
                if !ns.trim().is_empty() {
                    self.default_namespace = Some(ns);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(anyhow!(
                "store.endpoints is empty; provide it in config.toml or via STORE_ENDPOINTS"
            ));
        }
        if self.client_port == 0 {
            return Err(anyhow!("store.client_port must be in 1..=65535"));
        }
        if self.session_timeout_ms == 0 || self.recoverable_wait_ms == 0 {
            return Err(anyhow!("store timeouts must be positive milliseconds"));
        }
        Ok(())
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(anyhow!("scan.page_size must be >= 1"));
        }
        Ok(())
    }
}
