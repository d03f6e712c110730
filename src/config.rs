//! Configuração do captura carregada a partir de `captura.toml`.
//!
//! A struct [`CapturaConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `CAPTURA_LOCK_URL` e `CAPTURA_ENABLE_LOCK` têm
//! precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuração de nível superior carregada de `captura.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturaConfig {
    /// Usa o lock distribuído por processo antes de chamar o worker.
    #[serde(default = "default_enable_lock")]
    pub enable_distributed_lock: bool,

    /// Tempo de vida do lock, em segundos. Também é o timeout de recuperação após crash.
    #[serde(default = "default_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,

    /// Acima desta média por processo um aviso de performance é registrado.
    #[serde(default = "default_performance_threshold_ms")]
    pub performance_threshold_ms: u64,

    /// URL base do serviço de lock. Sem ela, o lock em memória é usado.
    #[serde(default)]
    pub lock_service_url: Option<String>,

    /// Arquivo JSON-lines para os registros de auditoria da CLI.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Saída em JSON em vez de texto.
    #[serde(default)]
    pub json: bool,
}

// Lock habilitado por padrão.
fn default_enable_lock() -> bool {
    true
}

// TTL padrão do lock: 5 minutos.
fn default_lock_ttl_seconds() -> u64 {
    300
}

// Limite padrão de performance: 10s por processo.
fn default_performance_threshold_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for CapturaConfig {
    fn default() -> Self {
        Self {
            enable_distributed_lock: default_enable_lock(),
            lock_ttl_seconds: default_lock_ttl_seconds(),
            performance_threshold_ms: default_performance_threshold_ms(),
            lock_service_url: None,
            audit_log_path: None,
            log: LogConfig::default(),
        }
    }
}

impl CapturaConfig {
    /// Carrega a configuração de `captura.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("captura.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<CapturaConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
    fn apply_env_overrides(&mut self) {
        if let Some(url) = std::env::var("CAPTURA_LOCK_URL")
            .ok()
            .filter(|url| !url.is_empty())
        {
            self.lock_service_url = Some(url);
        }
        if let Some(enabled) = std::env::var("CAPTURA_ENABLE_LOCK")
            .ok()
            .as_deref()
            .and_then(parse_flag)
        {
            self.enable_distributed_lock = enabled;
        }
    }

    /// TTL do lock; zero vira um segundo, senão o lock expiraria ao ser criado.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds.max(1))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
