use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub mod env_allowlist {
    include!(concat!(env!("OUT_DIR"), "/meca_env_allowlist.rs"));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_retries: 20,
            retry_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub site_url: String,
    pub site_check_enabled: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            site_url: "https://mec.mo.gov/MEC/Campaign_Finance/CFSearch.aspx".to_string(),
            site_check_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub extractor_timeout_secs: u64,
    pub min_valid_size_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            extractor_timeout_secs: 30,
            min_valid_size_bytes: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    pub reconcile: ReconcileConfig,
    pub acquisition: AcquisitionConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAuditConfig {
    reconcile: Option<ReconcileConfig>,
    acquisition: Option<AcquisitionConfig>,
    validation: Option<ValidationConfig>,
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &AuditConfig) -> Result<()> {
    if cfg.reconcile.max_retries == 0 {
        return Err(anyhow!("invalid max retries: must be >= 1"));
    }
    if cfg.acquisition.site_url.trim().is_empty() {
        return Err(anyhow!("invalid site url: cannot be empty"));
    }
    if cfg.validation.extractor_timeout_secs == 0 {
        return Err(anyhow!("invalid extractor timeout: must be >= 1 second"));
    }
    if cfg.validation.min_valid_size_bytes == 0 {
        return Err(anyhow!("invalid min valid size: must be >= 1 byte"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("MECA_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".mecaudit").join("config.toml"))
}

fn apply_partial(base: &mut AuditConfig, parsed: PartialAuditConfig) {
    if let Some(reconcile) = parsed.reconcile {
        base.reconcile = reconcile;
    }
    if let Some(acquisition) = parsed.acquisition {
        base.acquisition = acquisition;
    }
    if let Some(validation) = parsed.validation {
        base.validation = validation;
    }
}

fn merge_file_config(base: &mut AuditConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialAuditConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    apply_partial(base, parsed);
    Ok(())
}

pub fn load_config() -> Result<AuditConfig> {
    let mut cfg = AuditConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.reconcile.max_retries = env_or_u32("MECA_MAX_RETRIES", cfg.reconcile.max_retries);
    cfg.reconcile.retry_delay_secs =
        env_or_u64("MECA_RETRY_DELAY_SECS", cfg.reconcile.retry_delay_secs);
    cfg.acquisition.site_url = env_or_string("MECA_SITE_URL", &cfg.acquisition.site_url);
    cfg.acquisition.site_check_enabled = env_or_bool(
        "MECA_SITE_CHECK_ENABLED",
        cfg.acquisition.site_check_enabled,
    );
    cfg.validation.extractor_timeout_secs = env_or_u64(
        "MECA_EXTRACTOR_TIMEOUT_SECS",
        cfg.validation.extractor_timeout_secs,
    );
    cfg.validation.min_valid_size_bytes = env_or_u64(
        "MECA_MIN_VALID_SIZE_BYTES",
        cfg.validation.min_valid_size_bytes,
    );

    validate(&cfg)?;
    Ok(cfg)
}
