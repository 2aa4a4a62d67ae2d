//! System configuration (spec §6.2): what journals exist, where they live, and
//! which strategies the compute engine hosts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::location::Mode;

/// One broker account a MD or TD engine owns a stream for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub institution: String,
    pub account: String,
}

/// A strategy the CP engine loads (spec §9: dynamic-load re-architected as a
/// named-factory registry; this just records which one to instantiate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub mode: Mode,
    pub output_root_path: PathBuf,
    /// Path the bootstrap supervisor writes the `FDS`-equivalent descriptor
    /// list to when inheritance isn't available (spec §6.2 SCM_RIGHTS fallback).
    #[serde(default)]
    pub fds_fallback_path: Option<PathBuf>,
}

/// Top-level configuration, loaded once by the bootstrap supervisor and by
/// each engine's own `--cfg` (spec §6.2, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub md: Vec<AccountConfig>,
    #[serde(default)]
    pub td: Vec<AccountConfig>,
    #[serde(default)]
    pub strategy: Vec<StrategyConfig>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse { message: e.to_string() })
    }

    /// Convenience constructor for local development, mirroring the teacher's
    /// `Config::from_env` (SPEC_FULL §5.3): reads `JTRADE_CFG` for the config
    /// path, falling back to `./jtrade.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("JTRADE_CFG").unwrap_or_else(|_| "jtrade.json".to_string());
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.md.is_empty() && self.td.is_empty() {
            return Err(ConfigError::MissingField { field: "md or td" });
        }
        Ok(())
    }
}

/// Every `"<location_uid>_<dest_id>"` wakeup key this config's engines will
/// need to look up at startup (spec §6.2): one per MD account's own stream,
/// the shared TD_RESPONSE stream, CP's MD-request stream, and one per TD
/// account's order stream — published under TD's own location so that
/// `order_id >> 32 xor td_location_uid` recovers the account (spec §3.1, §8).
pub fn wakeup_keys(cfg: &Config) -> Vec<String> {
    use crate::engine::{cp_location, md_location, td_location};
    use crate::ids::{hash_account_dest, hash_role_tag, RoleTag};

    let md_location = md_location(cfg.system.mode);
    let td_location = td_location(cfg.system.mode);
    let cp_location = cp_location(cfg.system.mode);

    let mut keys = Vec::new();
    for acct in &cfg.md {
        let dest = hash_account_dest(&acct.institution, &acct.account);
        keys.push(format!("{}_{dest}", md_location.uid));
    }
    keys.push(format!("{}_{}", td_location.uid, hash_role_tag(RoleTag::TdResponse)));
    keys.push(format!("{}_{}", cp_location.uid, hash_role_tag(RoleTag::MdReq)));
    for acct in &cfg.td {
        let dest = hash_account_dest(&acct.institution, &acct.account);
        keys.push(format!("{}_{dest}", td_location.uid));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{
                "system": {"mode": "BACKTEST", "output_root_path": "/tmp/jtrade"},
                "md": [{"institution": "CME", "account": "paper"}],
                "td": [{"institution": "CME", "account": "paper"}]
            }"#,
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.md.len(), 1);
        assert_eq!(cfg.md[0].institution, "CME");
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_malformed_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
