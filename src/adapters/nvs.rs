//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the agent configuration.  The config is
//! stored as a single JSON blob so fields can be added without a
//! migration; unknown or missing fields fail deserialisation and the
//! caller falls back to defaults.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::nvs::EspNvs` on the default
//!   partition, namespace `otaagent`.
//! - **all other targets**: in-memory map (dev/test only).

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::AgentConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

const CONFIG_NAMESPACE: &str = "otaagent";
const CONFIG_KEY: &str = "agentcfg";

/// Largest blob accepted on load.
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<&'static str, Vec<u8>>>,
}

impl NvsAdapter {
    /// Open the config namespace on the default NVS partition.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
        let nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true).map_err(|e| {
            warn!("NvsAdapter: cannot open namespace '{}': {:?}", CONFIG_NAMESPACE, e);
            ConfigError::IoError
        })?;
        info!("NvsAdapter: ESP-IDF NVS namespace '{}' open", CONFIG_NAMESPACE);
        Ok(Self { nvs })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, ConfigError> {
        info!("NvsAdapter: simulation backend");
        Ok(Self {
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Load the stored config, or defaults if none is usable.
    pub fn load_or_default(&self) -> AgentConfig {
        match self.load() {
            Ok(cfg) => cfg,
            Err(ConfigError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                AgentConfig::default()
            }
            Err(e) => {
                warn!("NvsAdapter: {}, using defaults", e);
                AgentConfig::default()
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Vec<u8>, ConfigError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        match self.nvs.get_blob(CONFIG_KEY, &mut buf) {
            Ok(Some(data)) => Ok(data.to_vec()),
            Ok(None) => Err(ConfigError::NotFound),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {:?}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Vec<u8>, ConfigError> {
        let store = self.store.borrow();
        let data = store.get(CONFIG_KEY).ok_or(ConfigError::NotFound)?;
        if data.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::Corrupted);
        }
        Ok(data.clone())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.nvs.set_blob(CONFIG_KEY, bytes).map_err(|e| {
            warn!("NvsAdapter: NVS write error {:?}", e);
            ConfigError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.store.borrow_mut().insert(CONFIG_KEY, bytes.to_vec());
        Ok(())
    }

    /// Overwrite the raw blob.  Test hook for corruption handling.
    #[cfg(all(test, not(target_os = "espidf")))]
    fn put_raw(&self, bytes: &[u8]) {
        self.store.borrow_mut().insert(CONFIG_KEY, bytes.to_vec());
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<AgentConfig, ConfigError> {
        let bytes = self.read_blob()?;
        let cfg: AgentConfig = serde_json::from_slice(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate().map_err(ConfigError::ValidationFailed)?;
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &AgentConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let bytes = serde_json::to_vec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(&bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
