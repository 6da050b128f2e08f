//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for Plant Nanny.
//!
//! - Schedule values are plain `u32` entries in the `plantnanny`
//!   namespace (`nvs_get_u32` / `nvs_set_u32`).
//! - The device configuration is one postcard blob under `syscfg`.
//! - Every operation opens the namespace, works, commits and closes. No
//!   handle outlives a call, since deep sleep may follow any of them.
//! - Config validation: all fields are range-checked before persistence.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::SystemConfig;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const NAMESPACE: &str = "plantnanny";
const CONFIG_KEY: &str = "syscfg";

/// NVS keys and namespaces are limited to 15 bytes plus the terminator.
const MAX_KEY_LEN: usize = 15;

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

// ESP-IDF error codes as `esp_err_t` (bindgen exports some as u32).
#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;
#[cfg(target_os = "espidf")]
const NO_SPACE: esp_err_t = ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t;
#[cfg(target_os = "espidf")]
const BAD_NAME: esp_err_t = ESP_ERR_NVS_INVALID_NAME as esp_err_t;
#[cfg(target_os = "espidf")]
const BAD_LENGTH: esp_err_t = ESP_ERR_NVS_INVALID_LENGTH as esp_err_t;

/// NUL-terminated copy of `key`, or `KeyTooLong`.
fn c_key(key: &str) -> Result<[u8; MAX_KEY_LEN + 1], StorageError> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_KEY_LEN || bytes.contains(&0) {
        return Err(StorageError::KeyTooLong);
    }
    let mut buf = [0u8; MAX_KEY_LEN + 1];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
enum SimValue {
    U32(u32),
    Blob(Vec<u8>),
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, SimValue>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open the namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, esp_err_t>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    {
        let ns = c_key(NAMESPACE).map_err(|_| BAD_NAME)?;

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used afterwards.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn map_err(code: esp_err_t) -> StorageError {
        match code {
            NOT_FOUND => StorageError::NotFound,
            NO_SPACE => StorageError::Full,
            BAD_NAME => StorageError::KeyTooLong,
            _ => StorageError::IoError,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Config validation
// ───────────────────────────────────────────────────────────────

fn is_topic_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains(['/', '+', '#']) && s.is_ascii()
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !is_topic_segment(&cfg.topic_root) {
        return Err(ConfigError::ValidationFailed(
            "topic_root must be a non-empty topic segment",
        ));
    }
    if !is_topic_segment(&cfg.device_id) {
        return Err(ConfigError::ValidationFailed(
            "device_id must be a non-empty topic segment",
        ));
    }
    if cfg.boundary_tolerance_secs > 59 {
        return Err(ConfigError::ValidationFailed(
            "boundary_tolerance_secs must be 0–59",
        ));
    }
    if cfg.timer_drift_compensation_secs > 600 {
        return Err(ConfigError::ValidationFailed(
            "timer_drift_compensation_secs must be 0–600",
        ));
    }
    if !(60..=86_400).contains(&cfg.blind_sleep_secs) {
        return Err(ConfigError::ValidationFailed(
            "blind_sleep_secs must be 60–86400",
        ));
    }
    if !(1..=600).contains(&cfg.inactivity_threshold_secs) {
        return Err(ConfigError::ValidationFailed(
            "inactivity_threshold_secs must be 1–600",
        ));
    }
    if cfg.pump_settle_ms > 10_000 {
        return Err(ConfigError::ValidationFailed(
            "pump_settle_ms must be 0–10000",
        ));
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// ConfigPort
// ───────────────────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(SimValue::Blob(bytes)) = self.store.borrow().get(CONFIG_KEY) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_key(CONFIG_KEY).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
                };
                if ret != OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(BAD_LENGTH);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(NOT_FOUND) => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(CONFIG_KEY.to_owned(), SimValue::Blob(bytes));
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = c_key(CONFIG_KEY).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(NO_SPACE) => Err(ConfigError::StorageFull),
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// StoragePort
// ───────────────────────────────────────────────────────────────

impl StoragePort for NvsAdapter {
    fn read_u32(&self, key: &str) -> Result<u32, StorageError> {
        let key = c_key(key)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let name = sim_name(&key);
            match self.store.borrow().get(name) {
                Some(SimValue::U32(v)) => Ok(*v),
                Some(SimValue::Blob(_)) => Err(StorageError::IoError),
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            Self::with_nvs_handle(false, |handle| {
                let mut value: u32 = 0;
                // SAFETY: key is NUL-terminated; value outlives the call.
                let ret = unsafe { nvs_get_u32(handle, key.as_ptr() as *const _, &mut value) };
                if ret != OK {
                    return Err(ret);
                }
                Ok(value)
            })
            .map_err(Self::map_err)
        }
    }

    fn write_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.write_batch(&[(key, value)])
    }

    fn write_batch(&mut self, entries: &[(&str, u32)]) -> Result<(), StorageError> {
        let mut keys: heapless::Vec<[u8; MAX_KEY_LEN + 1], 16> = heapless::Vec::new();
        for (key, _) in entries {
            keys.push(c_key(key)?).map_err(|_| StorageError::Full)?;
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let mut store = self.store.borrow_mut();
            for (key, (_, value)) in keys.iter().zip(entries) {
                store.insert(sim_name(key).to_owned(), SimValue::U32(*value));
            }
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::with_nvs_handle(true, |handle| {
                for (key, (_, value)) in keys.iter().zip(entries) {
                    // SAFETY: key is NUL-terminated and valid for the call.
                    let ret = unsafe { nvs_set_u32(handle, key.as_ptr() as *const _, *value) };
                    if ret != OK {
                        return Err(ret);
                    }
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != OK {
                    return Err(ret);
                }
                Ok(())
            })
            .map_err(Self::map_err)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn sim_name(key: &[u8; MAX_KEY_LEN + 1]) -> &str {
    let end = key.iter().position(|&b| b == 0).unwrap_or(key.len());
    core::str::from_utf8(&key[..end]).unwrap_or_default()
}

impl Default for NvsAdapter {
    fn default() -> Self {
        // Falls back to an unbacked adapter; every read then reports NotFound.
        Self::new().unwrap_or(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }
}
