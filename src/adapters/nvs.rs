//! Preference storage on the default NVS partition.
//!
//! Implements [`StoragePort`] through `esp_idf_svc::nvs::EspNvs`.  Booleans
//! and strings are kept in the native NVS `u8` / `str` entry types, the
//! same layout the Arduino `Preferences` library produces, so a unit
//! flashed over older firmware keeps its stored remote selection.  Every
//! `set_*` on `EspNvs` commits before returning.
//!
//! Host builds keep entries in a `BTreeMap` keyed by `(namespace, key)`.

use crate::app::ports::{StorageError, StoragePort};
use log::info;

#[cfg(target_os = "espidf")]
use crate::app::ports::MAX_STORED_STR_LEN;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_ERR_NVS_INVALID_LENGTH, ESP_ERR_NVS_NOT_ENOUGH_SPACE, ESP_ERR_NVS_NOT_FOUND,
    ESP_ERR_NVS_TYPE_MISMATCH, EspError, esp_err_t,
};

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::BTreeMap;

/// NVS namespace and key names are at most 15 bytes.
pub const MAX_NVS_NAME_LEN: usize = 15;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    entries: RefCell<BTreeMap<(String, String), Vec<u8>>>,
}

impl NvsAdapter {
    /// Wrap the default partition.  The caller owns `take()`, so the same
    /// partition handle can also be lent to the WiFi driver.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        info!("NVS: default partition ready");
        Self { partition }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("NVS(sim): in-memory store");
        Self {
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    fn check_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() || name.len() > MAX_NVS_NAME_LEN {
            return Err(StorageError::InvalidData);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn open(&self, namespace: &str, read_write: bool) -> Result<EspNvs<NvsDefault>, StorageError> {
        Self::check_name(namespace)?;
        EspNvs::new(self.partition.clone(), namespace, read_write).map_err(Self::classify)
    }

    #[cfg(target_os = "espidf")]
    #[allow(clippy::unnecessary_cast)]
    fn classify(e: EspError) -> StorageError {
        let code = e.code();
        match code {
            c if c == ESP_ERR_NVS_NOT_FOUND as esp_err_t => StorageError::NotFound,
            c if c == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t => StorageError::Full,
            c if c == ESP_ERR_NVS_TYPE_MISMATCH as esp_err_t
                || c == ESP_ERR_NVS_INVALID_LENGTH as esp_err_t =>
            {
                StorageError::InvalidData
            }
            _ => {
                log::warn!("NVS: driver error {}", code);
                StorageError::IoError
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Device backend ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        Self::check_name(key)?;
        let nvs = self.open(namespace, false)?;
        match nvs.get_raw(key, buf).map_err(Self::classify)? {
            Some(data) => Ok(data.len()),
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        Self::check_name(key)?;
        let mut nvs = self.open(namespace, true)?;
        nvs.set_raw(key, data).map_err(Self::classify)?;
        Ok(())
    }

    fn read_bool(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        Self::check_name(key)?;
        let nvs = self.open(namespace, false)?;
        match nvs.get_u8(key).map_err(Self::classify)? {
            Some(v) => Ok(v != 0),
            None => Err(StorageError::NotFound),
        }
    }

    fn write_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        Self::check_name(key)?;
        let nvs = self.open(namespace, true)?;
        nvs.set_u8(key, u8::from(value)).map_err(Self::classify)
    }

    fn read_string(&self, namespace: &str, key: &str) -> Result<String, StorageError> {
        Self::check_name(key)?;
        let nvs = self.open(namespace, false)?;
        let mut buf = [0u8; MAX_STORED_STR_LEN + 1];
        match nvs.get_str(key, &mut buf).map_err(Self::classify)? {
            Some(s) => Ok(s.to_owned()),
            None => Err(StorageError::NotFound),
        }
    }

    fn write_string(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        Self::check_name(key)?;
        if value.len() > MAX_STORED_STR_LEN {
            return Err(StorageError::Full);
        }
        let mut nvs = self.open(namespace, true)?;
        nvs.set_str(key, value).map_err(Self::classify)
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        Self::check_name(namespace)?;
        Self::check_name(key)?;
        let entries = self.entries.borrow();
        let data = entries
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::InvalidData);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        Self::check_name(namespace)?;
        Self::check_name(key)?;
        self.entries
            .borrow_mut()
            .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        Ok(())
    }
}
