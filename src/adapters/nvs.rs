//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`PersistentStore`] as a small EEPROM-style byte array.
//!
//! On ESP-IDF the array is mirrored in RAM and persisted as a single NVS
//! blob; `commit()` writes the blob and calls `nvs_commit()`.  NVS itself
//! gives no ordering guarantee between the slots inside the blob, which is
//! why the settings layer above keeps its own shadow copies.
//!
//! The simulation backend keeps a staged and a durable image so tests can
//! observe exactly what survives a reboot, and can inject commit failures.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{PersistentStore, StorageError};

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

/// Size of the emulated EEPROM.
pub const EEPROM_SIZE: usize = 256;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"clocksync\0";
#[cfg(target_os = "espidf")]
const BLOB_KEY: &[u8] = b"eeprom\0";

pub struct EepromStore {
    /// Staged image; reads and writes go here.
    image: [u8; EEPROM_SIZE],
    #[cfg(not(target_os = "espidf"))]
    durable: [u8; EEPROM_SIZE],
    #[cfg(not(target_os = "espidf"))]
    fail_commits: bool,
}

impl EepromStore {
    /// Initialise NVS flash and load the stored image.
    ///
    /// Returns `Err(StorageError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.  A missing
    /// blob reads as erased flash (`0xFF`).
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }

            let mut image = [0xFFu8; EEPROM_SIZE];
            let result = with_nvs_handle(false, |handle| {
                let mut size = EEPROM_SIZE;
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        BLOB_KEY.as_ptr() as *const _,
                        image.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => info!("EepromStore: loaded {} bytes from NVS", size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => info!("EepromStore: no stored image"),
                Err(e) => warn!("EepromStore: NVS read error {}, starting erased", e),
            }
            Ok(Self { image })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("EepromStore: simulation backend");
            Ok(Self::from_image([0xFF; EEPROM_SIZE]))
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl EepromStore {
    /// Simulated store whose durable contents are `image`.
    pub fn from_image(image: [u8; EEPROM_SIZE]) -> Self {
        Self {
            image,
            durable: image,
            fail_commits: false,
        }
    }

    /// What a reboot would read back.
    pub fn durable_image(&self) -> [u8; EEPROM_SIZE] {
        self.durable
    }

    /// Power-cycle: drop staged writes.
    pub fn reboot(&self) -> Self {
        Self::from_image(self.durable)
    }

    /// Make every following commit fail (or succeed again).
    pub fn set_commit_failure(&mut self, fail: bool) {
        self.fail_commits = fail;
    }
}

/// Open the namespace, execute a closure with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
where
    F: FnOnce(nvs_handle_t) -> Result<T, i32>,
{
    let mut handle: nvs_handle_t = 0;
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };

    let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
    if ret != ESP_OK {
        return Err(ret);
    }

    let result = f(handle);
    unsafe {
        nvs_close(handle);
    }
    result
}

impl PersistentStore for EepromStore {
    fn capacity(&self) -> usize {
        EEPROM_SIZE
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let end = offset.checked_add(buf.len()).ok_or(StorageError::OutOfBounds)?;
        let src = self.image.get(offset..end).ok_or(StorageError::OutOfBounds)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let end = offset.checked_add(data.len()).ok_or(StorageError::OutOfBounds)?;
        let dst = self
            .image
            .get_mut(offset..end)
            .ok_or(StorageError::OutOfBounds)?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if self.fail_commits {
                return Err(StorageError::CommitFailed);
            }
            self.durable = self.image;
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let image = self.image;
            let result = with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        BLOB_KEY.as_ptr() as *const _,
                        image.as_ptr() as *const _,
                        image.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("EepromStore: NVS commit error {}", e);
                StorageError::CommitFailed
            })
        }
    }
}
