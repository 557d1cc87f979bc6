//! NVS (Non-Volatile Storage) adapter.
//!
//! Brings up the default NVS partition (the WiFi driver needs it) and
//! implements [`ConfigPort`] by persisting [`NodeConfig`] as a single
//! `postcard` blob.
//!
//! - **`feature = "espidf"`**: ESP-IDF `nvs_flash_*` / `nvs_*_blob` calls.
//! - **host**: an in-memory blob for tests and simulation.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError};
use crate::config::NodeConfig;

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(feature = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"thermolink\0";
#[cfg(feature = "espidf")]
const CONFIG_KEY: &[u8] = b"nodecfg\0";
#[cfg(feature = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

/// Run the partition init, erasing and retrying once if the partition
/// reports it needs an erase.  Returns `true` if an erase happened.
///
/// Any other init failure, a failed erase, or a second failure after the
/// erase is returned as-is.
pub fn init_with_recovery(
    mut init: impl FnMut() -> Result<(), StorageError>,
    erase: impl FnOnce() -> Result<(), StorageError>,
) -> Result<bool, StorageError> {
    match init() {
        Ok(()) => Ok(false),
        Err(StorageError::NeedsErase) => {
            warn!("NVS: partition needs erase, erasing and re-initialising");
            erase().map_err(|_| StorageError::EraseFailed)?;
            init()?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

pub struct NvsAdapter {
    #[cfg(not(feature = "espidf"))]
    blob: std::cell::RefCell<Option<Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash (with erase-and-retry recovery) and return
    /// the adapter.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(feature = "espidf")]
        {
            let erased = init_with_recovery(
                || {
                    // SAFETY: called from the main task before any other NVS user exists.
                    let ret = unsafe { nvs_flash_init() };
                    match ret {
                        ESP_OK => Ok(()),
                        ESP_ERR_NVS_NO_FREE_PAGES | ESP_ERR_NVS_NEW_VERSION_FOUND => {
                            Err(StorageError::NeedsErase)
                        }
                        _ => Err(StorageError::IoError),
                    }
                },
                || {
                    // SAFETY: as above.
                    if unsafe { nvs_flash_erase() } == ESP_OK {
                        Ok(())
                    } else {
                        Err(StorageError::EraseFailed)
                    }
                },
            )?;
            info!("NvsAdapter: ESP-IDF NVS initialised (erased={})", erased);
            Ok(Self {})
        }

        #[cfg(not(feature = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self {
                blob: std::cell::RefCell::new(None),
            })
        }
    }

    /// Overwrite the stored blob with raw bytes (simulation only).
    #[cfg(not(feature = "espidf"))]
    pub fn sim_store_raw(&self, bytes: &[u8]) {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
    }

    #[cfg(feature = "espidf")]
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

        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(feature = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A fresh partition has no namespace yet either.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(feature = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.blob.borrow().clone())
    }

    #[cfg(feature = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    CONFIG_KEY.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
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
        })
        .map_err(|e| {
            warn!("NvsAdapter: NVS write error {}", e);
            ConfigError::IoError
        })
    }

    #[cfg(not(feature = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let Some(bytes) = self.read_blob()? else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(NodeConfig::default());
        };
        let cfg: NodeConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(&bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
