//! SD-card log store.
//!
//! Implements [`StoragePort`] on top of a FAT volume exposed through the
//! VFS, so appends are plain `std::fs` calls on every target.  Only the
//! mount step differs:
//!
//! - **`target_os = "espidf"`**: [`SpiSdVolume`] brings up the SPI host
//!   and mounts the card at [`SD_MOUNT_POINT`](crate::pins::SD_MOUNT_POINT).
//! - **all targets**: [`HostDir`] uses a plain directory (tests, simulation).
//!
//! One file per calendar day, `<YYYY-MM-DD>.txt`, always opened in append
//! mode.  The volume needs long-file-name support enabled.

use core::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::{ConfigError, StorageError, StoragePort};
use crate::config::LoggerConfig;

/// Config override file in the card root.
pub const CONFIG_FILE: &str = "logger.json";

const MAX_FILE_NAME: usize = 32;
const MAX_CONFIG_BYTES: u64 = 4096;

// ───────────────────────────────────────────────────────────────
// Volumes
// ───────────────────────────────────────────────────────────────

/// Makes `root` available as a writable directory.
pub trait Volume {
    fn mount(&mut self, root: &Path) -> Result<(), StorageError>;
}

/// A directory on an already-mounted filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostDir;

impl Volume for HostDir {
    fn mount(&mut self, root: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(root).map_err(|e| {
            debug!("SD(host): cannot create {}: {}", root.display(), e);
            StorageError::Open
        })
    }
}

/// Peripherals for the SPI-attached card.
#[cfg(target_os = "espidf")]
pub struct SpiSdParts {
    pub spi: esp_idf_svc::hal::spi::SPI2,
    pub sclk: esp_idf_svc::hal::gpio::AnyIOPin,
    pub mosi: esp_idf_svc::hal::gpio::AnyIOPin,
    pub miso: esp_idf_svc::hal::gpio::AnyIOPin,
    pub cs: esp_idf_svc::hal::gpio::AnyIOPin,
}

/// FAT volume on an SPI-attached microSD card.
#[cfg(target_os = "espidf")]
pub struct SpiSdVolume {
    parts: Option<SpiSdParts>,
    /// Keeps the FAT volume registered with the VFS.
    mounted: Option<Box<dyn core::any::Any>>,
}

#[cfg(target_os = "espidf")]
impl SpiSdVolume {
    pub fn new(parts: SpiSdParts) -> Self {
        Self {
            parts: Some(parts),
            mounted: None,
        }
    }

    fn mount_card(
        parts: SpiSdParts,
        root: &str,
    ) -> Result<Box<dyn core::any::Any>, esp_idf_svc::sys::EspError> {
        use esp_idf_svc::fs::fatfs::Fatfs;
        use esp_idf_svc::hal::gpio::AnyIOPin;
        use esp_idf_svc::hal::sd::{SdCardConfiguration, SdCardDriver, spi::SdSpiHostDriver};
        use esp_idf_svc::hal::spi::{Dma, SpiDriver, SpiDriverConfig};
        use esp_idf_svc::io::vfs::MountedFatfs;

        let spi = SpiDriver::new(
            parts.spi,
            parts.sclk,
            parts.mosi,
            Some(parts.miso),
            &SpiDriverConfig::default().dma(Dma::Auto(4096)),
        )?;
        let host = SdSpiHostDriver::new(
            spi,
            Some(parts.cs),
            AnyIOPin::none(),
            AnyIOPin::none(),
            AnyIOPin::none(),
            None,
        )?;
        let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())?;
        let fs = MountedFatfs::mount(Fatfs::new_sdcard(0, card)?, root, 4)?;
        Ok(Box::new(fs))
    }
}

#[cfg(target_os = "espidf")]
impl Volume for SpiSdVolume {
    fn mount(&mut self, root: &Path) -> Result<(), StorageError> {
        if self.mounted.is_some() {
            return Ok(());
        }
        let parts = self.parts.take().ok_or(StorageError::NotMounted)?;
        let root = root.to_str().ok_or(StorageError::NameTooLong)?;
        match Self::mount_card(parts, root) {
            Ok(guard) => {
                self.mounted = Some(guard);
                Ok(())
            }
            Err(e) => {
                debug!("SD: mount at {} failed: {}", root, e);
                Err(StorageError::Open)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

pub struct SdCardStore<V> {
    root: PathBuf,
    volume: V,
    mounted: bool,
}

impl<V: Volume> SdCardStore<V> {
    pub fn new(root: impl Into<PathBuf>, volume: V) -> Self {
        Self {
            root: root.into(),
            volume,
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and validate `logger.json` from the card root.
    pub fn load_config(&self) -> Result<LoggerConfig, ConfigError> {
        if !self.mounted {
            return Err(ConfigError::IoError);
        }
        let mut file = std::fs::File::open(self.root.join(CONFIG_FILE)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::IoError
            }
        })?;
        let mut raw = Vec::new();
        (&mut file)
            .take(MAX_CONFIG_BYTES)
            .read_to_end(&mut raw)
            .map_err(|_| ConfigError::IoError)?;
        LoggerConfig::from_json(&raw)
    }

    fn partition_path(&self, partition: &str) -> Result<PathBuf, StorageError> {
        let mut name: heapless::String<MAX_FILE_NAME> = heapless::String::new();
        write!(name, "{}.txt", partition).map_err(|_| StorageError::NameTooLong)?;
        Ok(self.root.join(name.as_str()))
    }
}

impl<V: Volume> StoragePort for SdCardStore<V> {
    fn mount(&mut self) -> bool {
        if self.mounted {
            return true;
        }
        match self.volume.mount(&self.root) {
            Ok(()) => {
                self.mounted = true;
                info!("SD: mounted at {}", self.root.display());
            }
            Err(e) => warn!("SD: {}; logging disabled", e),
        }
        self.mounted
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn append(&mut self, partition: &str, line: &str) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        let path = self.partition_path(partition)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|_| StorageError::Open)?;
        file.write_all(line.as_bytes())
            .map_err(|_| StorageError::Write)?;
        file.flush().map_err(|_| StorageError::Close)?;
        file.sync_all().map_err(|_| StorageError::Close)
    }
}
