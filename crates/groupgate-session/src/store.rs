//! Credential store: one persisted [`DeviceIdentity`] per store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::identity::DeviceIdentity;

/// Persists the single device identity.
///
/// `load` is called once at startup by the session manager. `save` belongs to
/// the messaging backend, which writes the identity when pairing succeeds.
pub trait CredentialStore: Send + Sync {
    /// Loads the stored identity, or `None` if the device was never paired.
    fn load(&self) -> StoreResult<Option<DeviceIdentity>>;

    /// Replaces the stored identity.
    fn save(&self, identity: &DeviceIdentity) -> StoreResult<()>;
}

/// A credential store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at the given path. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> StoreResult<Option<DeviceIdentity>> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored device identity");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let identity: DeviceIdentity =
            serde_json::from_slice(&content).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        debug!(jid = %identity.jid, "Loaded device identity");
        Ok(Some(identity))
    }

    fn save(&self, identity: &DeviceIdentity) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(identity).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write-then-rename so a crash never leaves a half-written identity.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), jid = %identity.jid, "Saved device identity");
        Ok(())
    }
}

/// An in-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    identity: Mutex<Option<DeviceIdentity>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds an identity.
    pub fn with_identity(identity: DeviceIdentity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> StoreResult<Option<DeviceIdentity>> {
        Ok(self
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, identity: &DeviceIdentity) -> StoreResult<()> {
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }
}
