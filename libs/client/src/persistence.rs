//! JSON persistence for client stores
//!
//! Each store is written to `<dir>/<storage key>.json` wrapped as
//! `{"state": ..., "version": 0}`, the layout the web app's storage
//! middleware uses, so a file can be seeded from a browser export.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::ClientError;

const STATE_VERSION: u32 = 0;

/// A store that can be saved under a fixed key
pub trait Persisted: Serialize + DeserializeOwned + Default {
    const STORAGE_KEY: &'static str;
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Directory-backed storage
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for<T: Persisted>(&self) -> PathBuf {
        self.dir.join(format!("{}.json", T::STORAGE_KEY))
    }

    pub fn save<T: Persisted>(&self, value: &T) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for::<T>();
        let body = serde_json::to_vec_pretty(&Envelope {
            state: value,
            version: STATE_VERSION,
        })?;

        // Atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;

        debug!("Saved {}", path.display());
        Ok(())
    }

    /// Restore a store; a store never saved comes back empty
    pub fn load<T: Persisted>(&self) -> Result<T, ClientError> {
        let path = self.path_for::<T>();
        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.state)
    }

    pub fn clear<T: Persisted>(&self) -> Result<(), ClientError> {
        match fs::remove_file(self.path_for::<T>()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
