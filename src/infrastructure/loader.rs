//! TOML loading of record collections and mutation scripts.

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::Script;
use crate::domain::Record;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Records file: an array of `[[records]]` tables in source order.
#[derive(Debug, Default, Deserialize)]
struct RecordFile {
    #[serde(default)]
    records: Vec<Record>,
}

/// Reads records and scripts through a [`FileSystem`].
pub struct Loader {
    fs: Arc<dyn FileSystem>,
}

impl Loader {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load_records(&self, path: &Path) -> InfraResult<Vec<Record>> {
        let file: RecordFile = self.load_toml(path)?;
        debug!("load_records: {} record(s)", file.records.len());
        Ok(file.records)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load_script(&self, path: &Path) -> InfraResult<Script> {
        let script: Script = self.load_toml(path)?;
        debug!("load_script: {} step(s)", script.steps.len());
        Ok(script)
    }

    fn load_toml<T: DeserializeOwned>(&self, path: &Path) -> InfraResult<T> {
        if !self.fs.exists(path) {
            return Err(InfraError::io(
                format!("read {}", path.display()),
                io::Error::new(io::ErrorKind::NotFound, "file does not exist"),
            ));
        }
        if !self.fs.is_file(path) {
            return Err(InfraError::io(
                format!("read {}", path.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "not a file"),
            ));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| InfraError::parse(path, e.to_string()))
    }
}
