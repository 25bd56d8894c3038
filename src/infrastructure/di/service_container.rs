//! Service container for dependency injection
//!
//! Wires settings, the filesystem and the loader for one CLI invocation.

use std::path::Path;
use std::sync::Arc;

use crate::application::LiveTree;
use crate::config::Settings;
use crate::domain::Record;
use crate::infrastructure::loader::Loader;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Container holding the collaborators of a CLI command.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Records and script loader
    pub loader: Loader,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let loader = Loader::new(Arc::clone(&fs));
        Self {
            settings,
            fs,
            loader,
        }
    }

    /// Load `records` and project them with the configured options and rules.
    pub fn live_tree(&self, records: &Path) -> InfraResult<LiveTree<Record>> {
        let records = self.loader.load_records(records)?;
        let options = self.settings.to_options()?;
        let mut tree = LiveTree::new(options, records)?;
        self.settings.apply_rules(&mut tree);
        Ok(tree)
    }
}
