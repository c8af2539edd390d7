//! A filesystem backed help desk
//!
//! The [`Directory`] keeps every entity of a help desk in a single JSON data
//! file under `<root>/.helpdesk/`, next to the desk's `config.toml`. It is a
//! wrapper around the filesystem agnostic [`MemoryStore`]: the whole file is
//! read on [`Directory::open`] and written back on [`Directory::save`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    domain::Config,
    storage::{DataDocument, MemoryStore, Snapshot, StoreError},
};

/// Name of the metadata folder inside the root.
pub const METADATA_DIR: &str = ".helpdesk";
const DATA_FILE: &str = "data.json";
const CONFIG_FILE: &str = "config.toml";

/// A help desk persisted in a directory.
#[derive(Debug)]
pub struct Directory {
    /// The root of the directory the help desk is stored in.
    root: PathBuf,
    store: MemoryStore,
    config: Config,
}

impl Directory {
    /// Creates an empty help desk at `root`, writing a default configuration
    /// and an empty data file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyInitialised`] if a data file already
    /// exists, or an I/O error if the files cannot be written.
    pub fn init(root: PathBuf) -> Result<Self, StoreError> {
        let metadata = root.join(METADATA_DIR);
        if metadata.join(DATA_FILE).exists() {
            return Err(StoreError::AlreadyInitialised(root));
        }
        fs::create_dir_all(&metadata)?;

        let config = Config::default();
        config
            .save(&metadata.join(CONFIG_FILE))
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;

        let directory = Self {
            root,
            store: MemoryStore::new(),
            config,
        };
        directory.save()?;
        tracing::info!("Initialised help desk at {}", directory.root.display());
        Ok(directory)
    }

    /// Opens the help desk at `root`.
    ///
    /// A missing or unreadable configuration falls back to the defaults.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotInitialised`] if there is no data file
    /// - an I/O or serialization error if it cannot be read or parsed
    /// - [`StoreError::Corrupt`] if a stored entity fails validation
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        let metadata = root.join(METADATA_DIR);
        let data_path = metadata.join(DATA_FILE);
        if !data_path.exists() {
            return Err(StoreError::NotInitialised(root));
        }

        let config = load_config(&metadata);
        let content = fs::read_to_string(&data_path)?;
        let document: DataDocument = serde_json::from_str(&content)?;
        let snapshot = Snapshot::try_from(document)?;
        tracing::debug!(
            users = snapshot.users.len(),
            tickets = snapshot.tickets.len(),
            "Loaded help desk from {}",
            data_path.display()
        );

        Ok(Self {
            root,
            store: MemoryStore::from_snapshot(snapshot),
            config,
        })
    }

    /// Writes the current contents of the store to disk.
    ///
    /// The data file is replaced atomically: a sibling temporary file is
    /// written first and then renamed over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be serialized or written.
    pub fn save(&self) -> Result<(), StoreError> {
        let metadata = self.root.join(METADATA_DIR);
        let document = DataDocument::from(self.store.snapshot());
        let content = serde_json::to_string_pretty(&document)?;

        let temporary = metadata.join(format!("{DATA_FILE}.tmp"));
        fs::write(&temporary, content)?;
        fs::rename(&temporary, metadata.join(DATA_FILE))?;
        tracing::debug!("Saved help desk to {}", metadata.display());
        Ok(())
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

fn load_config(metadata: &Path) -> Config {
    let path = metadata.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}
