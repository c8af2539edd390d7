use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for a help desk.
///
/// Controls listing and queue sizes. Business rules such as the corporate
/// staff domain are not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Page size used when a listing does not request one.
    default_page_size: usize,

    /// Upper bound on any requested page size.
    max_page_size: usize,

    /// Default number of tickets returned by the prioritised queue.
    pub priority_queue_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            priority_queue_limit: default_priority_queue_limit(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration, falling back to defaults if the file is
    /// missing or unreadable.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("using default configuration: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the default page size.
    #[must_use]
    pub const fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// Returns the maximum page size.
    #[must_use]
    pub const fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Resolves a requested page size.
    ///
    /// `None` yields the default; anything else is clamped to
    /// `1..=max_page_size`.
    #[must_use]
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }

    /// Sets the page sizes, keeping the default within the maximum.
    pub fn set_page_sizes(&mut self, default: usize, max: usize) {
        self.max_page_size = max.max(1);
        self.default_page_size = default.clamp(1, self.max_page_size);
    }
}

const fn default_page_size() -> usize {
    20
}

const fn default_max_page_size() -> usize {
    100
}

const fn default_priority_queue_limit() -> usize {
    10
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_page_size")]
        default_page_size: usize,

        #[serde(default = "default_max_page_size")]
        max_page_size: usize,

        #[serde(default = "default_priority_queue_limit")]
        priority_queue_limit: usize,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                default_page_size,
                max_page_size,
                priority_queue_limit,
            } => {
                let mut config = Self {
                    priority_queue_limit,
                    ..Self::default()
                };
                config.set_page_sizes(default_page_size, max_page_size);
                config
            }
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            priority_queue_limit: config.priority_queue_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\ndefault_page_size = 5\nmax_page_size = 50\npriority_queue_limit = 3\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.default_page_size(), 5);
        assert_eq!(config.max_page_size(), 50);
        assert_eq!(config.priority_queue_limit, 3);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
        assert_eq!(Config::load_or_default(&missing), Config::default());
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nmax_page_size = \"lots\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = Config::default();
        config.set_page_sizes(10, 30);
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("_version = \"1\""));
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn default_is_clamped_to_max() {
        let config: Config =
            toml::from_str("_version = \"1\"\ndefault_page_size = 500\nmax_page_size = 40\n")
                .unwrap();
        assert_eq!(config.default_page_size(), 40);
    }

    #[test_case(None, 20)]
    #[test_case(Some(0), 1)]
    #[test_case(Some(35), 35)]
    #[test_case(Some(1000), 100)]
    fn page_size_is_clamped(requested: Option<usize>, expected: usize) {
        assert_eq!(Config::default().page_size(requested), expected);
    }
}
