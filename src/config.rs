//! Combined run configuration, loadable from JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::{AssemblyConfig, AssemblyConfigError};
use crate::graph::{GraphConfig, GraphError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid graph configuration: {0}")]
    Graph(#[from] GraphError),

    #[error("Invalid assembly configuration: {0}")]
    Assembly(#[from] AssemblyConfigError),
}

/// Everything needed to build a graph and run the assembly algorithms on it.
///
/// Missing sections and fields take their defaults, so a file only needs to name the
/// values it changes:
///
/// ```json
/// { "graph": { "k": 31 }, "assembly": { "lookahead": 7 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub assembly: AssemblyConfig,
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or describes
    /// invalid parameters.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the first invalid parameter of either section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        self.assembly.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"graph": {{"k": 31}}, "assembly": {{"lookahead": 7}}}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.graph.k, 31);
        assert_eq!(config.assembly.lookahead, 7);
        assert_eq!(config.assembly.bound, AssemblyConfig::default().bound);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"graph": {{"k": 1}}}}"#).unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Graph(GraphError::InvalidK(1)))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/config.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
