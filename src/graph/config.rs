use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid k-mer size: {0} (must be at least 2)")]
    InvalidK(usize),

    #[error("Invalid filter sizing: {0}")]
    InvalidSizing(String),

    #[error("Paired k-mers filter has not been initialized")]
    PairedFilterNotInitialized,

    #[error("Invalid paired k-mer distance: {0} (must be at least 1)")]
    InvalidPairedDistance(usize),
}

/// Sizing and hashing parameters fixed for the lifetime of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// k-mer length
    pub k: usize,

    /// Seed shared by every hash value
    pub seed: u64,

    /// Keep strands separate; otherwise a k-mer and its reverse complement share storage
    pub stranded: bool,

    /// Bits in the membership filter
    pub membership_bits: usize,

    /// Hash values read by the membership filter
    pub membership_hashes: usize,

    /// Counters in the counting filter
    pub counting_slots: usize,

    /// Hash values read by the counting filter
    pub counting_hashes: usize,

    /// Bits in the paired k-mers filter (allocated on demand)
    pub paired_bits: usize,

    /// Hash values read by the paired k-mers filter
    pub paired_hashes: usize,

    /// Positional distance between the two k-mers of a pair
    pub paired_distance: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            k: 25,
            seed: 689,
            stranded: false,
            membership_bits: 1 << 27,
            membership_hashes: 3,
            counting_slots: 1 << 25,
            counting_hashes: 3,
            paired_bits: 1 << 26,
            paired_hashes: 3,
            paired_distance: 50,
        }
    }
}

impl GraphConfig {
    /// Default sizing with a different k
    #[must_use]
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Check that the parameters describe a usable graph
    ///
    /// # Errors
    ///
    /// Returns `GraphError::InvalidK` if k < 2, `GraphError::InvalidSizing` if any
    /// filter has zero size or zero hashes, and `GraphError::InvalidPairedDistance` for
    /// a zero pairing distance.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.k < 2 {
            return Err(GraphError::InvalidK(self.k));
        }
        let sizes = [
            ("membership_bits", self.membership_bits),
            ("membership_hashes", self.membership_hashes),
            ("counting_slots", self.counting_slots),
            ("counting_hashes", self.counting_hashes),
            ("paired_bits", self.paired_bits),
            ("paired_hashes", self.paired_hashes),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(GraphError::InvalidSizing(format!("{name} must be non-zero")));
        }
        if self.paired_distance == 0 {
            return Err(GraphError::InvalidPairedDistance(self.paired_distance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GraphConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_k() {
        assert_eq!(
            GraphConfig::with_k(1).validate(),
            Err(GraphError::InvalidK(1))
        );
    }

    #[test]
    fn test_zero_sizing() {
        let config = GraphConfig {
            counting_hashes: 0,
            ..GraphConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GraphError::InvalidSizing(msg)) if msg.contains("counting_hashes")
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GraphConfig = serde_json::from_str(r#"{"k": 31, "stranded": true}"#).unwrap();
        assert_eq!(config.k, 31);
        assert!(config.stranded);
        assert_eq!(config.membership_hashes, GraphConfig::default().membership_hashes);
    }
}
