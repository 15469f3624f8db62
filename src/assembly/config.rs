use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AssemblyConfigError {
    #[error("Invalid lookahead: {0} (must be at least 1)")]
    InvalidLookahead(usize),

    #[error("Invalid connection bound: {0} (must be at least 1)")]
    InvalidBound(usize),

    #[error("Invalid window size: {0} (must be at least 1)")]
    InvalidWindowSize(usize),

    #[error("Invalid coverage gradient: {0} (must be within [0, 1])")]
    InvalidCoverageGradient(f32),
}

/// How backbone refinement picks the next pivot k-mer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RepivotStrategy {
    /// Always re-pivot to the midpoint of the highest-coverage window
    #[default]
    MaxCoverageWindow,
    /// Alternate between the highest-coverage window and a random path position,
    /// starting with the window
    Alternating,
}

/// Parameters of the traversal algorithms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Depth of the exhaustive search that breaks ties at branch points
    pub lookahead: usize,

    /// Maximum steps taken from either anchor when connecting two k-mers
    pub bound: usize,

    /// Window (in k-mers) used to locate the best-covered region of a backbone
    pub window_size: usize,

    /// Number of greedy extensions performed during backbone refinement
    pub max_iteration: usize,

    pub repivot: RepivotStrategy,

    /// Corrected k-mer windows tolerated before a correction is reverted
    pub mismatches_allowed: usize,

    /// Fraction of the local median coverage a branch must retain to stay a candidate
    pub coverage_gradient: f32,

    /// Branches that cannot be walked this far are treated as error tips
    pub max_tip_length: usize,

    /// Minimum suffix/prefix overlap when merging two sequences directly
    pub min_overlap: usize,

    /// Seed of the random source used for re-pivoting
    pub seed: u64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            lookahead: 5,
            bound: 500,
            window_size: 50,
            max_iteration: 3,
            repivot: RepivotStrategy::default(),
            mismatches_allowed: 5,
            coverage_gradient: 0.5,
            max_tip_length: 5,
            min_overlap: 10,
            seed: 42,
        }
    }
}

impl AssemblyConfig {
    /// # Errors
    ///
    /// Returns the first parameter outside its usable range.
    pub fn validate(&self) -> Result<(), AssemblyConfigError> {
        if self.lookahead == 0 {
            return Err(AssemblyConfigError::InvalidLookahead(self.lookahead));
        }
        if self.bound == 0 {
            return Err(AssemblyConfigError::InvalidBound(self.bound));
        }
        if self.window_size == 0 {
            return Err(AssemblyConfigError::InvalidWindowSize(self.window_size));
        }
        if !(0.0..=1.0).contains(&self.coverage_gradient) {
            return Err(AssemblyConfigError::InvalidCoverageGradient(
                self.coverage_gradient,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AssemblyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let config = AssemblyConfig {
            lookahead: 0,
            ..AssemblyConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(AssemblyConfigError::InvalidLookahead(0))
        );

        let config = AssemblyConfig {
            coverage_gradient: 1.5,
            ..AssemblyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AssemblyConfigError::InvalidCoverageGradient(_))
        ));
    }

    #[test]
    fn test_repivot_serde() {
        let config: AssemblyConfig =
            serde_json::from_str(r#"{"repivot": "alternating", "bound": 20}"#).unwrap();
        assert_eq!(config.repivot, RepivotStrategy::Alternating);
        assert_eq!(config.bound, 20);
        assert_eq!(config.lookahead, AssemblyConfig::default().lookahead);
    }
}
