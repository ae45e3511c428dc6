//! Propagation configuration.

use std::error::Error;
use std::fmt;

/// Limits applied to every cascade on the current thread.
///
/// Installed with [`propagation::configure`](crate::propagation::configure)
/// and validated there; values are immutable once installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagationConfig {
    /// Maximum nesting of notification fan-outs within one call stack.
    ///
    /// Default: 256. A healthy graph nests at most as deep as its longest
    /// dependency chain; hitting the limit means a cycle whose values never
    /// compare equal. Must be at least 1.
    pub max_depth: usize,
}

impl PropagationConfig {
    /// Default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    /// Create a config with the given depth limit.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

/// Errors from [`PropagationConfig::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_depth` was zero, which would reject every write.
    ZeroDepth,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDepth => write!(f, "max_depth must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PropagationConfig::default();
        assert_eq!(config.max_depth, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        assert_eq!(
            PropagationConfig::new(0).validate(),
            Err(ConfigError::ZeroDepth)
        );
    }
}
