use thiserror::Error;

/// Configuration misuse detectable at configuration time.
///
/// Geometric infeasibility (no open aim window, no clearance in bounds) is
/// never an error: those are `Option` returns the behavior layer falls back
/// on. Per-tick queries themselves cannot fail.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("region radius must be positive, got {radius}")]
    InvalidRegionRadius { radius: f32 },

    #[error("candidate count must be at least 1, got {count}")]
    InvalidCandidateCount { count: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
