//! Error types for the proposal sampler
//!
//! This module provides proper error handling instead of panics.

use std::fmt;

/// Errors that can occur while building tables or drawing proposals
#[derive(Debug, Clone)]
pub enum SamplerError {
    /// A CDF table was requested for a non-positive standard deviation
    NonPositiveStdDev {
        /// The offending standard deviation
        std_dev: f64,
        /// Context (e.g., "part 3 x-axis")
        context: String,
    },

    /// Dimension mismatch between expected and actual
    DimensionMismatch {
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
        /// Context (e.g., "reference centers", "candidate centers")
        context: String,
    },

    /// Configuration error
    Configuration {
        /// Description of the configuration issue
        description: String,
    },

    /// A sampling call requires a reference state that was never set
    MissingReference,

    /// A rejection loop exhausted its attempt cap
    RejectionLimitExceeded {
        /// Which quantity was being drawn (e.g., "elevation")
        quantity: &'static str,
        /// Number of attempts made
        attempts: usize,
    },
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::NonPositiveStdDev { std_dev, context } => {
                write!(
                    f,
                    "Non-positive standard deviation {} for {}",
                    std_dev, context
                )
            }
            SamplerError::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
            SamplerError::Configuration { description } => {
                write!(f, "Configuration error: {}", description)
            }
            SamplerError::MissingReference => {
                write!(f, "No reference state set before sampling")
            }
            SamplerError::RejectionLimitExceeded { quantity, attempts } => {
                write!(
                    f,
                    "Rejection sampling of {} exceeded {} attempts",
                    quantity, attempts
                )
            }
        }
    }
}

impl std::error::Error for SamplerError {}
