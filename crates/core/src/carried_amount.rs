//! Carried amount persistence.
//!
//! The redemption stage writes the floored amount it freed up; the next
//! purchase stage reads it back. The file holds a single integer in plain
//! text. A missing or unreadable file means "nothing carried yet", and the
//! purchase falls back to the configured default amount.

use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from carried amount persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid carried amount {0:?}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct CarriedAmountStore {
    path: PathBuf,
}

impl CarriedAmountStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Overwrites the carried amount.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, amount: u64) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, amount.to_string())?;
        debug!(path = %self.path.display(), amount, "Saved carried amount");
        Ok(())
    }

    /// Reads the carried amount, `Ok(None)` if it was never written.
    pub fn load(&self) -> Result<Option<u64>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .map(Some)
            .map_err(|_| PersistenceError::Invalid(trimmed.to_string()))
    }

    /// Amount the purchase stage should invest: the carried amount if one is
    /// stored and readable, otherwise `default`.
    #[must_use]
    pub fn resolve(&self, default: Decimal) -> Decimal {
        match self.load() {
            Ok(Some(amount)) => {
                info!(amount, "Using carried amount from last redemption");
                Decimal::from(amount)
            }
            Ok(None) => {
                info!(amount = %default, "No carried amount yet, using configured amount");
                default
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read carried amount, using configured amount"
                );
                default
            }
        }
    }
}
